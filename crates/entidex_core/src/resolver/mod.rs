//! Compiled resolver trees and their traversal.
//!
//! A [`RootResolver`] is built once per concrete entity type from the
//! [`MappingModel`](crate::MappingModel) and is immutable afterwards; it
//! can be shared across threads and traversed concurrently. Each call
//! creates its own [`ReindexingCollector`].

pub(crate) mod builder;
mod collector;
mod dirtiness;
mod node;

pub use collector::{EntitiesToReindex, ReindexingCollector};
pub use dirtiness::{paths_overlap, DirtyPaths, PathBitSet, PathOrdinals};
pub use node::{ResolverGraph, ResolverNode};

use crate::error::CoreResult;
use crate::stats::ResolverStats;
use crate::types::NodeId;
use entidex_model::{ObjectAccess, ObjectId, TypeModelProvider, TypeName};
use node::Traversal;
use std::fmt;

/// Resolver for changes to instances of one concrete type.
#[derive(Debug)]
pub struct RootResolver {
    pub(crate) type_name: TypeName,
    pub(crate) graph: ResolverGraph,
    /// Entry point for updates; `None` when no change to this type matters.
    pub(crate) root: Option<NodeId>,
    /// Document part of the instance itself, walked on delete.
    pub(crate) self_part: Option<NodeId>,
    pub(crate) ordinals: PathOrdinals,
}

impl RootResolver {
    /// The concrete type this resolver handles.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// The compiled node arena.
    pub fn graph(&self) -> &ResolverGraph {
        &self.graph
    }

    /// Dirty paths that can affect some index, in ordinal order.
    pub fn relevant_paths(&self) -> &[String] {
        self.ordinals.paths()
    }

    /// Returns true if no change to instances of this type can matter.
    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.self_part.is_none()
    }

    /// Collects the entities to reindex after `object` changed.
    ///
    /// `dirty` lists the changed paths; `None` means they are unknown and
    /// every relevant path is treated as dirty.
    pub fn resolve(
        &self,
        provider: &dyn TypeModelProvider,
        access: &dyn ObjectAccess,
        object: ObjectId,
        dirty: Option<&DirtyPaths>,
        stats: &ResolverStats,
    ) -> CoreResult<EntitiesToReindex> {
        let bits = dirty.map(|d| self.ordinals.dirty_bits(d));
        let start: Vec<NodeId> = self.root.into_iter().collect();
        let result = self.run(provider, access, object, bits.as_ref(), &start, stats)?;
        stats.record_resolution(false, result.len());
        Ok(result)
    }

    /// Collects the entities to reindex after `object` was deleted.
    ///
    /// Every relevant path is treated as dirty, and the object's own
    /// document part is considered gone.
    pub fn resolve_on_delete(
        &self,
        provider: &dyn TypeModelProvider,
        access: &dyn ObjectAccess,
        object: ObjectId,
        stats: &ResolverStats,
    ) -> CoreResult<EntitiesToReindex> {
        let start: Vec<NodeId> = self.root.into_iter().chain(self.self_part).collect();
        let result = self.run(provider, access, object, None, &start, stats)?;
        stats.record_resolution(true, result.len());
        Ok(result)
    }

    fn run(
        &self,
        provider: &dyn TypeModelProvider,
        access: &dyn ObjectAccess,
        object: ObjectId,
        dirty: Option<&PathBitSet>,
        start: &[NodeId],
        stats: &ResolverStats,
    ) -> CoreResult<EntitiesToReindex> {
        let traversal = Traversal {
            graph: &self.graph,
            provider,
            access,
            dirty,
            stats,
        };
        let mut collector = ReindexingCollector::new();
        traversal.run(start, object, &mut collector)?;
        Ok(collector.result())
    }

    /// Renders the compiled tree.
    pub fn explain(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RootResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "resolver for {}", self.type_name)?;
        if !self.ordinals.is_empty() {
            writeln!(f, "relevant paths: {}", self.ordinals.paths().join(", "))?;
        }
        match self.root {
            Some(root) => {
                writeln!(f, "on update:")?;
                write!(f, "{}", self.graph.explain(root, Some(&self.ordinals)))?;
            }
            None => writeln!(f, "on update: nothing")?,
        }
        if let Some(part) = self.self_part {
            writeln!(f, "on delete, additionally:")?;
            write!(f, "{}", self.graph.explain(part, Some(&self.ordinals)))?;
        }
        Ok(())
    }
}
