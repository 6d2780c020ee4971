//! Resolver nodes and their traversal.

use super::collector::ReindexingCollector;
use super::dirtiness::{PathBitSet, PathOrdinals};
use crate::error::{CoreError, CoreResult};
use crate::stats::ResolverStats;
use crate::types::{EntityReference, NodeId};
use entidex_model::{
    ContainerKind, ModelError, ObjectAccess, ObjectId, TypeModelProvider, TypeName, Value,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::trace;

/// A node of a compiled resolver tree.
///
/// Nodes refer to each other by [`NodeId`] within one [`ResolverGraph`];
/// shared continuations make the graph a DAG with back edges, which the
/// collector's visited set cuts at `Type` and `CastedType` nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverNode {
    /// Dispatches on the exact runtime type of the current object.
    Type {
        /// Static type of the objects reaching this node.
        static_type: TypeName,
        /// Continuation per concrete runtime type; absent types contribute nothing.
        dispatch: HashMap<TypeName, NodeId>,
    },
    /// Narrows the current object to `target`, contributing nothing on mismatch.
    CastedType {
        /// Type to narrow to.
        target: TypeName,
        /// Continuation for objects that fit.
        nested: NodeId,
    },
    /// Reads one property of the current object.
    Property {
        /// Property name.
        name: String,
        /// Continuation for non-null values.
        nested: NodeId,
    },
    /// Forwards each element of the current container value.
    ContainerExtractor {
        /// Container kind to unwrap.
        kind: ContainerKind,
        /// Continuation for each non-null element.
        nested: NodeId,
    },
    /// Applies several independent nodes to the same object.
    Union(Vec<NodeId>),
    /// Skips its subtree when none of the relevant paths is dirty.
    DirtinessFilter {
        /// Ordinals of the dirty paths that matter below.
        relevant: PathBitSet,
        /// The filtered subtree.
        nested: NodeId,
    },
    /// Records the current object as an entity to reindex.
    MarkForReindexing,
    /// Forward reference, replaced before the tree is published.
    Placeholder,
}

/// Arena of resolver nodes.
#[derive(Debug, Clone, Default)]
pub struct ResolverGraph {
    nodes: Vec<ResolverNode>,
}

impl ResolverGraph {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> Option<&ResolverNode> {
        self.nodes.get(id.index())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if a placeholder survived construction.
    pub fn has_placeholders(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n, ResolverNode::Placeholder))
    }

    pub(crate) fn push(&mut self, node: ResolverNode) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn replace(&mut self, id: NodeId, node: ResolverNode) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = node;
        }
    }

    /// Renders the subtree rooted at `root`.
    pub fn explain<'g>(
        &'g self,
        root: NodeId,
        ordinals: Option<&'g PathOrdinals>,
    ) -> impl fmt::Display + 'g {
        Explain {
            graph: self,
            root,
            ordinals,
        }
    }
}

/// Where the traversal currently stands: on an object, or on a value read
/// from one.
#[derive(Debug, Clone, Copy)]
enum Cursor<'a> {
    Object(ObjectId),
    Value(&'a Value),
}

impl Cursor<'_> {
    fn object(self) -> CoreResult<Option<ObjectId>> {
        match self {
            Cursor::Object(id) => Ok(Some(id)),
            Cursor::Value(Value::Null) => Ok(None),
            Cursor::Value(Value::Ref(id)) => Ok(Some(*id)),
            Cursor::Value(other) => Err(ModelError::NotAnObject {
                found: other.shape().to_string(),
            }
            .into()),
        }
    }
}

/// One walk over a resolver graph.
pub(crate) struct Traversal<'a> {
    pub(crate) graph: &'a ResolverGraph,
    pub(crate) provider: &'a dyn TypeModelProvider,
    pub(crate) access: &'a dyn ObjectAccess,
    /// `None` means every path is considered dirty.
    pub(crate) dirty: Option<&'a PathBitSet>,
    pub(crate) stats: &'a ResolverStats,
}

impl<'a> Traversal<'a> {
    /// Applies every `start` node to `object`.
    ///
    /// Uses an explicit work stack, so object graph depth never turns into
    /// call stack depth.
    pub(crate) fn run(
        &self,
        start: &[NodeId],
        object: ObjectId,
        collector: &mut ReindexingCollector,
    ) -> CoreResult<()> {
        let mut stack: Vec<(NodeId, Cursor<'a>)> = start
            .iter()
            .map(|&node| (node, Cursor::Object(object)))
            .collect();

        while let Some((id, cursor)) = stack.pop() {
            let node = self
                .graph
                .node(id)
                .ok_or_else(|| CoreError::invariant(format!("dangling node {id}")))?;

            match node {
                ResolverNode::Type {
                    static_type,
                    dispatch,
                } => {
                    let Some(object) = cursor.object()? else {
                        continue;
                    };
                    if !self.enter(id, object, collector) {
                        continue;
                    }
                    let runtime = self.access.runtime_type(object)?;
                    match dispatch.get(runtime) {
                        Some(&nested) => stack.push((nested, Cursor::Object(object))),
                        None if self.provider.is_assignable(runtime, static_type) => {}
                        None => {
                            return Err(CoreError::invariant(format!(
                                "object {object} of type {runtime} found where {static_type} was expected"
                            )))
                        }
                    }
                }
                ResolverNode::CastedType { target, nested } => {
                    let Some(object) = cursor.object()? else {
                        continue;
                    };
                    if !self.enter(id, object, collector) {
                        continue;
                    }
                    if let Some(cast) = self.provider.cast_or_none(self.access, object, target)? {
                        stack.push((*nested, Cursor::Object(cast)));
                    }
                }
                ResolverNode::Property { name, nested } => {
                    let Some(object) = cursor.object()? else {
                        continue;
                    };
                    let value = self.access.read_property(object, name)?;
                    if !value.is_null() {
                        stack.push((*nested, Cursor::Value(value)));
                    }
                }
                ResolverNode::ContainerExtractor { kind, nested } => {
                    let Cursor::Value(value) = cursor else {
                        return Err(CoreError::invariant(format!(
                            "{kind} extractor {id} reached an object instead of a value"
                        )));
                    };
                    for element in kind.extract(value)? {
                        if !element.is_null() {
                            stack.push((*nested, Cursor::Value(element)));
                        }
                    }
                }
                ResolverNode::Union(children) => {
                    stack.extend(children.iter().rev().map(|&child| (child, cursor)));
                }
                ResolverNode::DirtinessFilter { relevant, nested } => match self.dirty {
                    Some(dirty) if !relevant.intersects(dirty) => self.stats.record_pruned(),
                    _ => stack.push((*nested, cursor)),
                },
                ResolverNode::MarkForReindexing => {
                    let Some(object) = cursor.object()? else {
                        continue;
                    };
                    let type_name = self.access.runtime_type(object)?.clone();
                    let identity = self.provider.identity_of(self.access, object)?;
                    collector.add_entity_to_reindex(EntityReference {
                        type_name,
                        identity,
                    });
                }
                ResolverNode::Placeholder => {
                    return Err(CoreError::invariant(format!(
                        "unresolved placeholder node {id}"
                    )))
                }
            }
        }
        Ok(())
    }

    fn enter(&self, node: NodeId, object: ObjectId, collector: &mut ReindexingCollector) -> bool {
        if collector.mark_visited(node, object) {
            return true;
        }
        self.stats.record_cycle_cut();
        trace!(%node, %object, "already visited");
        false
    }
}

struct Explain<'g> {
    graph: &'g ResolverGraph,
    root: NodeId,
    ordinals: Option<&'g PathOrdinals>,
}

impl Explain<'_> {
    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        depth: usize,
        seen: &mut HashSet<NodeId>,
    ) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let Some(node) = self.graph.node(id) else {
            return writeln!(f, "{indent}<dangling {id}>");
        };
        match node {
            ResolverNode::Type {
                static_type,
                dispatch,
            } => {
                if !seen.insert(id) {
                    return writeln!(f, "{indent}type {static_type} (see {id})");
                }
                writeln!(f, "{indent}type {static_type} [{id}]")?;
                let mut cases: Vec<_> = dispatch.iter().collect();
                cases.sort_by(|a, b| a.0.cmp(b.0));
                for (concrete, nested) in cases {
                    writeln!(f, "{indent}  when {concrete}:")?;
                    self.render(f, *nested, depth + 2, seen)?;
                }
                Ok(())
            }
            ResolverNode::CastedType { target, nested } => {
                writeln!(f, "{indent}cast to {target}")?;
                self.render(f, *nested, depth + 1, seen)
            }
            ResolverNode::Property { name, nested } => {
                writeln!(f, "{indent}property {name}")?;
                self.render(f, *nested, depth + 1, seen)
            }
            ResolverNode::ContainerExtractor { kind, nested } => {
                writeln!(f, "{indent}extract [{kind}]")?;
                self.render(f, *nested, depth + 1, seen)
            }
            ResolverNode::Union(children) => {
                if !seen.insert(id) {
                    return writeln!(f, "{indent}union (see {id})");
                }
                writeln!(f, "{indent}union [{id}]")?;
                for child in children {
                    self.render(f, *child, depth + 1, seen)?;
                }
                Ok(())
            }
            ResolverNode::DirtinessFilter { relevant, nested } => {
                let paths: Vec<String> = relevant
                    .iter()
                    .map(|ordinal| {
                        self.ordinals
                            .and_then(|o| o.paths().get(ordinal).cloned())
                            .unwrap_or_else(|| format!("#{ordinal}"))
                    })
                    .collect();
                writeln!(f, "{indent}if dirty: {}", paths.join(", "))?;
                self.render(f, *nested, depth + 1, seen)
            }
            ResolverNode::MarkForReindexing => writeln!(f, "{indent}reindex"),
            ResolverNode::Placeholder => writeln!(f, "{indent}<placeholder {id}>"),
        }
    }
}

impl fmt::Display for Explain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = HashSet::new();
        self.render(f, self.root, 0, &mut seen)
    }
}
