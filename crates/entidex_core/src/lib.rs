//! # EntiDex Core
//!
//! Implicit reindexing resolution for EntiDex.
//!
//! Given a domain object that just changed, the core determines every
//! other entity whose index document must be rebuilt, by walking back the
//! object-graph paths that index documents were declared to read.
//!
//! This crate provides:
//! - Dependency declarations and their path syntax
//! - Bootstrap validation into an immutable [`MappingModel`]
//! - Compiled resolver trees, one per concrete entity type, built lazily
//! - Dirtiness filtering of irrelevant subtrees
//! - The [`ResolverRegistry`] entry points for updates and deletes
//! - An [`IndexingPlan`] that merges the changes of a unit of work
//!
//! ## Usage
//!
//! ```
//! use entidex_core::{DirtyPaths, MappingDeclarations, ResolverConfig, ResolverRegistry};
//! use entidex_model::{ObjectGraph, TypeDescriptor, TypeModel, Value, ValueType};
//! use std::sync::Arc;
//!
//! let model = Arc::new(
//!     TypeModel::new(vec![
//!         TypeDescriptor::entity("Customer")
//!             .id("id", ValueType::text())
//!             .property("orders", ValueType::list(ValueType::object("Order"))),
//!         TypeDescriptor::entity("Order")
//!             .property("customer", ValueType::object("Customer"))
//!             .property("total", ValueType::integer()),
//!     ])
//!     .unwrap(),
//! );
//!
//! let mut declarations = MappingDeclarations::new();
//! declarations.indexed("Customer").read("orders[].total");
//! declarations.inverse("Customer", "orders", "Order", "customer");
//! let registry =
//!     ResolverRegistry::bootstrap(model.clone(), &declarations, ResolverConfig::default()).unwrap();
//!
//! let mut graph = ObjectGraph::new(model);
//! let customer = graph.insert("Customer", [("id", Value::from("C42"))]).unwrap();
//! let order = graph
//!     .insert("Order", [("customer", Value::Ref(customer)), ("total", Value::Integer(10))])
//!     .unwrap();
//! graph.push(customer, "orders", Value::Ref(order)).unwrap();
//!
//! let dirty: DirtyPaths = ["total"].into_iter().collect();
//! let result = registry
//!     .resolve_entities_to_reindex(&graph, order, Some(&dirty))
//!     .unwrap();
//! assert_eq!(result.sorted()[0].to_string(), "Customer(C42)");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod declaration;
mod error;
mod mapping;
mod path;
mod plan;
mod registry;
mod resolver;
mod stats;
mod types;

pub use config::ResolverConfig;
pub use declaration::{
    InverseDeclaration, MappingDeclarations, OtherEntityDependency, TypeDeclarations,
};
pub use error::{CoreError, CoreResult};
pub use mapping::{EmbeddingEdge, Hop, MappingModel, ResolvedStep, Trigger};
pub use path::{PathStep, PathSyntaxError, PropertyPath};
pub use plan::{
    DeferredResolution, IndexingAction, IndexingPlan, IndexingWork, PlanOutcome, PlanStrategy,
};
pub use registry::ResolverRegistry;
pub use resolver::{
    paths_overlap, DirtyPaths, EntitiesToReindex, PathBitSet, PathOrdinals, ReindexingCollector,
    ResolverGraph, ResolverNode, RootResolver,
};
pub use stats::{ResolverStats, StatsSnapshot};
pub use types::{EntityReference, NodeId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
