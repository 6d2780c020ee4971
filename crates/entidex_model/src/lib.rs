//! # EntiDex Model
//!
//! Type model and in-memory object graph for EntiDex.
//!
//! This crate provides:
//! - Type descriptors (entities, embeddables, properties, value types)
//! - A validated type registry with inheritance closure
//! - The [`TypeModelProvider`] and [`ObjectAccess`] interfaces the resolver core runs against
//! - An in-memory [`ObjectGraph`] of domain objects
//!
//! ## Usage
//!
//! ```
//! use entidex_model::{ObjectAccess, ObjectGraph, TypeDescriptor, TypeModel, Value, ValueType};
//! use std::sync::Arc;
//!
//! let model = TypeModel::new(vec![
//!     TypeDescriptor::entity("Customer").id("id", ValueType::text()),
//!     TypeDescriptor::entity("Order").property("customer", ValueType::object("Customer")),
//! ])
//! .unwrap();
//!
//! let mut graph = ObjectGraph::new(Arc::new(model));
//! let customer = graph.insert("Customer", [("id", Value::from("C42"))]).unwrap();
//! let order = graph.insert("Order", [("customer", Value::Ref(customer))]).unwrap();
//! assert_eq!(graph.read_property(order, "customer").unwrap(), &Value::Ref(customer));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod graph;
mod model;
mod types;
mod value;

pub use error::{ModelError, ModelResult};
pub use graph::{DomainObject, ObjectAccess, ObjectGraph, ObjectId, ObjectIdentity};
pub use model::{TypeModel, TypeModelProvider, TypeModelSpec};
pub use types::{PropertyDescriptor, ScalarKind, TypeDescriptor, TypeKind, TypeName, ValueType};
pub use value::{ContainerKind, Value};
