//! # EntiDex Testkit
//!
//! Test utilities for EntiDex.
//!
//! This crate provides:
//! - Mapping fixtures (shop, category tree, spouses, catalog) and graph helpers
//! - Property-based test generators using proptest
//! - Temporary file helpers for file-based tests
//! - Stress testing utilities for concurrent resolution
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entidex_testkit::prelude::*;
//!
//! #[test]
//! fn order_change_reindexes_customer() {
//!     let fixture = shop();
//!     let registry = fixture.registry();
//!     let mut graph = fixture.graph();
//!     let customer = add_customer(&mut graph, "C42");
//!     let order = add_order(&mut graph, 1, Some(customer), 10);
//!     let result = registry
//!         .resolve_entities_to_reindex(&graph, order, Some(&dirty(&["total"])))
//!         .unwrap();
//!     assert_eq!(result.sorted(), vec![reference("Customer", "C42")]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
