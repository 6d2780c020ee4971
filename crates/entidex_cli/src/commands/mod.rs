//! CLI command implementations.

pub mod check;
pub mod explain;
pub mod resolve;
