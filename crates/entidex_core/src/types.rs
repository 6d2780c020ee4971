//! Core type definitions for EntiDex.

use entidex_model::{ObjectIdentity, TypeName};
use std::fmt;

/// Identity of a domain object whose index document must be rebuilt.
///
/// Pairs the exact runtime type with the object's identifier (or its
/// instance identity when no identifier is available).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityReference {
    /// Exact runtime type of the object.
    pub type_name: TypeName,
    /// Identifier of the object.
    pub identity: ObjectIdentity,
}

impl EntityReference {
    /// Creates a new entity reference.
    pub fn new(type_name: impl Into<TypeName>, identity: ObjectIdentity) -> Self {
        Self {
            type_name: type_name.into(),
            identity,
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, self.identity)
    }
}

/// Index of a node in a compiled resolver tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Creates a new node ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_model::{ObjectId, Value};

    #[test]
    fn reference_display() {
        let reference = EntityReference::new("Customer", ObjectIdentity::Id(Value::from("C42")));
        assert_eq!(reference.to_string(), "Customer(C42)");

        let anonymous = EntityReference::new("Order", ObjectIdentity::Instance(ObjectId::new(3)));
        assert_eq!(anonymous.to_string(), "Order(#3)");
    }

    #[test]
    fn references_compare_by_type_then_identity() {
        let a = EntityReference::new("A", ObjectIdentity::Id(Value::Integer(2)));
        let b = EntityReference::new("B", ObjectIdentity::Id(Value::Integer(1)));
        assert!(a < b);
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "n7");
        assert_eq!(NodeId::new(7).index(), 7);
    }
}
