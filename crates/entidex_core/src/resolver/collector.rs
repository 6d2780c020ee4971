//! Per-invocation accumulator of entities to reindex.

use crate::types::{EntityReference, NodeId};
use entidex_model::ObjectId;
use std::collections::HashSet;

/// Mutable state of one resolution: the entities found so far and the
/// (node, object) pairs already traversed.
///
/// Created fresh for each top-level call and never shared between threads.
#[derive(Debug, Default)]
pub struct ReindexingCollector {
    entities: HashSet<EntityReference>,
    visited: HashSet<(NodeId, ObjectId)>,
}

impl ReindexingCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entity to reindex. Returns false if it was already recorded.
    pub fn add_entity_to_reindex(&mut self, reference: EntityReference) -> bool {
        self.entities.insert(reference)
    }

    /// Marks a (node, object) pair as traversed. Returns false if it already was.
    pub fn mark_visited(&mut self, node: NodeId, object: ObjectId) -> bool {
        self.visited.insert((node, object))
    }

    /// Returns true if the (node, object) pair was traversed.
    pub fn was_visited(&self, node: NodeId, object: ObjectId) -> bool {
        self.visited.contains(&(node, object))
    }

    /// Number of distinct (node, object) pairs traversed.
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Consumes the collector and returns the deduplicated result.
    pub fn result(self) -> EntitiesToReindex {
        EntitiesToReindex {
            entities: self.entities,
        }
    }
}

/// Deduplicated set of entities whose documents must be rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitiesToReindex {
    entities: HashSet<EntityReference>,
}

impl EntitiesToReindex {
    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing needs reindexing.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns true if the entity is in the set.
    pub fn contains(&self, reference: &EntityReference) -> bool {
        self.entities.contains(reference)
    }

    /// Iterates over the entities in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityReference> {
        self.entities.iter()
    }

    /// Returns the entities sorted by type, then identity.
    pub fn sorted(&self) -> Vec<EntityReference> {
        let mut entities: Vec<_> = self.entities.iter().cloned().collect();
        entities.sort();
        entities
    }

    /// Returns true if every entity of `self` is in `other`.
    pub fn is_subset(&self, other: &EntitiesToReindex) -> bool {
        self.entities.is_subset(&other.entities)
    }
}

impl IntoIterator for EntitiesToReindex {
    type Item = EntityReference;
    type IntoIter = std::collections::hash_set::IntoIter<EntityReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl FromIterator<EntityReference> for EntitiesToReindex {
    fn from_iter<I: IntoIterator<Item = EntityReference>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_model::{ObjectIdentity, Value};

    fn reference(id: i64) -> EntityReference {
        EntityReference::new("Customer", ObjectIdentity::Id(Value::Integer(id)))
    }

    #[test]
    fn adding_twice_is_a_no_op() {
        let mut collector = ReindexingCollector::new();
        assert!(collector.add_entity_to_reindex(reference(1)));
        assert!(!collector.add_entity_to_reindex(reference(1)));
        assert!(collector.add_entity_to_reindex(reference(2)));
        assert_eq!(collector.result().len(), 2);
    }

    #[test]
    fn visited_pairs() {
        let mut collector = ReindexingCollector::new();
        let node = NodeId::new(4);
        let object = ObjectId::new(9);
        assert!(!collector.was_visited(node, object));
        assert!(collector.mark_visited(node, object));
        assert!(collector.was_visited(node, object));
        assert!(!collector.mark_visited(node, object));
        assert!(!collector.was_visited(NodeId::new(5), object));
        assert_eq!(collector.visited_len(), 1);
    }

    #[test]
    fn result_is_sorted_on_request() {
        let mut collector = ReindexingCollector::new();
        collector.add_entity_to_reindex(reference(3));
        collector.add_entity_to_reindex(reference(1));
        let result = collector.result();
        assert_eq!(result.sorted(), vec![reference(1), reference(3)]);
        assert!(result.contains(&reference(3)));
        assert!(!result.contains(&reference(2)));
    }

    #[test]
    fn subset() {
        let small: EntitiesToReindex = [reference(1)].into_iter().collect();
        let large: EntitiesToReindex = [reference(1), reference(2)].into_iter().collect();
        assert!(small.is_subset(&large));
        assert!(!large.is_subset(&small));
    }
}
