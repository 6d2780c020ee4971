//! Indexing plan: collects the changes of one unit of work and turns them
//! into indexing works.
//!
//! Events on the same object are merged before anything is resolved:
//!
//! | Previous | Event | Result |
//! |----------|-------|--------|
//! | added | update | added |
//! | updated | update | updated, dirty paths merged |
//! | any | delete | deleted |
//! | added | delete | nothing left to index |
//! | deleted | add | added |

use crate::error::CoreResult;
use crate::registry::ResolverRegistry;
use crate::resolver::{DirtyPaths, EntitiesToReindex};
use crate::types::EntityReference;
use entidex_model::{ObjectAccess, ObjectId};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// When implicit reindexing is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanStrategy {
    /// Resolve every change while processing the plan.
    #[default]
    ResolveAll,
    /// Resolve deletes while processing the plan; hand other changes back
    /// as [`DeferredResolution`]s for a background processor.
    ResolveDeletesOnly,
}

/// What happens to one index document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexingAction {
    /// Rebuild an existing document.
    Update,
    /// Create a document.
    Add,
    /// Remove a document.
    Delete,
}

impl fmt::Display for IndexingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Update => "update",
            Self::Add => "add",
            Self::Delete => "delete",
        })
    }
}

/// One document to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingWork {
    /// The entity owning the document.
    pub reference: EntityReference,
    /// The write to perform.
    pub action: IndexingAction,
}

impl fmt::Display for IndexingWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.reference)
    }
}

/// A change whose implicit reindexing was left for later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredResolution {
    /// The changed object.
    pub object: ObjectId,
    /// Its dirty paths; `None` when unknown.
    pub dirty: Option<DirtyPaths>,
}

impl DeferredResolution {
    /// Resolves the entities to reindex because of this change.
    pub fn resolve(
        &self,
        registry: &ResolverRegistry,
        access: &dyn ObjectAccess,
    ) -> CoreResult<EntitiesToReindex> {
        registry.resolve_entities_to_reindex(access, self.object, self.dirty.as_ref())
    }
}

/// Result of processing a plan.
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    /// Works sorted by entity reference, one per reference.
    pub works: Vec<IndexingWork>,
    /// Changes left for later resolution.
    pub deferred: Vec<DeferredResolution>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    Added,
    /// `None` when the changed paths are unknown.
    Updated(Option<DirtyPaths>),
    Deleted { was_added: bool },
}

/// Changes of one unit of work.
#[derive(Debug, Default)]
pub struct IndexingPlan {
    strategy: PlanStrategy,
    order: Vec<ObjectId>,
    changes: HashMap<ObjectId, Change>,
}

impl IndexingPlan {
    /// Creates an empty plan.
    pub fn new(strategy: PlanStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Records the creation of an object.
    pub fn add(&mut self, object: ObjectId) {
        self.record(object, Change::Added);
    }

    /// Records changes to known paths of an object.
    pub fn update(&mut self, object: ObjectId, dirty: DirtyPaths) {
        self.record(object, Change::Updated(Some(dirty)));
    }

    /// Records a change to an object without knowing which paths changed.
    pub fn update_unknown(&mut self, object: ObjectId) {
        self.record(object, Change::Updated(None));
    }

    /// Records the deletion of an object.
    ///
    /// The object must stay readable until the plan is processed.
    pub fn delete(&mut self, object: ObjectId) {
        self.record(object, Change::Deleted { was_added: false });
    }

    /// Number of objects with pending changes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Discards every recorded change.
    pub fn clear(&mut self) {
        self.order.clear();
        self.changes.clear();
    }

    fn record(&mut self, object: ObjectId, event: Change) {
        let Some(previous) = self.changes.get_mut(&object) else {
            self.order.push(object);
            self.changes.insert(object, event);
            return;
        };
        let merged = match (&*previous, event) {
            (Change::Deleted { .. }, Change::Added) => Change::Added,
            (Change::Deleted { .. }, _) => return,
            (Change::Added, Change::Deleted { .. }) => Change::Deleted { was_added: true },
            (_, Change::Deleted { was_added }) => Change::Deleted { was_added },
            (_, Change::Added) | (Change::Added, Change::Updated(_)) => Change::Added,
            (Change::Updated(None), Change::Updated(_))
            | (Change::Updated(_), Change::Updated(None)) => Change::Updated(None),
            (Change::Updated(Some(known)), Change::Updated(Some(more))) => {
                let mut union = known.clone();
                union.extend_from(&more);
                Change::Updated(Some(union))
            }
        };
        *previous = merged;
    }

    /// Resolves the recorded changes into indexing works.
    ///
    /// Works for the same reference are merged: delete wins over add,
    /// which wins over update.
    pub fn process(
        &self,
        registry: &ResolverRegistry,
        access: &dyn ObjectAccess,
    ) -> CoreResult<PlanOutcome> {
        let mut works: HashMap<EntityReference, IndexingAction> = HashMap::new();
        let mut deferred = Vec::new();
        let mapping = registry.mapping();

        for &object in &self.order {
            let Some(change) = self.changes.get(&object) else {
                continue;
            };
            let type_name = access.runtime_type(object)?.clone();
            let indexed = mapping.is_indexed(&type_name);
            let own = || -> CoreResult<EntityReference> {
                Ok(EntityReference::new(
                    type_name.clone(),
                    registry.provider().identity_of(access, object)?,
                ))
            };

            match change {
                Change::Deleted { was_added: true } => {}
                Change::Deleted { was_added: false } => {
                    let resolved = registry.resolve_entities_to_reindex_on_delete(access, object)?;
                    merge_all(&mut works, resolved);
                    if indexed {
                        merge(&mut works, own()?, IndexingAction::Delete);
                    }
                }
                Change::Added | Change::Updated(_) => {
                    let dirty = match change {
                        Change::Updated(dirty) => dirty.clone(),
                        _ => None,
                    };
                    if *change == Change::Added && indexed {
                        merge(&mut works, own()?, IndexingAction::Add);
                    }
                    match self.strategy {
                        PlanStrategy::ResolveAll => {
                            let resolved =
                                registry.resolve_entities_to_reindex(access, object, dirty.as_ref())?;
                            merge_all(&mut works, resolved);
                        }
                        PlanStrategy::ResolveDeletesOnly => {
                            deferred.push(DeferredResolution { object, dirty });
                        }
                    }
                }
            }
        }

        let mut works: Vec<IndexingWork> = works
            .into_iter()
            .map(|(reference, action)| IndexingWork { reference, action })
            .collect();
        works.sort_by(|a, b| a.reference.cmp(&b.reference));
        debug!(
            changes = self.order.len(),
            works = works.len(),
            deferred = deferred.len(),
            "processed indexing plan"
        );
        Ok(PlanOutcome { works, deferred })
    }
}

fn merge(
    works: &mut HashMap<EntityReference, IndexingAction>,
    reference: EntityReference,
    action: IndexingAction,
) {
    let slot = works.entry(reference).or_insert(action);
    *slot = (*slot).max(action);
}

fn merge_all(works: &mut HashMap<EntityReference, IndexingAction>, resolved: EntitiesToReindex) {
    for reference in resolved {
        merge(works, reference, IndexingAction::Update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::declaration::MappingDeclarations;
    use entidex_model::{ObjectGraph, ObjectIdentity, TypeDescriptor, TypeModel, Value, ValueType};
    use std::sync::Arc;

    fn model() -> Arc<TypeModel> {
        Arc::new(
            TypeModel::new(vec![
                TypeDescriptor::entity("Customer")
                    .id("id", ValueType::text())
                    .property("orders", ValueType::list(ValueType::object("Order"))),
                TypeDescriptor::entity("Order")
                    .id("id", ValueType::integer())
                    .property("customer", ValueType::object("Customer"))
                    .property("total", ValueType::integer())
                    .property("shippingNote", ValueType::text()),
            ])
            .unwrap(),
        )
    }

    fn registry() -> ResolverRegistry {
        let mut declarations = MappingDeclarations::new();
        declarations.indexed("Customer").read("orders[].total");
        declarations.inverse("Customer", "orders", "Order", "customer");
        ResolverRegistry::bootstrap(model(), &declarations, ResolverConfig::default()).unwrap()
    }

    struct Shop {
        graph: ObjectGraph,
        customer: ObjectId,
        order: ObjectId,
    }

    fn shop() -> Shop {
        let mut graph = ObjectGraph::new(model());
        let customer = graph.insert("Customer", [("id", Value::from("C1"))]).unwrap();
        let order = graph
            .insert(
                "Order",
                [("id", Value::Integer(7)), ("customer", Value::Ref(customer))],
            )
            .unwrap();
        graph.push(customer, "orders", Value::Ref(order)).unwrap();
        Shop {
            graph,
            customer,
            order,
        }
    }

    fn customer_ref() -> EntityReference {
        EntityReference::new("Customer", ObjectIdentity::Id(Value::from("C1")))
    }

    fn dirty(paths: &[&str]) -> DirtyPaths {
        paths.iter().copied().collect()
    }

    #[test]
    fn update_merging() {
        let mut plan = IndexingPlan::new(PlanStrategy::ResolveAll);
        let object = ObjectId::new(1);
        plan.update(object, dirty(&["a"]));
        plan.update(object, dirty(&["b"]));
        assert_eq!(
            plan.changes[&object],
            Change::Updated(Some(dirty(&["a", "b"])))
        );
        plan.update_unknown(object);
        plan.update(object, dirty(&["c"]));
        assert_eq!(plan.changes[&object], Change::Updated(None));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn add_absorbs_updates_and_delete_cancels_add() {
        let mut plan = IndexingPlan::new(PlanStrategy::ResolveAll);
        let object = ObjectId::new(1);
        plan.add(object);
        plan.update(object, dirty(&["a"]));
        assert_eq!(plan.changes[&object], Change::Added);
        plan.delete(object);
        assert_eq!(plan.changes[&object], Change::Deleted { was_added: true });
        plan.update(object, dirty(&["a"]));
        assert_eq!(plan.changes[&object], Change::Deleted { was_added: true });
        plan.add(object);
        assert_eq!(plan.changes[&object], Change::Added);
    }

    #[test]
    fn order_update_becomes_customer_update() {
        let registry = registry();
        let shop = shop();
        let mut plan = IndexingPlan::new(PlanStrategy::ResolveAll);
        plan.update(shop.order, dirty(&["total"]));
        let outcome = plan.process(&registry, &shop.graph).unwrap();
        assert_eq!(
            outcome.works,
            vec![IndexingWork {
                reference: customer_ref(),
                action: IndexingAction::Update,
            }]
        );
        assert!(outcome.deferred.is_empty());
    }

    #[test]
    fn delete_wins_over_update() {
        let registry = registry();
        let shop = shop();
        let mut plan = IndexingPlan::new(PlanStrategy::ResolveAll);
        plan.update(shop.order, dirty(&["total"]));
        plan.delete(shop.customer);
        let outcome = plan.process(&registry, &shop.graph).unwrap();
        assert_eq!(outcome.works.len(), 1);
        assert_eq!(outcome.works[0].action, IndexingAction::Delete);
        assert_eq!(outcome.works[0].to_string(), "delete Customer(C1)");
    }

    #[test]
    fn added_then_deleted_produces_nothing() {
        let registry = registry();
        let shop = shop();
        let mut plan = IndexingPlan::new(PlanStrategy::ResolveAll);
        plan.add(shop.customer);
        plan.delete(shop.customer);
        let outcome = plan.process(&registry, &shop.graph).unwrap();
        assert!(outcome.works.is_empty());
    }

    #[test]
    fn deletes_only_strategy_defers_updates() {
        let registry = registry();
        let shop = shop();
        let mut plan = IndexingPlan::new(PlanStrategy::ResolveDeletesOnly);
        plan.update(shop.order, dirty(&["total"]));
        plan.add(shop.customer);
        let outcome = plan.process(&registry, &shop.graph).unwrap();

        assert_eq!(
            outcome.works,
            vec![IndexingWork {
                reference: customer_ref(),
                action: IndexingAction::Add,
            }]
        );
        assert_eq!(outcome.deferred.len(), 2);
        let later = outcome.deferred[0]
            .resolve(&registry, &shop.graph)
            .unwrap();
        assert_eq!(later.sorted(), vec![customer_ref()]);
    }
}
