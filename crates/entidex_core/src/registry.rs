//! Resolver registry: the entry point of implicit reindexing.
//!
//! The registry owns the compiled [`MappingModel`] and one
//! [`RootResolver`] per concrete entity type. Resolvers are built on first
//! use, at most once per type even under concurrent first access, and are
//! never rebuilt.

use crate::config::ResolverConfig;
use crate::declaration::MappingDeclarations;
use crate::error::{CoreError, CoreResult};
use crate::mapping::MappingModel;
use crate::resolver::builder::TreeBuilder;
use crate::resolver::{DirtyPaths, EntitiesToReindex, RootResolver};
use crate::stats::ResolverStats;
use entidex_model::{ModelError, ObjectAccess, ObjectId, TypeModelProvider, TypeName};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, trace};

/// Publication slot of one root resolver.
#[derive(Default)]
struct Slot {
    built: OnceLock<Arc<RootResolver>>,
    building: Mutex<()>,
}

/// Immutable registry of compiled resolvers.
pub struct ResolverRegistry {
    provider: Arc<dyn TypeModelProvider>,
    mapping: MappingModel,
    config: ResolverConfig,
    resolvers: RwLock<HashMap<TypeName, Arc<Slot>>>,
    stats: ResolverStats,
}

impl ResolverRegistry {
    /// Validates and compiles `declarations` against the type model.
    ///
    /// Every configuration error is reported here. With
    /// [`ResolverConfig::eager_build`] set, every concrete entity type's
    /// resolver is built before returning.
    pub fn bootstrap(
        provider: Arc<dyn TypeModelProvider>,
        declarations: &MappingDeclarations,
        config: ResolverConfig,
    ) -> CoreResult<Self> {
        let mapping = MappingModel::compile(provider.as_ref(), declarations)?;
        let registry = Self {
            provider,
            mapping,
            config,
            resolvers: RwLock::new(HashMap::new()),
            stats: ResolverStats::new(),
        };

        if registry.config.eager_build {
            for type_name in registry.mapping.concrete_types() {
                if registry.provider.is_entity(type_name) {
                    registry.resolver_for(type_name)?;
                }
            }
            info!(
                resolvers = registry.resolvers.read().len(),
                "built resolvers eagerly"
            );
        }
        Ok(registry)
    }

    /// Returns the entities to reindex after `object` changed.
    ///
    /// `dirty` lists the changed property paths of `object`; with `None`
    /// every relevant path is assumed dirty. The result includes `object`
    /// itself when its type is indexed and a path its document reads is
    /// dirty.
    pub fn resolve_entities_to_reindex(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
        dirty: Option<&DirtyPaths>,
    ) -> CoreResult<EntitiesToReindex> {
        let type_name = access.runtime_type(object)?.clone();
        let resolver = self.resolver_for(&type_name)?;
        let result = resolver.resolve(self.provider.as_ref(), access, object, dirty, &self.stats)?;
        trace!(%type_name, %object, entities = result.len(), "resolved update");
        Ok(result)
    }

    /// Returns the entities to reindex after `object` was deleted.
    ///
    /// `object` must still be readable through `access`. Dirtiness
    /// filtering does not apply: every relevant path is assumed changed.
    pub fn resolve_entities_to_reindex_on_delete(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
    ) -> CoreResult<EntitiesToReindex> {
        let type_name = access.runtime_type(object)?.clone();
        let resolver = self.resolver_for(&type_name)?;
        let result = resolver.resolve_on_delete(self.provider.as_ref(), access, object, &self.stats)?;
        trace!(%type_name, %object, entities = result.len(), "resolved delete");
        Ok(result)
    }

    /// Renders the compiled resolver of a concrete entity type.
    pub fn explain(&self, type_name: &TypeName) -> CoreResult<String> {
        Ok(self.resolver_for(type_name)?.explain())
    }

    /// Dirty paths that matter for changes to a concrete entity type.
    pub fn relevant_paths(&self, type_name: &TypeName) -> CoreResult<Vec<String>> {
        Ok(self.resolver_for(type_name)?.relevant_paths().to_vec())
    }

    /// Returns the resolver of a concrete entity type, building it if needed.
    pub fn resolver_for(&self, type_name: &TypeName) -> CoreResult<Arc<RootResolver>> {
        let slot = self.slot(type_name)?;
        if let Some(resolver) = slot.built.get() {
            return Ok(Arc::clone(resolver));
        }

        let _building = slot.building.lock();
        if let Some(resolver) = slot.built.get() {
            return Ok(Arc::clone(resolver));
        }
        let resolver = Arc::new(
            TreeBuilder::new(&self.mapping, self.provider.as_ref(), &self.config)
                .build(type_name)?,
        );
        self.stats.record_tree_built();
        debug!(
            %type_name,
            nodes = resolver.graph().len(),
            paths = resolver.relevant_paths().len(),
            "built resolver"
        );
        let published = slot.built.get_or_init(|| resolver);
        Ok(Arc::clone(published))
    }

    fn slot(&self, type_name: &TypeName) -> CoreResult<Arc<Slot>> {
        if let Some(slot) = self.resolvers.read().get(type_name) {
            return Ok(Arc::clone(slot));
        }

        let descriptor = self
            .provider
            .descriptor(type_name)
            .ok_or_else(|| CoreError::unknown_type(type_name.as_str()))?;
        if descriptor.is_abstract {
            return Err(ModelError::AbstractType {
                name: type_name.to_string(),
            }
            .into());
        }
        if !descriptor.is_entity() {
            return Err(CoreError::not_an_entity(
                type_name.as_str(),
                "the source of a change",
            ));
        }

        let mut resolvers = self.resolvers.write();
        Ok(Arc::clone(resolvers.entry(type_name.clone()).or_default()))
    }

    /// Number of resolvers built so far.
    pub fn built_count(&self) -> usize {
        self.resolvers
            .read()
            .values()
            .filter(|slot| slot.built.get().is_some())
            .count()
    }

    /// The compiled mapping.
    pub fn mapping(&self) -> &MappingModel {
        &self.mapping
    }

    /// The type model.
    pub fn provider(&self) -> &dyn TypeModelProvider {
        self.provider.as_ref()
    }

    /// The configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolution statistics.
    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("indexed", &self.mapping.indexed_types())
            .field("built", &self.built_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidex_model::{ObjectGraph, ObjectIdentity, TypeDescriptor, TypeModel, Value, ValueType};

    fn model() -> Arc<TypeModel> {
        Arc::new(
            TypeModel::new(vec![
                TypeDescriptor::entity("Customer")
                    .id("id", ValueType::text())
                    .property("name", ValueType::text())
                    .property("orders", ValueType::list(ValueType::object("Order"))),
                TypeDescriptor::entity("Order")
                    .id("id", ValueType::integer())
                    .property("customer", ValueType::object("Customer"))
                    .property("total", ValueType::integer())
                    .property("shippingNote", ValueType::text()),
                TypeDescriptor::embeddable("Address").property("city", ValueType::text()),
            ])
            .unwrap(),
        )
    }

    fn declarations() -> MappingDeclarations {
        let mut declarations = MappingDeclarations::new();
        declarations
            .indexed("Customer")
            .read("name")
            .read("orders[].total");
        declarations.inverse("Customer", "orders", "Order", "customer");
        declarations
    }

    fn registry(config: ResolverConfig) -> ResolverRegistry {
        ResolverRegistry::bootstrap(model(), &declarations(), config).unwrap()
    }

    fn customer_with_order(graph: &mut ObjectGraph) -> (ObjectId, ObjectId) {
        let customer = graph
            .insert("Customer", [("id", Value::from("C42"))])
            .unwrap();
        let order = graph
            .insert(
                "Order",
                [("id", Value::Integer(1)), ("customer", Value::Ref(customer))],
            )
            .unwrap();
        graph.push(customer, "orders", Value::Ref(order)).unwrap();
        (customer, order)
    }

    fn c42() -> crate::EntityReference {
        crate::EntityReference::new("Customer", ObjectIdentity::Id(Value::from("C42")))
    }

    #[test]
    fn order_total_change_reindexes_customer() {
        let registry = registry(ResolverConfig::default());
        let mut graph = ObjectGraph::new(model());
        let (_, order) = customer_with_order(&mut graph);

        let dirty: DirtyPaths = ["total"].into_iter().collect();
        let result = registry
            .resolve_entities_to_reindex(&graph, order, Some(&dirty))
            .unwrap();
        assert_eq!(result.sorted(), vec![c42()]);

        let dirty: DirtyPaths = ["shippingNote"].into_iter().collect();
        let result = registry
            .resolve_entities_to_reindex(&graph, order, Some(&dirty))
            .unwrap();
        assert!(result.is_empty());
        assert!(registry.stats().subtrees_pruned() >= 1);
    }

    #[test]
    fn delete_includes_self() {
        let registry = registry(ResolverConfig::default());
        let mut graph = ObjectGraph::new(model());
        let (customer, _) = customer_with_order(&mut graph);
        let result = registry
            .resolve_entities_to_reindex_on_delete(&graph, customer)
            .unwrap();
        assert_eq!(result.sorted(), vec![c42()]);
        assert_eq!(registry.stats().delete_resolutions(), 1);
    }

    #[test]
    fn resolvers_are_built_lazily_once() {
        let registry = registry(ResolverConfig::default());
        assert_eq!(registry.built_count(), 0);
        let mut graph = ObjectGraph::new(model());
        let (_, order) = customer_with_order(&mut graph);
        for _ in 0..3 {
            registry
                .resolve_entities_to_reindex(&graph, order, None)
                .unwrap();
        }
        assert_eq!(registry.built_count(), 1);
        assert_eq!(registry.stats().trees_built(), 1);
    }

    #[test]
    fn eager_build_covers_every_concrete_entity() {
        let registry = registry(ResolverConfig::new().eager_build(true));
        assert_eq!(registry.built_count(), 2);
    }

    #[test]
    fn non_entity_types_have_no_resolver() {
        let registry = registry(ResolverConfig::default());
        assert!(matches!(
            registry.explain(&TypeName::new("Address")),
            Err(CoreError::NotAnEntity { .. })
        ));
        assert!(matches!(
            registry.explain(&TypeName::new("Ghost")),
            Err(CoreError::UnknownType { .. })
        ));
    }

    #[test]
    fn explain_lists_relevant_paths() {
        let registry = registry(ResolverConfig::default());
        let text = registry.explain(&TypeName::new("Order")).unwrap();
        assert!(text.starts_with("resolver for Order"));
        assert!(text.contains("relevant paths: customer, total"));
        assert!(text.contains("property customer"));
        let resolver = registry.resolver_for(&TypeName::new("Order")).unwrap();
        assert_eq!(resolver.to_string(), text);
        assert!(!text.contains("on delete"));
        let customer = registry.explain(&TypeName::new("Customer")).unwrap();
        assert!(customer.contains("on delete, additionally:"));
        assert_eq!(
            registry.relevant_paths(&TypeName::new("Order")).unwrap(),
            vec!["customer".to_string(), "total".to_string()]
        );
    }
}
