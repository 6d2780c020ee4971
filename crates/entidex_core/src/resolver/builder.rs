//! Compilation of mapping metadata into one resolver tree per concrete type.
//!
//! Every trigger applicable to the root type becomes a sequence of
//! [`Op`]s; sequences are merged on common prefixes so that one property
//! read serves every dependency going through it. Landing on an entity
//! type produces a `Type` node dispatching per concrete subtype, and
//! reaching the end of a sequence means "the document part of this object
//! changed", which is itself a memoized subtree per concrete type.

use super::dirtiness::{PathBitSet, PathOrdinals};
use super::node::{ResolverGraph, ResolverNode};
use super::RootResolver;
use crate::config::ResolverConfig;
use crate::error::{CoreError, CoreResult};
use crate::mapping::{EmbeddingEdge, MappingModel, Op};
use crate::types::NodeId;
use entidex_model::{TypeModelProvider, TypeName};
use std::collections::HashMap;

/// One pending operation sequence and the dirty paths it depends on.
struct Item<'o> {
    ops: &'o [Op],
    relevance: PathBitSet,
}

/// Where dirtiness filters may be inserted.
#[derive(Clone, Copy)]
enum Scope<'s> {
    /// Never; used for embedding continuations and when filtering is off.
    Off,
    /// Always, since nothing above has filtered yet.
    Root,
    /// Only when narrower than the enclosing filter.
    Within(&'s PathBitSet),
}

pub(crate) struct TreeBuilder<'a> {
    mapping: &'a MappingModel,
    provider: &'a dyn TypeModelProvider,
    filtering: bool,
    graph: ResolverGraph,
    ordinals: PathOrdinals,
    /// Document-part subtrees by concrete type; `None` when the type has none.
    doc_parts: HashMap<TypeName, Option<NodeId>>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        mapping: &'a MappingModel,
        provider: &'a dyn TypeModelProvider,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            mapping,
            provider,
            filtering: config.dirtiness_filtering,
            graph: ResolverGraph::new(),
            ordinals: PathOrdinals::new(),
            doc_parts: HashMap::new(),
        }
    }

    /// Builds the resolver for instances of the concrete type `root_type`.
    pub(crate) fn build(mut self, root_type: &TypeName) -> CoreResult<RootResolver> {
        let mapping = self.mapping;
        let mut sequences = Vec::new();
        for trigger in mapping.triggers() {
            if self.provider.is_assignable(root_type, &trigger.changed_type) {
                let ordinal = self.ordinals.intern(&trigger.dirty_path);
                sequences.push((trigger.ops(), ordinal));
            }
        }
        let items = sequences
            .iter()
            .map(|(ops, ordinal)| Item {
                ops: ops.as_slice(),
                relevance: PathBitSet::single(*ordinal),
            })
            .collect();

        let scope = if self.filtering {
            Scope::Root
        } else {
            Scope::Off
        };
        let root = self.land(root_type, std::slice::from_ref(root_type), items, scope);
        let self_part = self.doc_part(root_type);

        if self.graph.has_placeholders() {
            return Err(CoreError::invariant(format!(
                "resolver tree for {root_type} kept a forward reference"
            )));
        }
        Ok(RootResolver {
            type_name: root_type.clone(),
            graph: self.graph,
            root,
            self_part,
            ordinals: self.ordinals,
        })
    }

    /// Builds a `Type` node for objects of static type `static_type` that
    /// continue with `items`.
    fn land(
        &mut self,
        static_type: &TypeName,
        concretes: &[TypeName],
        items: Vec<Item<'_>>,
        scope: Scope<'_>,
    ) -> Option<NodeId> {
        let (ended, continuing): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| item.ops.is_empty());
        let ended_relevance = union_of(&ended);
        let continuation = self.branches(continuing, scope);

        let mut dispatch = HashMap::new();
        for concrete in concretes {
            let mut parts = Vec::new();
            if !ended.is_empty() {
                if let Some(part) = self.doc_part(concrete) {
                    parts.push(self.filtered(part, &ended_relevance, scope));
                }
            }
            parts.extend(continuation);
            if let Some(node) = self.join(parts) {
                dispatch.insert(concrete.clone(), node);
            }
        }

        if dispatch.is_empty() {
            return None;
        }
        Some(self.graph.push(ResolverNode::Type {
            static_type: static_type.clone(),
            dispatch,
        }))
    }

    /// Merges `items` on their first operation and builds one branch per
    /// distinct operation.
    fn branches(&mut self, items: Vec<Item<'_>>, scope: Scope<'_>) -> Option<NodeId> {
        let mut groups: Vec<(&Op, Vec<Item<'_>>)> = Vec::new();
        for item in items {
            let Some((first, rest)) = item.ops.split_first() else {
                continue;
            };
            let next = Item {
                ops: rest,
                relevance: item.relevance,
            };
            match groups.iter_mut().find(|(op, _)| *op == first) {
                Some((_, group)) => group.push(next),
                None => groups.push((first, vec![next])),
            }
        }

        let mut nodes = Vec::new();
        for (op, group) in groups {
            let relevance = union_of(&group);
            let inner = match scope {
                Scope::Off => Scope::Off,
                _ => Scope::Within(&relevance),
            };
            let node = match op {
                Op::Read(name) => self.branches(group, inner).map(|nested| {
                    self.graph.push(ResolverNode::Property {
                        name: name.clone(),
                        nested,
                    })
                }),
                Op::Extract(kind) => self.branches(group, inner).map(|nested| {
                    self.graph.push(ResolverNode::ContainerExtractor {
                        kind: *kind,
                        nested,
                    })
                }),
                Op::Cast(target) => self.branches(group, inner).map(|nested| {
                    self.graph.push(ResolverNode::CastedType {
                        target: target.clone(),
                        nested,
                    })
                }),
                Op::Land(landing) => {
                    let concretes = self.mapping.concrete_types_of(landing).to_vec();
                    self.land(landing, &concretes, group, inner)
                }
            };
            if let Some(node) = node {
                nodes.push(self.filtered(node, &relevance, scope));
            }
        }
        self.join(nodes)
    }

    /// Subtree run when the document part of a `concrete` object changes:
    /// reindex it if indexed, and propagate to every embedding entity.
    fn doc_part(&mut self, concrete: &TypeName) -> Option<NodeId> {
        if let Some(cached) = self.doc_parts.get(concrete) {
            return *cached;
        }
        let mapping = self.mapping;
        if !mapping.has_document_part(concrete) {
            self.doc_parts.insert(concrete.clone(), None);
            return None;
        }

        let slot = self.graph.push(ResolverNode::Placeholder);
        self.doc_parts.insert(concrete.clone(), Some(slot));

        let mut parts = Vec::new();
        if mapping.is_indexed(concrete) {
            parts.push(self.graph.push(ResolverNode::MarkForReindexing));
        }
        let sequences: Vec<Vec<Op>> = mapping
            .edges()
            .iter()
            .filter(|edge| self.provider.is_assignable(concrete, &edge.target))
            .map(EmbeddingEdge::ops)
            .collect();
        let items = sequences
            .iter()
            .map(|ops| Item {
                ops: ops.as_slice(),
                relevance: PathBitSet::new(),
            })
            .collect();
        if let Some(embedding) = self.branches(items, Scope::Off) {
            parts.push(embedding);
        }

        self.graph.replace(slot, ResolverNode::Union(parts));
        Some(slot)
    }

    fn filtered(&mut self, node: NodeId, relevance: &PathBitSet, scope: Scope<'_>) -> NodeId {
        let wrap = match scope {
            Scope::Off => false,
            Scope::Root => true,
            Scope::Within(enclosing) => !enclosing.is_subset(relevance),
        };
        if !wrap {
            return node;
        }
        self.graph.push(ResolverNode::DirtinessFilter {
            relevant: relevance.clone(),
            nested: node,
        })
    }

    fn join(&mut self, mut nodes: Vec<NodeId>) -> Option<NodeId> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(self.graph.push(ResolverNode::Union(nodes))),
        }
    }
}

fn union_of(items: &[Item<'_>]) -> PathBitSet {
    let mut relevance = PathBitSet::new();
    for item in items {
        relevance.union_with(&item.relevance);
    }
    relevance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::MappingDeclarations;
    use entidex_model::{TypeDescriptor, TypeModel, ValueType};

    fn shop() -> TypeModel {
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
        ])
        .unwrap()
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

    fn build(type_name: &str, config: ResolverConfig) -> RootResolver {
        let model = shop();
        let mapping = MappingModel::compile(&model, &declarations()).unwrap();
        TreeBuilder::new(&mapping, &model, &config)
            .build(&TypeName::new(type_name))
            .unwrap()
    }

    fn count(resolver: &RootResolver, predicate: impl Fn(&ResolverNode) -> bool) -> usize {
        (0..resolver.graph.len())
            .filter_map(|i| resolver.graph.node(NodeId::new(i as u32)))
            .filter(|n| predicate(n))
            .count()
    }

    #[test]
    fn shared_prefix_is_read_once() {
        let resolver = build("Order", ResolverConfig::default());
        let reads = count(&resolver, |n| {
            matches!(n, ResolverNode::Property { name, .. } if name == "customer")
        });
        assert_eq!(reads, 1);
        assert_eq!(resolver.relevant_paths(), &["customer", "total"]);
    }

    #[test]
    fn undeclared_paths_are_not_relevant() {
        let resolver = build("Order", ResolverConfig::default());
        assert!(!resolver
            .relevant_paths()
            .iter()
            .any(|path| path == "shippingNote"));
    }

    #[test]
    fn filters_only_where_relevance_narrows() {
        let resolver = build("Order", ResolverConfig::default());
        let filters = count(&resolver, |n| {
            matches!(n, ResolverNode::DirtinessFilter { .. })
        });
        assert_eq!(filters, 1);

        let unfiltered = build("Order", ResolverConfig::new().dirtiness_filtering(false));
        let filters = count(&unfiltered, |n| {
            matches!(n, ResolverNode::DirtinessFilter { .. })
        });
        assert_eq!(filters, 0);
    }

    #[test]
    fn indexed_root_has_a_self_part() {
        let customer = build("Customer", ResolverConfig::default());
        assert!(customer.self_part.is_some());
        let order = build("Order", ResolverConfig::default());
        assert!(order.self_part.is_none());
        assert!(!customer.graph.has_placeholders());
    }

    #[test]
    fn self_embedding_builds_a_cycle_without_placeholders() {
        let model = TypeModel::new(vec![TypeDescriptor::entity("Category")
            .id("id", ValueType::integer())
            .property("name", ValueType::text())
            .property("parent", ValueType::object("Category"))
            .property("children", ValueType::list(ValueType::object("Category")))])
        .unwrap();
        let mut declarations = MappingDeclarations::new();
        declarations
            .indexed("Category")
            .read("name")
            .embed("parent");
        declarations.inverse("Category", "parent", "Category", "children");
        let mapping = MappingModel::compile(&model, &declarations).unwrap();
        let resolver = TreeBuilder::new(&mapping, &model, &ResolverConfig::default())
            .build(&TypeName::new("Category"))
            .unwrap();
        assert!(!resolver.graph.has_placeholders());
        assert!(resolver.explain().contains("(see"));
    }
}
