//! Property-based test generators using proptest.
//!
//! Strategies produce plain descriptions of object graphs; the `build_*`
//! functions turn them into [`ObjectGraph`]s over the fixture models.

use crate::fixtures::{add_category, add_customer, add_order, add_supplier};
use entidex_core::DirtyPaths;
use entidex_model::{ObjectGraph, ObjectId, Value};
use proptest::prelude::*;

/// Paths of a shop `Order` that a change may touch.
pub const ORDER_PATHS: &[&str] = &["total", "shippingNote", "customer", "lines", "lines.sku"];

/// Paths of a shop `Customer` that a change may touch.
pub const CUSTOMER_PATHS: &[&str] = &["name", "tier", "orders", "address", "address.city"];

/// Owner of a generated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyChoice {
    /// No owner.
    Nobody,
    /// The customer at this index.
    Customer(usize),
    /// The supplier at this index.
    Supplier(usize),
}

/// Description of a shop object graph.
#[derive(Debug, Clone)]
pub struct ShopSpec {
    /// Number of customers.
    pub customers: usize,
    /// Number of suppliers.
    pub suppliers: usize,
    /// Owner and total of each order.
    pub orders: Vec<(PartyChoice, i64)>,
}

/// A shop graph built from a [`ShopSpec`].
pub struct ShopGraph {
    /// The objects.
    pub graph: ObjectGraph,
    /// Customer ids, named `C0`, `C1`, ...
    pub customers: Vec<ObjectId>,
    /// Supplier ids, named `S0`, `S1`, ...
    pub suppliers: Vec<ObjectId>,
    /// Order ids, numbered from 0.
    pub orders: Vec<ObjectId>,
    /// Owner of each order.
    pub owners: Vec<PartyChoice>,
}

/// Strategy for shop graphs with up to 4 customers, 2 suppliers and 12 orders.
pub fn shop_spec_strategy() -> impl Strategy<Value = ShopSpec> {
    (1usize..=4, 0usize..=2).prop_flat_map(|(customers, suppliers)| {
        let party = prop_oneof![
            1 => Just(PartyChoice::Nobody),
            4 => (0..customers).prop_map(PartyChoice::Customer),
            1 => (0..suppliers.max(1)).prop_map(move |i| {
                if suppliers == 0 {
                    PartyChoice::Nobody
                } else {
                    PartyChoice::Supplier(i)
                }
            }),
        ];
        prop::collection::vec((party, 0i64..1000), 1..12).prop_map(move |orders| ShopSpec {
            customers,
            suppliers,
            orders,
        })
    })
}

/// Builds a shop graph over `graph`, which must use the shop model.
pub fn build_shop(mut graph: ObjectGraph, spec: &ShopSpec) -> ShopGraph {
    let customers: Vec<ObjectId> = (0..spec.customers)
        .map(|i| add_customer(&mut graph, &format!("C{i}")))
        .collect();
    let suppliers: Vec<ObjectId> = (0..spec.suppliers)
        .map(|i| add_supplier(&mut graph, &format!("S{i}")))
        .collect();
    let mut orders = Vec::with_capacity(spec.orders.len());
    let mut owners = Vec::with_capacity(spec.orders.len());
    for (i, (owner, total)) in spec.orders.iter().enumerate() {
        let party = match owner {
            PartyChoice::Nobody => None,
            PartyChoice::Customer(c) => Some(customers[*c]),
            PartyChoice::Supplier(s) => Some(suppliers[*s]),
        };
        orders.push(add_order(&mut graph, i as i64, party, *total));
        owners.push(*owner);
    }
    ShopGraph {
        graph,
        customers,
        suppliers,
        orders,
        owners,
    }
}

/// Strategy for a subset of `paths`.
pub fn dirty_paths_strategy(paths: &'static [&'static str]) -> impl Strategy<Value = DirtyPaths> {
    prop::sample::subsequence(paths, 0..=paths.len())
        .prop_map(|chosen| chosen.into_iter().collect())
}

/// Description of a category forest: `parents[i]` is the parent of
/// category `i`, always an earlier category.
#[derive(Debug, Clone)]
pub struct ForestSpec {
    /// Parent index per category.
    pub parents: Vec<Option<usize>>,
    /// Extra `parent` link from a category to a later one, which closes a
    /// cycle when the later one is a descendant.
    pub back_edge: Option<(usize, usize)>,
}

/// Strategy for category forests of up to `max` categories.
pub fn forest_spec_strategy(max: usize) -> impl Strategy<Value = ForestSpec> {
    (1..=max.max(1))
        .prop_flat_map(|size| {
            let parents: Vec<BoxedStrategy<Option<usize>>> = (0..size)
                .map(|i| {
                    if i == 0 {
                        Just(None).boxed()
                    } else {
                        prop::option::of(0..i).boxed()
                    }
                })
                .collect();
            (parents, prop::option::of((0..size, 0..size)))
        })
        .prop_map(|(parents, back_edge)| ForestSpec {
            parents,
            back_edge: back_edge.filter(|(from, to)| from < to),
        })
}

/// Builds a category forest over `graph`, which must use the category model.
pub fn build_forest(mut graph: ObjectGraph, spec: &ForestSpec) -> (ObjectGraph, Vec<ObjectId>) {
    let mut ids: Vec<ObjectId> = Vec::with_capacity(spec.parents.len());
    for (i, parent) in spec.parents.iter().enumerate() {
        let parent = parent.map(|p| ids[p]);
        ids.push(add_category(&mut graph, i as i64, parent));
    }
    if let Some((ancestor, descendant)) = spec.back_edge {
        graph
            .set(ids[ancestor], "parent", ids[descendant])
            .expect("parent must be settable");
        graph
            .push(ids[descendant], "children", Value::Ref(ids[ancestor]))
            .expect("children must be a list");
    }
    (graph, ids)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{category_tree, shop};
    use entidex_model::ObjectAccess;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn shop_orders_point_at_their_owner(spec in shop_spec_strategy()) {
            let shop_graph = build_shop(shop().graph(), &spec);
            prop_assert_eq!(shop_graph.orders.len(), spec.orders.len());
            for (order, owner) in shop_graph.orders.iter().zip(&shop_graph.owners) {
                let customer = shop_graph.graph.read_property(*order, "customer").unwrap();
                prop_assert_eq!(customer.is_null(), *owner == PartyChoice::Nobody);
            }
        }

        #[test]
        fn forest_parents_come_first(spec in forest_spec_strategy(12)) {
            for (i, parent) in spec.parents.iter().enumerate() {
                prop_assert!(parent.map_or(true, |p| p < i));
            }
            let (graph, ids) = build_forest(category_tree().graph(), &spec);
            prop_assert_eq!(graph.len(), ids.len());
        }

        #[test]
        fn dirty_subsets_stay_in_range(dirty in dirty_paths_strategy(ORDER_PATHS)) {
            prop_assert!(dirty.iter().all(|p| ORDER_PATHS.contains(&p)));
        }
    }
}
