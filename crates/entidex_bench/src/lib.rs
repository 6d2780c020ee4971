//! Benchmark utilities.

use entidex_model::{ObjectGraph, ObjectId};
use entidex_testkit::{add_customer, add_order, category_chain, category_tree, shop, Fixture};

/// A shop graph with one customer owning `orders` orders.
pub fn wide_shop(orders: usize) -> (Fixture, ObjectGraph, ObjectId, Vec<ObjectId>) {
    let fixture = shop();
    let mut graph = fixture.graph();
    let customer = add_customer(&mut graph, "C0");
    let ids = (0..orders)
        .map(|i| add_order(&mut graph, i as i64, Some(customer), 10))
        .collect();
    (fixture, graph, customer, ids)
}

/// A category chain of `depth` categories, root first.
pub fn deep_categories(depth: usize) -> (Fixture, ObjectGraph, Vec<ObjectId>) {
    let fixture = category_tree();
    let mut graph = fixture.graph();
    let chain = category_chain(&mut graph, depth);
    (fixture, graph, chain)
}
