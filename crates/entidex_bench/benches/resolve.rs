//! Resolution benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entidex_bench::{deep_categories, wide_shop};
use entidex_core::ResolverConfig;
use entidex_testkit::dirty;

/// Benchmark resolving order changes, with and without dirtiness.
fn bench_order_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_update");
    let (fixture, graph, _, orders) = wide_shop(16);
    let registry = fixture.registry();
    let total = dirty(&["total"]);
    let note = dirty(&["shippingNote"]);

    group.bench_function("dirty_total", |b| {
        b.iter(|| {
            let result = registry
                .resolve_entities_to_reindex(&graph, black_box(orders[0]), Some(&total))
                .unwrap();
            black_box(result);
        });
    });

    group.bench_function("dirty_irrelevant", |b| {
        b.iter(|| {
            let result = registry
                .resolve_entities_to_reindex(&graph, black_box(orders[0]), Some(&note))
                .unwrap();
            black_box(result);
        });
    });

    group.bench_function("dirty_unknown", |b| {
        b.iter(|| {
            let result = registry
                .resolve_entities_to_reindex(&graph, black_box(orders[0]), None)
                .unwrap();
            black_box(result);
        });
    });

    group.finish();
}

/// Benchmark fan-out from a customer to its orders.
fn bench_customer_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("customer_fanout");

    for count in [10, 100, 1000] {
        let (fixture, graph, customer, _) = wide_shop(count);
        let tier = dirty(&["tier"]);
        for filtering in [true, false] {
            let registry =
                fixture.registry_with(ResolverConfig::new().dirtiness_filtering(filtering));
            let name = if filtering { "filtered" } else { "unfiltered" };
            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(BenchmarkId::new(name, count), &count, |b, _| {
                b.iter(|| {
                    let result = registry
                        .resolve_entities_to_reindex(&graph, black_box(customer), Some(&tier))
                        .unwrap();
                    black_box(result);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark deep recursive embedding.
fn bench_category_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("category_depth");
    let name = dirty(&["name"]);

    for depth in [10, 100, 1000] {
        let (fixture, graph, chain) = deep_categories(depth);
        let registry = fixture.registry();
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let result = registry
                    .resolve_entities_to_reindex(&graph, black_box(chain[0]), Some(&name))
                    .unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_order_update,
    bench_customer_fanout,
    bench_category_depth
);
criterion_main!(benches);
