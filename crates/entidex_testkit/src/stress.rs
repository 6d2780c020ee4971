//! Stress tests for EntiDex.
//!
//! These helpers hammer a registry with resolutions, sequentially or from
//! several threads sharing it, and report throughput.

use entidex_core::{DirtyPaths, ResolverRegistry};
use entidex_model::{ObjectAccess, ObjectId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total resolutions performed.
    pub total_ops: usize,
    /// Successful resolutions.
    pub successful_ops: usize,
    /// Failed resolutions.
    pub failed_ops: usize,
    /// Entities collected over all successful resolutions.
    pub entities: usize,
    /// Total duration.
    pub duration: Duration,
    /// Resolutions per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, entities: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            entities,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total resolutions: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Entities collected: {}", self.entities);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of resolutions to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
        }
    }
}

/// Resolves changes to `objects` in turn, `config.operations` times.
pub fn stress_sequential_resolutions(
    registry: &ResolverRegistry,
    access: &dyn ObjectAccess,
    objects: &[ObjectId],
    dirty: Option<&DirtyPaths>,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;
    let mut entities = 0usize;

    for i in 0..config.operations {
        let Some(&object) = objects.get(i % objects.len().max(1)) else {
            break;
        };
        match registry.resolve_entities_to_reindex(access, object, dirty) {
            Ok(result) => {
                successful += 1;
                entities += result.len();
            }
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, entities, start.elapsed())
}

/// Resolves changes to `objects` from `config.threads` threads sharing one
/// registry.
pub fn stress_concurrent_resolutions<A>(
    registry: &ResolverRegistry,
    access: &A,
    objects: &[ObjectId],
    dirty: Option<&DirtyPaths>,
    config: &StressConfig,
) -> StressTestResult
where
    A: ObjectAccess + Sync,
{
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let entities = AtomicUsize::new(0);
    let threads = config.threads.max(1);
    let ops_per_thread = config.operations / threads;

    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..threads {
            let (successful, failed, entities) = (&successful, &failed, &entities);
            scope.spawn(move || {
                for i in 0..ops_per_thread {
                    let Some(&object) = objects.get((t + i) % objects.len().max(1)) else {
                        break;
                    };
                    match registry.resolve_entities_to_reindex(access, object, dirty) {
                        Ok(result) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                            entities.fetch_add(result.len(), Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        entities.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{add_customer, add_order, dirty, shop};

    #[test]
    fn test_sequential_resolutions() {
        let fixture = shop();
        let registry = fixture.registry();
        let mut graph = fixture.graph();
        let customer = add_customer(&mut graph, "C1");
        let orders: Vec<_> = (0..4)
            .map(|i| add_order(&mut graph, i, Some(customer), 10))
            .collect();

        let config = StressConfig {
            operations: 100,
            threads: 1,
        };
        let result =
            stress_sequential_resolutions(&registry, &graph, &orders, Some(&dirty(&["total"])), &config);
        assert_eq!(result.successful_ops, 100);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.entities, 100);
    }

    #[test]
    fn test_concurrent_resolutions_build_once() {
        let fixture = shop();
        let registry = fixture.registry();
        let mut graph = fixture.graph();
        let customer = add_customer(&mut graph, "C1");
        let orders: Vec<_> = (0..4)
            .map(|i| add_order(&mut graph, i, Some(customer), 10))
            .collect();

        let config = StressConfig {
            operations: 400,
            threads: 4,
        };
        let result = stress_concurrent_resolutions(&registry, &graph, &orders, None, &config);
        assert_eq!(result.successful_ops, 400);
        assert_eq!(registry.stats().trees_built(), 1);
    }
}
