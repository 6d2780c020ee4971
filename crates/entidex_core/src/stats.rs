//! Resolver statistics.
//!
//! Counters are shared by every resolution running against one registry.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = ResolverRegistry::bootstrap(model, declarations, ResolverConfig::default())?;
//! registry.resolve_entities_to_reindex(&graph, order, None)?;
//!
//! let stats = registry.stats().snapshot();
//! println!("Resolutions: {}", stats.resolutions);
//! println!("Pruned subtrees: {}", stats.subtrees_pruned);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Resolver statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// Number of update resolutions.
    resolutions: AtomicU64,
    /// Number of delete resolutions.
    delete_resolutions: AtomicU64,
    /// Entity references handed back to callers (after deduplication).
    entities_collected: AtomicU64,
    /// Subtrees skipped by dirtiness filters.
    subtrees_pruned: AtomicU64,
    /// Traversals stopped because a (node, object) pair was already visited.
    cycles_cut: AtomicU64,
    /// Root resolvers built.
    trees_built: AtomicU64,
}

impl ResolverStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    /// Records a resolution and the number of entities it produced.
    pub(crate) fn record_resolution(&self, delete: bool, entities: usize) {
        if delete {
            self.delete_resolutions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.resolutions.fetch_add(1, Ordering::Relaxed);
        }
        self.entities_collected
            .fetch_add(entities as u64, Ordering::Relaxed);
    }

    /// Records a pruned subtree.
    pub(crate) fn record_pruned(&self) {
        self.subtrees_pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cycle cut by the visited set.
    pub(crate) fn record_cycle_cut(&self) {
        self.cycles_cut.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a root resolver build.
    pub(crate) fn record_tree_built(&self) {
        self.trees_built.fetch_add(1, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of update resolutions.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Returns the number of delete resolutions.
    pub fn delete_resolutions(&self) -> u64 {
        self.delete_resolutions.load(Ordering::Relaxed)
    }

    /// Returns the total number of entity references produced.
    pub fn entities_collected(&self) -> u64 {
        self.entities_collected.load(Ordering::Relaxed)
    }

    /// Returns the number of subtrees skipped by dirtiness filters.
    pub fn subtrees_pruned(&self) -> u64 {
        self.subtrees_pruned.load(Ordering::Relaxed)
    }

    /// Returns the number of cycles cut.
    ///
    /// Also counts diamonds: two paths reaching the same object through the
    /// same node.
    pub fn cycles_cut(&self) -> u64 {
        self.cycles_cut.load(Ordering::Relaxed)
    }

    /// Returns the number of root resolvers built.
    pub fn trees_built(&self) -> u64 {
        self.trees_built.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            resolutions: self.resolutions(),
            delete_resolutions: self.delete_resolutions(),
            entities_collected: self.entities_collected(),
            subtrees_pruned: self.subtrees_pruned(),
            cycles_cut: self.cycles_cut(),
            trees_built: self.trees_built(),
        }
    }
}

/// A point-in-time snapshot of resolver statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Number of update resolutions.
    pub resolutions: u64,
    /// Number of delete resolutions.
    pub delete_resolutions: u64,
    /// Total entity references produced.
    pub entities_collected: u64,
    /// Subtrees skipped by dirtiness filters.
    pub subtrees_pruned: u64,
    /// Cycles cut by the visited set.
    pub cycles_cut: u64,
    /// Root resolvers built.
    pub trees_built: u64,
}
