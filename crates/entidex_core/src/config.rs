//! Resolver configuration.

/// Configuration for a [`ResolverRegistry`](crate::ResolverRegistry).
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Whether compiled trees contain dirtiness filters.
    ///
    /// When disabled every relevant subtree is traversed regardless of
    /// which properties changed. Results are identical either way.
    pub dirtiness_filtering: bool,

    /// Whether every concrete type's resolver is built during bootstrap
    /// instead of on first use.
    pub eager_build: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dirtiness_filtering: true,
            eager_build: false,
        }
    }
}

impl ResolverConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether dirtiness filters are compiled into the trees.
    #[must_use]
    pub const fn dirtiness_filtering(mut self, value: bool) -> Self {
        self.dirtiness_filtering = value;
        self
    }

    /// Sets whether resolvers are built eagerly at bootstrap.
    #[must_use]
    pub const fn eager_build(mut self, value: bool) -> Self {
        self.eager_build = value;
        self
    }
}
