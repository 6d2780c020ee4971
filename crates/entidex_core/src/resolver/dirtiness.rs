//! Dirtiness information and its compiled form.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Property paths known to have changed on one object.
///
/// Paths are property names relative to the changed object, joined with
/// `.` (`total`, `address.city`). A path matches a declared path when they
/// are equal or one is a `.`-prefix of the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyPaths {
    paths: BTreeSet<String>,
}

impl DirtyPaths {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path.
    pub fn insert(&mut self, path: impl Into<String>) {
        self.paths.insert(path.into());
    }

    /// Adds every path of `other`.
    pub fn extend_from(&mut self, other: &DirtyPaths) {
        self.paths.extend(other.paths.iter().cloned());
    }

    /// Returns true if the exact path is present.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Returns true if any path matches `declared`.
    pub fn matches(&self, declared: &str) -> bool {
        self.paths.iter().any(|p| paths_overlap(p, declared))
    }

    /// Iterates over the paths in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if no path is present.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DirtyPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for DirtyPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, path) in self.paths.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{path}")?;
        }
        write!(f, "}}")
    }
}

/// Returns true if `a` and `b` are equal or one is a `.`-prefix of the other.
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    match long.strip_prefix(short) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Interned dirty paths relevant to one root resolver.
#[derive(Debug, Clone, Default)]
pub struct PathOrdinals {
    paths: Vec<String>,
    index: HashMap<String, usize>,
}

impl PathOrdinals {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ordinal of `path`, interning it if needed.
    pub fn intern(&mut self, path: &str) -> usize {
        if let Some(&ordinal) = self.index.get(path) {
            return ordinal;
        }
        let ordinal = self.paths.len();
        self.paths.push(path.to_string());
        self.index.insert(path.to_string(), ordinal);
        ordinal
    }

    /// Returns the ordinal of an interned path.
    pub fn ordinal_of(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    /// Interned paths, by ordinal.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Number of interned paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Computes which interned paths are dirty.
    pub fn dirty_bits(&self, dirty: &DirtyPaths) -> PathBitSet {
        let mut bits = PathBitSet::new();
        for (ordinal, path) in self.paths.iter().enumerate() {
            if dirty.matches(path) {
                bits.insert(ordinal);
            }
        }
        bits
    }
}

/// Small growable bitset over path ordinals.
#[derive(Debug, Clone, Default)]
pub struct PathBitSet {
    words: Vec<u64>,
}

impl PathBitSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding one ordinal.
    pub fn single(ordinal: usize) -> Self {
        let mut bits = Self::new();
        bits.insert(ordinal);
        bits
    }

    /// Adds an ordinal.
    pub fn insert(&mut self, ordinal: usize) {
        let word = ordinal / 64;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (ordinal % 64);
    }

    /// Returns true if the ordinal is present.
    pub fn contains(&self, ordinal: usize) -> bool {
        self.words
            .get(ordinal / 64)
            .is_some_and(|w| w & (1u64 << (ordinal % 64)) != 0)
    }

    /// Adds every ordinal of `other`.
    pub fn union_with(&mut self, other: &PathBitSet) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            *mine |= theirs;
        }
    }

    /// Returns true if the sets share an ordinal.
    pub fn intersects(&self, other: &PathBitSet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(a, b)| a & b != 0)
    }

    /// Returns true if no ordinal is present.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of ordinals present.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over the ordinals in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..64usize)
                .filter(move |&bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * 64 + bit)
        })
    }

    /// Returns true if every ordinal of `self` is in `other`.
    pub fn is_subset(&self, other: &PathBitSet) -> bool {
        self.words.iter().enumerate().all(|(i, word)| {
            let theirs = other.words.get(i).copied().unwrap_or(0);
            word & !theirs == 0
        })
    }
}

impl PartialEq for PathBitSet {
    fn eq(&self, other: &Self) -> bool {
        self.is_subset(other) && other.is_subset(self)
    }
}

impl Eq for PathBitSet {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_prefix_on_segment_boundary() {
        assert!(paths_overlap("total", "total"));
        assert!(paths_overlap("address", "address.city"));
        assert!(paths_overlap("address.city", "address"));
        assert!(!paths_overlap("address", "addresses"));
        assert!(!paths_overlap("address.city", "address.zip"));
    }

    #[test]
    fn dirty_paths_match_declared() {
        let dirty: DirtyPaths = ["address"].into_iter().collect();
        assert!(dirty.matches("address.city"));
        assert!(!dirty.matches("name"));
        assert_eq!(dirty.to_string(), "{address}");
    }

    #[test]
    fn ordinals_are_interned_once() {
        let mut ordinals = PathOrdinals::new();
        assert_eq!(ordinals.intern("orders"), 0);
        assert_eq!(ordinals.intern("total"), 1);
        assert_eq!(ordinals.intern("orders"), 0);
        assert_eq!(ordinals.len(), 2);
        assert_eq!(ordinals.ordinal_of("total"), Some(1));
    }

    #[test]
    fn dirty_bits_follow_matching() {
        let mut ordinals = PathOrdinals::new();
        ordinals.intern("orders");
        ordinals.intern("address.city");
        ordinals.intern("name");
        let dirty: DirtyPaths = ["address", "shippingNote"].into_iter().collect();
        let bits = ordinals.dirty_bits(&dirty);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn bitset_beyond_one_word() {
        let mut a = PathBitSet::single(3);
        a.insert(130);
        assert!(a.contains(130));
        assert!(!a.contains(129));
        assert_eq!(a.len(), 2);

        let b = PathBitSet::single(130);
        assert!(a.intersects(&b));
        assert!(!PathBitSet::single(4).intersects(&a));

        let mut c = PathBitSet::new();
        assert!(c.is_empty());
        c.union_with(&a);
        assert_eq!(c, a);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![3, 130]);
    }

    #[test]
    fn equality_ignores_capacity() {
        let mut wide = PathBitSet::single(200);
        let narrow = PathBitSet::single(1);
        assert_ne!(wide, narrow);
        wide = PathBitSet::new();
        wide.union_with(&PathBitSet::single(100));
        let mut grown = PathBitSet::single(1);
        grown.insert(100);
        assert!(wide.is_subset(&grown));
        assert!(!grown.is_subset(&wide));
        assert_eq!(PathBitSet::new(), {
            let mut empty = PathBitSet::new();
            empty.union_with(&PathBitSet::new());
            empty
        });
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn bits(ordinals: &BTreeSet<usize>) -> PathBitSet {
        let mut set = PathBitSet::new();
        for &ordinal in ordinals {
            set.insert(ordinal);
        }
        set
    }

    fn segment_path() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "ab", "b", "lines"]), 1..4)
            .prop_map(|segments| segments.join("."))
    }

    proptest! {
        #[test]
        fn bitset_agrees_with_ordered_set(
            left in prop::collection::btree_set(0usize..300, 0..20),
            right in prop::collection::btree_set(0usize..300, 0..20),
        ) {
            let a = bits(&left);
            let b = bits(&right);

            prop_assert_eq!(a.len(), left.len());
            prop_assert_eq!(a.iter().collect::<Vec<_>>(), left.iter().copied().collect::<Vec<_>>());
            prop_assert_eq!(a.intersects(&b), !left.is_disjoint(&right));
            prop_assert_eq!(a.is_subset(&b), left.is_subset(&right));

            let mut union = a.clone();
            union.union_with(&b);
            prop_assert!(a.is_subset(&union));
            prop_assert!(b.is_subset(&union));
            prop_assert_eq!(union.len(), left.union(&right).count());
        }

        #[test]
        fn overlap_is_symmetric(a in segment_path(), b in segment_path()) {
            prop_assert_eq!(paths_overlap(&a, &b), paths_overlap(&b, &a));
            let extended = format!("{a}.{b}");
            prop_assert!(paths_overlap(&a, &extended));
        }
    }
}
