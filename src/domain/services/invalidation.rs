//! Invalidation path derivation
//!
//! Turns a set of changed keys into the CDN paths that must be purged.

use std::collections::BTreeSet;

use crate::domain::value_objects::{InvalidationPaths, ObjectKey};

/// Default fraction of objects above which a wildcard is used
pub const DEFAULT_WILDCARD_THRESHOLD: f64 = 0.5;

/// Default document served for the distribution root
pub const DEFAULT_ROOT_DOCUMENT: &str = "index.html";

/// Rules for collapsing and completing invalidation paths
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationPolicy {
    /// Always invalidated alongside explicit paths
    pub root_document: ObjectKey,
    /// Fraction of considered objects in `[0, 1]`
    pub wildcard_threshold: f64,
}

impl Default for InvalidationPolicy {
    fn default() -> Self {
        Self {
            root_document: ObjectKey::parse(DEFAULT_ROOT_DOCUMENT)
                .unwrap_or_else(|_| unreachable!("default root document is a valid key")),
            wildcard_threshold: DEFAULT_WILDCARD_THRESHOLD,
        }
    }
}

impl InvalidationPolicy {
    pub fn new(root_document: ObjectKey, wildcard_threshold: f64) -> Self {
        Self {
            root_document,
            wildcard_threshold: wildcard_threshold.clamp(0.0, 1.0),
        }
    }

    /// Derive paths for `changed` keys out of `considered` total objects.
    ///
    /// No changes yields [`InvalidationPaths::Nothing`]. A change count that
    /// strictly exceeds `threshold × considered` collapses to the wildcard.
    pub fn derive<'a, I>(&self, changed: I, considered: usize) -> InvalidationPaths
    where
        I: IntoIterator<Item = &'a ObjectKey>,
    {
        let mut paths: BTreeSet<String> = changed.into_iter().map(ObjectKey::cdn_path).collect();
        if paths.is_empty() {
            return InvalidationPaths::Nothing;
        }

        let limit = self.wildcard_threshold * considered as f64;
        if paths.len() as f64 > limit {
            return InvalidationPaths::Wildcard;
        }

        paths.insert(self.root_document.cdn_path());
        InvalidationPaths::Explicit(paths.into_iter().collect())
    }
}
