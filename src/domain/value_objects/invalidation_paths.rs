//! Invalidation path set

use serde::{Deserialize, Serialize};

/// The single path that covers the whole distribution
pub const WILDCARD_PATH: &str = "/*";

/// Paths to invalidate after a sync.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "paths", rename_all = "snake_case")]
pub enum InvalidationPaths {
    /// Nothing changed; no CDN request is made
    #[default]
    Nothing,
    /// Change set exceeded the threshold; invalidate everything
    Wildcard,
    /// Explicit paths, sorted, root document included
    Explicit(Vec<String>),
}

impl InvalidationPaths {
    pub fn is_empty(&self) -> bool {
        match self {
            InvalidationPaths::Nothing => true,
            InvalidationPaths::Wildcard => false,
            InvalidationPaths::Explicit(paths) => paths.is_empty(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, InvalidationPaths::Wildcard)
    }

    /// Number of paths that will be sent to the CDN.
    pub fn len(&self) -> usize {
        match self {
            InvalidationPaths::Nothing => 0,
            InvalidationPaths::Wildcard => 1,
            InvalidationPaths::Explicit(paths) => paths.len(),
        }
    }

    /// Paths in the form the CDN expects.
    pub fn to_paths(&self) -> Vec<String> {
        match self {
            InvalidationPaths::Nothing => Vec::new(),
            InvalidationPaths::Wildcard => vec![WILDCARD_PATH.to_string()],
            InvalidationPaths::Explicit(paths) => paths.clone(),
        }
    }
}
