//! Deployment Plan Entity
//!
//! Output of the diff planner. Produced once, consumed once by the sync
//! executor.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::value_objects::{InvalidationPaths, ObjectKey};

/// Disjoint key sets describing what a sync must do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    /// Local keys absent remotely or with a differing fingerprint
    pub to_upload: BTreeSet<ObjectKey>,
    /// Remote-only keys, populated only when pruning is enabled
    pub to_delete: BTreeSet<ObjectKey>,
    /// Keys present on both sides with matching fingerprints
    pub unchanged: BTreeSet<ObjectKey>,
    /// Remote-only keys left in place because pruning is disabled
    pub retained: BTreeSet<ObjectKey>,
    /// Paths to invalidate if every change succeeds
    pub invalidation: InvalidationPaths,
    pub prune: bool,
}

impl DeploymentPlan {
    /// Keys whose remote state the sync will change.
    pub fn changed_keys(&self) -> impl Iterator<Item = &ObjectKey> {
        self.to_upload.iter().chain(self.to_delete.iter())
    }

    pub fn change_count(&self) -> usize {
        self.to_upload.len() + self.to_delete.len()
    }

    /// True when the sync has nothing to do.
    pub fn is_noop(&self) -> bool {
        self.change_count() == 0
    }

    /// Keys the plan accounts for (`local ∪ remote`).
    pub fn total_keys(&self) -> usize {
        self.to_upload.len() + self.to_delete.len() + self.unchanged.len() + self.retained.len()
    }

    /// Whether the key appears in more than one set.
    pub fn is_ambiguous(&self, key: &ObjectKey) -> bool {
        [
            &self.to_upload,
            &self.to_delete,
            &self.unchanged,
            &self.retained,
        ]
        .iter()
        .filter(|set| set.contains(key))
        .count()
            > 1
    }
}
