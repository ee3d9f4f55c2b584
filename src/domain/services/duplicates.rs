//! Duplicate content detection
//!
//! Diagnostics only: identical content at different paths is still uploaded
//! once per key.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::entities::LocalAsset;
use crate::domain::value_objects::{Fingerprint, ObjectKey};

/// Keys that share one fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub keys: Vec<ObjectKey>,
}

impl DuplicateGroup {
    /// Bytes that would be saved by storing the content once.
    pub fn redundant_bytes(&self) -> u64 {
        self.size * (self.keys.len() as u64 - 1)
    }
}

/// Group assets by fingerprint, keeping only groups with 2+ members.
///
/// Groups are ordered by fingerprint; keys within a group keep scan order.
pub fn find_duplicates(assets: &[LocalAsset]) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<&Fingerprint, DuplicateGroup> = BTreeMap::new();

    for asset in assets {
        groups
            .entry(asset.fingerprint())
            .or_insert_with(|| DuplicateGroup {
                fingerprint: asset.fingerprint().clone(),
                size: asset.size(),
                keys: Vec::new(),
            })
            .keys
            .push(asset.key().clone());
    }

    groups
        .into_values()
        .filter(|group| group.keys.len() > 1)
        .collect()
}
