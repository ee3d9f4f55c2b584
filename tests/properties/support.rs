//! Generators shared by the property families.

use std::collections::BTreeMap;

use proptest::prelude::*;

use edgepush::{Fingerprint, LocalAsset, ObjectKey, RemoteObject};

/// Short path segment; a small alphabet makes local and remote keys collide.
pub fn segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-d]{1,3}(\\.txt)?").unwrap()
}

pub fn key() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment(), 1..=3).prop_map(|parts| parts.join("/"))
}

/// Inventory of key -> content version.
pub fn inventory() -> impl Strategy<Value = BTreeMap<String, u8>> {
    proptest::collection::btree_map(key(), 0u8..3, 0..24)
}

pub fn local_assets(inventory: &BTreeMap<String, u8>) -> Vec<LocalAsset> {
    inventory
        .iter()
        .map(|(k, version)| {
            let content = format!("{}:{}", k, version);
            LocalAsset::from_content(ObjectKey::parse(k).unwrap(), k.as_str(), content.as_bytes())
        })
        .collect()
}

pub fn remote_objects(inventory: &BTreeMap<String, u8>) -> Vec<RemoteObject> {
    inventory
        .iter()
        .map(|(k, version)| {
            let content = format!("{}:{}", k, version);
            RemoteObject::new(
                ObjectKey::parse(k).unwrap(),
                Fingerprint::from_bytes(content.as_bytes()),
            )
        })
        .collect()
}
