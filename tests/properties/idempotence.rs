//! PROPERTY: applying a plan and planning again yields nothing to do.

use std::collections::BTreeMap;

use proptest::prelude::*;

use edgepush::{DiffPlanner, InvalidationPolicy};

use crate::support::{inventory, local_assets, remote_objects};

/// Remote state after every planned operation succeeded.
fn apply(
    local: &BTreeMap<String, u8>,
    remote: &BTreeMap<String, u8>,
    prune: bool,
) -> BTreeMap<String, u8> {
    let mut next = if prune { BTreeMap::new() } else { remote.clone() };
    next.extend(local.iter().map(|(k, v)| (k.clone(), *v)));
    next
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn property_second_plan_is_noop(
        local in inventory(),
        remote in inventory(),
        prune in any::<bool>(),
    ) {
        let planner = DiffPlanner::new(prune, InvalidationPolicy::default());
        let assets = local_assets(&local);

        let first = planner.plan(&assets, &remote_objects(&remote));
        let after = apply(&local, &remote, prune);
        let second = planner.plan(&assets, &remote_objects(&after));

        prop_assert!(second.is_noop(), "second plan still has {} change(s)", second.change_count());
        prop_assert!(second.invalidation.is_empty());
        prop_assert_eq!(second.unchanged.len(), local.len());
        prop_assert_eq!(first.to_upload.len() + first.unchanged.len(), local.len());
    }
}
