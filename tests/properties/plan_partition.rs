//! PROPERTY: the plan accounts for every key exactly once.

use std::collections::BTreeSet;

use proptest::prelude::*;

use edgepush::{DiffPlanner, InvalidationPolicy, ObjectKey};

use crate::support::{inventory, local_assets, remote_objects};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// With pruning, upload/delete/unchanged partition `local ∪ remote`.
    #[test]
    fn property_plan_partitions_all_keys(
        local in inventory(),
        remote in inventory(),
        prune in any::<bool>(),
    ) {
        let planner = DiffPlanner::new(prune, InvalidationPolicy::default());
        let plan = planner.plan(&local_assets(&local), &remote_objects(&remote));

        let all: BTreeSet<ObjectKey> = local
            .keys()
            .chain(remote.keys())
            .map(|k| ObjectKey::parse(k).unwrap())
            .collect();

        let mut seen = BTreeSet::new();
        for set in [&plan.to_upload, &plan.to_delete, &plan.unchanged, &plan.retained] {
            for key in set {
                prop_assert!(seen.insert(key.clone()), "{} appears twice", key);
            }
        }
        prop_assert_eq!(&seen, &all);
        prop_assert_eq!(plan.total_keys(), all.len());

        if prune {
            prop_assert!(plan.retained.is_empty());
        } else {
            prop_assert!(plan.to_delete.is_empty());
        }
    }

    /// Uploads are exactly the local keys whose content differs remotely.
    #[test]
    fn property_uploads_are_new_or_changed(
        local in inventory(),
        remote in inventory(),
    ) {
        let planner = DiffPlanner::new(true, InvalidationPolicy::default());
        let plan = planner.plan(&local_assets(&local), &remote_objects(&remote));

        for (k, version) in &local {
            let key = ObjectKey::parse(k).unwrap();
            let same = remote.get(k) == Some(version);
            prop_assert_eq!(plan.to_upload.contains(&key), !same);
            prop_assert_eq!(plan.unchanged.contains(&key), same);
        }
    }

    /// Nothing changed means nothing to invalidate.
    #[test]
    fn property_invalidation_empty_iff_noop(
        local in inventory(),
        remote in inventory(),
    ) {
        let planner = DiffPlanner::new(true, InvalidationPolicy::default());
        let plan = planner.plan(&local_assets(&local), &remote_objects(&remote));
        prop_assert_eq!(plan.invalidation.is_empty(), plan.is_noop());
    }
}
