//! PROPERTY: without pruning, remote-only objects are never deleted.

use std::collections::BTreeSet;

use proptest::prelude::*;

use edgepush::{DiffPlanner, InvalidationPolicy, ObjectKey};

use crate::support::{inventory, local_assets, remote_objects};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn property_prune_off_retains_remote_only(
        local in inventory(),
        remote in inventory(),
    ) {
        let planner = DiffPlanner::new(false, InvalidationPolicy::default());
        let plan = planner.plan(&local_assets(&local), &remote_objects(&remote));

        let remote_only: BTreeSet<ObjectKey> = remote
            .keys()
            .filter(|k| !local.contains_key(*k))
            .map(|k| ObjectKey::parse(k).unwrap())
            .collect();

        prop_assert!(plan.to_delete.is_empty());
        prop_assert_eq!(&plan.retained, &remote_only);
        for key in &plan.retained {
            let path = key.cdn_path();
            prop_assert!(!plan.invalidation.to_paths().contains(&path));
        }
    }
}
