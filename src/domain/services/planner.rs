//! Diff planning service
//!
//! Pure domain logic that reconciles the local asset set with the remote
//! inventory. No I/O: both inventories are supplied by the caller.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::{DeploymentPlan, LocalAsset, RemoteObject};
use crate::domain::value_objects::{Fingerprint, InvalidationPaths, ObjectKey};

use super::invalidation::InvalidationPolicy;

/// Pure planning service
#[derive(Debug, Clone, Default)]
pub struct DiffPlanner {
    prune: bool,
    policy: InvalidationPolicy,
}

impl DiffPlanner {
    pub fn new(prune: bool, policy: InvalidationPolicy) -> Self {
        Self { prune, policy }
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn policy(&self) -> &InvalidationPolicy {
        &self.policy
    }

    /// Compare the two inventories.
    ///
    /// - same key, matching fingerprint: `unchanged`
    /// - same key, differing (or unknown) fingerprint: `to_upload`
    /// - local only: `to_upload`
    /// - remote only: `to_delete` when pruning, otherwise `retained`
    pub fn plan(&self, local: &[LocalAsset], remote: &[RemoteObject]) -> DeploymentPlan {
        let local_index: BTreeMap<&ObjectKey, &Fingerprint> =
            local.iter().map(|a| (a.key(), a.fingerprint())).collect();
        let remote_index: BTreeMap<&ObjectKey, &Fingerprint> =
            remote.iter().map(|o| (&o.key, &o.fingerprint)).collect();

        let mut plan = DeploymentPlan {
            prune: self.prune,
            ..DeploymentPlan::default()
        };

        for (key, local_fp) in &local_index {
            match remote_index.get(key) {
                Some(remote_fp) if local_fp.matches(remote_fp) => {
                    plan.unchanged.insert((*key).clone());
                }
                _ => {
                    plan.to_upload.insert((*key).clone());
                }
            }
        }

        for key in remote_index.keys() {
            if local_index.contains_key(key) {
                continue;
            }
            if self.prune {
                plan.to_delete.insert((*key).clone());
            } else {
                plan.retained.insert((*key).clone());
            }
        }

        let considered = plan.to_upload.len() + plan.to_delete.len() + plan.unchanged.len();
        plan.invalidation = self.policy.derive(plan.changed_keys(), considered);
        plan
    }

    /// Invalidation paths restricted to the keys that actually changed.
    pub fn invalidation_for<'a, I>(&self, succeeded: I, plan: &DeploymentPlan) -> InvalidationPaths
    where
        I: IntoIterator<Item = &'a ObjectKey>,
    {
        let succeeded: BTreeSet<&ObjectKey> = succeeded.into_iter().collect();
        let considered = plan.to_upload.len() + plan.to_delete.len() + plan.unchanged.len();
        self.policy.derive(succeeded, considered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(key: &str, content: &str) -> LocalAsset {
        LocalAsset::from_content(
            ObjectKey::parse(key).unwrap(),
            format!("/site/{}", key),
            content.as_bytes(),
        )
    }

    fn remote(key: &str, content: &str) -> RemoteObject {
        RemoteObject::new(
            ObjectKey::parse(key).unwrap(),
            Fingerprint::from_bytes(content.as_bytes()),
        )
    }

    fn set(names: &[&str]) -> BTreeSet<ObjectKey> {
        names.iter().map(|n| ObjectKey::parse(n).unwrap()).collect()
    }

    #[test]
    fn upload_delete_unchanged_scenario() {
        let planner = DiffPlanner::default().with_prune(true);
        let plan = planner.plan(
            &[local("a.txt", "H1"), local("b.txt", "H2")],
            &[remote("a.txt", "H1"), remote("c.txt", "H3")],
        );

        assert_eq!(plan.to_upload, set(&["b.txt"]));
        assert_eq!(plan.to_delete, set(&["c.txt"]));
        assert_eq!(plan.unchanged, set(&["a.txt"]));
        // 2 changes out of 3 objects exceeds the default 50%
        assert_eq!(plan.invalidation, InvalidationPaths::Wildcard);
    }

    #[test]
    fn scenario_below_threshold_lists_paths_and_root() {
        let policy = InvalidationPolicy::new(ObjectKey::parse("index.html").unwrap(), 0.8);
        let planner = DiffPlanner::new(true, policy);
        let plan = planner.plan(
            &[local("a.txt", "H1"), local("b.txt", "H2")],
            &[remote("a.txt", "H1"), remote("c.txt", "H3")],
        );

        assert_eq!(
            plan.invalidation,
            InvalidationPaths::Explicit(vec![
                "/b.txt".into(),
                "/c.txt".into(),
                "/index.html".into()
            ])
        );
    }

    #[test]
    fn differing_fingerprint_overwrites() {
        let plan = DiffPlanner::default().plan(&[local("a.txt", "new")], &[remote("a.txt", "old")]);
        assert_eq!(plan.to_upload, set(&["a.txt"]));
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn foreign_object_is_always_reuploaded() {
        let foreign = RemoteObject::new(ObjectKey::parse("a.txt").unwrap(), Fingerprint::empty());
        let plan = DiffPlanner::default().plan(&[local("a.txt", "x")], &[foreign]);
        assert_eq!(plan.to_upload, set(&["a.txt"]));
    }

    #[test]
    fn prune_off_retains_remote_only_keys() {
        let plan = DiffPlanner::default().plan(&[local("a.txt", "1")], &[remote("old.txt", "2")]);
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.retained, set(&["old.txt"]));
        assert_eq!(plan.total_keys(), 2);
    }

    #[test]
    fn identical_inventories_yield_noop() {
        let plan = DiffPlanner::default().with_prune(true).plan(
            &[local("a.txt", "1"), local("b.txt", "2")],
            &[remote("a.txt", "1"), remote("b.txt", "2")],
        );
        assert!(plan.is_noop());
        assert_eq!(plan.invalidation, InvalidationPaths::Nothing);
        assert_eq!(plan.unchanged.len(), 2);
    }

    #[test]
    fn empty_source_with_prune_deletes_everything() {
        let plan = DiffPlanner::default()
            .with_prune(true)
            .plan(&[], &[remote("a.txt", "1"), remote("b.txt", "2")]);
        assert_eq!(plan.to_delete, set(&["a.txt", "b.txt"]));
        assert!(plan.invalidation.is_wildcard());
    }

    #[test]
    fn invalidation_for_successes_only() {
        let policy = InvalidationPolicy::new(ObjectKey::parse("index.html").unwrap(), 1.0);
        let planner = DiffPlanner::new(false, policy);
        let plan = planner.plan(&[local("a.txt", "1"), local("b.txt", "2")], &[]);

        let ok = ObjectKey::parse("a.txt").unwrap();
        assert_eq!(
            planner.invalidation_for([&ok], &plan),
            InvalidationPaths::Explicit(vec!["/a.txt".into(), "/index.html".into()])
        );
    }
}
