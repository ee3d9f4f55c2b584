//! Deploy Options
//!
//! Configuration types for deploy operations. Built from the layered config
//! by the CLI and passed explicitly into the use case.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::sync::SyncOptions;
use crate::domain::services::InvalidationPolicy;
use crate::domain::value_objects::ObjectKey;

/// Options for the deploy use case
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Build output directory
    pub source: PathBuf,
    /// Destination namespace (bucket, bucket/prefix or directory name)
    pub namespace: String,
    /// CDN distribution to invalidate
    pub distribution: String,
    /// Delete remote objects with no local counterpart
    pub prune: bool,
    /// Gitignore-style globs excluded from the scan
    pub exclude: Vec<String>,
    /// Scan and diff only
    pub dry_run: bool,
    pub invalidation: InvalidationPolicy,
    pub sync: SyncOptions,
    /// Total budget for the run; exceeding it cancels the run
    pub run_deadline: Option<Duration>,
}

impl DeployOptions {
    pub fn new(
        source: impl Into<PathBuf>,
        namespace: impl Into<String>,
        distribution: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            namespace: namespace.into(),
            distribution: distribution.into(),
            prune: false,
            exclude: Vec::new(),
            dry_run: false,
            invalidation: InvalidationPolicy::default(),
            sync: SyncOptions::default(),
            run_deadline: None,
        }
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_sync(mut self, sync: SyncOptions) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.sync.concurrency = concurrency.max(1);
        self
    }

    pub fn with_invalidation(mut self, policy: InvalidationPolicy) -> Self {
        self.invalidation = policy;
        self
    }

    pub fn with_root_document(mut self, root: ObjectKey) -> Self {
        self.invalidation.root_document = root;
        self
    }

    pub fn with_run_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.run_deadline = deadline;
        self
    }
}
