//! Bounded-concurrency executor for uploads and deletions.
//!
//! Uploads run first; deletions start only once every upload has been
//! attempted. Each object is retried independently and a permanent failure
//! never aborts its siblings.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::application::retry::RetryPolicy;
use crate::domain::entities::{
    DeploymentPlan, LocalAsset, ObjectFailure, ObjectMetadata, SyncOperation,
};
use crate::domain::ports::{
    AssetSource, DeployEvent, DeployEventSink, ObjectStore, ScanError, StoreError,
};
use crate::domain::value_objects::{ErrorKind, Fingerprint, ObjectKey};

/// Default number of concurrent transfers
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Executor tuning
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Maximum concurrent transfers
    pub concurrency: usize,
    /// Re-read metadata after each upload and compare fingerprints
    pub verify_uploads: bool,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            verify_uploads: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// What the executor did
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub uploaded: Vec<ObjectKey>,
    pub deleted: Vec<ObjectKey>,
    pub failures: Vec<ObjectFailure>,
    pub bytes_uploaded: u64,
    /// Operations never started because the run was cancelled
    pub not_attempted: usize,
    pub cancelled: bool,
}

impl SyncReport {
    /// Keys whose remote state actually changed.
    pub fn succeeded(&self) -> impl Iterator<Item = &ObjectKey> {
        self.uploaded.iter().chain(self.deleted.iter())
    }
}

enum Job {
    Upload(LocalAsset),
    Delete(ObjectKey),
}

impl Job {
    fn key(&self) -> &ObjectKey {
        match self {
            Job::Upload(asset) => asset.key(),
            Job::Delete(key) => key,
        }
    }

    fn operation(&self) -> SyncOperation {
        match self {
            Job::Upload(_) => SyncOperation::Upload,
            Job::Delete(_) => SyncOperation::Delete,
        }
    }
}

struct JobOutcome {
    key: ObjectKey,
    operation: SyncOperation,
    result: Result<Transferred, ObjectFailure>,
}

struct Transferred {
    bytes: u64,
    attempts: u32,
}

/// Applies plans against an object store
#[derive(Clone)]
pub struct SyncExecutor {
    store: Arc<dyn ObjectStore>,
    source: Arc<dyn AssetSource>,
    options: SyncOptions,
}

impl SyncExecutor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        source: Arc<dyn AssetSource>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            source,
            options,
        }
    }

    /// Apply the plan's uploads, then its deletions.
    ///
    /// `assets` must contain every key in `plan.to_upload`; keys missing from
    /// it are recorded as failures.
    pub async fn execute(
        &self,
        namespace: &str,
        plan: &DeploymentPlan,
        assets: &[LocalAsset],
        events: &Arc<dyn DeployEventSink>,
        cancel: &CancellationToken,
    ) -> SyncReport {
        let namespace: Arc<str> = Arc::from(namespace);
        let mut report = SyncReport::default();

        let by_key: HashMap<&ObjectKey, &LocalAsset> =
            assets.iter().map(|a| (a.key(), a)).collect();
        let mut uploads = Vec::with_capacity(plan.to_upload.len());
        for key in &plan.to_upload {
            match by_key.get(key) {
                Some(asset) => uploads.push(Job::Upload((*asset).clone())),
                None => report.failures.push(ObjectFailure {
                    key: key.clone(),
                    operation: SyncOperation::Upload,
                    kind: ErrorKind::Io,
                    message: "asset missing from scan".to_string(),
                    attempts: 0,
                }),
            }
        }
        let deletes: Vec<Job> = plan.to_delete.iter().cloned().map(Job::Delete).collect();

        tracing::info!(
            uploads = uploads.len(),
            deletes = deletes.len(),
            concurrency = self.options.concurrency,
            "sync started"
        );

        self.run_batch(&namespace, uploads, events, cancel, &mut report)
            .await;

        if cancel.is_cancelled() {
            report.not_attempted += deletes.len();
        } else {
            self.run_batch(&namespace, deletes, events, cancel, &mut report)
                .await;
        }

        report.cancelled = cancel.is_cancelled();
        report.uploaded.sort();
        report.deleted.sort();
        report.failures.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::info!(
            uploaded = report.uploaded.len(),
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            not_attempted = report.not_attempted,
            cancelled = report.cancelled,
            "sync finished"
        );
        report
    }

    async fn run_batch(
        &self,
        namespace: &Arc<str>,
        jobs: Vec<Job>,
        events: &Arc<dyn DeployEventSink>,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut scheduled: BTreeSet<(ObjectKey, SyncOperation)> = BTreeSet::new();
        let total = jobs.len();

        for (index, job) in jobs.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                report.not_attempted += total - index;
                tracing::warn!(
                    skipped = total - index,
                    "cancellation requested, no new transfers will start"
                );
                break;
            };

            scheduled.insert((job.key().clone(), job.operation()));
            let this = self.clone();
            let namespace = Arc::clone(namespace);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let outcome = this.run_job(&namespace, job, &cancel).await;
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    scheduled.remove(&(outcome.key.clone(), outcome.operation));
                    self.record(outcome, events, report);
                }
                Err(err) => tracing::error!(error = %err, "transfer task aborted"),
            }
        }

        // Tasks that panicked never reported back.
        for (key, operation) in scheduled {
            let failure = ObjectFailure {
                key,
                operation,
                kind: ErrorKind::Io,
                message: "transfer task aborted".to_string(),
                attempts: 0,
            };
            report.failures.push(failure);
        }
    }

    fn record(
        &self,
        outcome: JobOutcome,
        events: &Arc<dyn DeployEventSink>,
        report: &mut SyncReport,
    ) {
        match outcome.result {
            Ok(done) => match outcome.operation {
                SyncOperation::Upload => {
                    tracing::debug!(
                        key = %outcome.key,
                        bytes = done.bytes,
                        attempts = done.attempts,
                        "uploaded"
                    );
                    report.bytes_uploaded += done.bytes;
                    events.on_event(DeployEvent::ObjectUploaded {
                        key: outcome.key.clone(),
                        bytes: done.bytes,
                        attempts: done.attempts,
                    });
                    report.uploaded.push(outcome.key);
                }
                SyncOperation::Delete => {
                    tracing::debug!(key = %outcome.key, attempts = done.attempts, "deleted");
                    events.on_event(DeployEvent::ObjectDeleted {
                        key: outcome.key.clone(),
                        attempts: done.attempts,
                    });
                    report.deleted.push(outcome.key);
                }
            },
            Err(failure) => {
                tracing::error!(
                    key = %failure.key,
                    operation = failure.operation.as_str(),
                    kind = %failure.kind,
                    attempts = failure.attempts,
                    error = %failure.message,
                    "object failed"
                );
                events.on_event(DeployEvent::ObjectFailed {
                    key: failure.key.clone(),
                    operation: failure.operation,
                    kind: failure.kind,
                    error: failure.message.clone(),
                    attempts: failure.attempts,
                });
                report.failures.push(failure);
            }
        }
    }

    async fn run_job(&self, namespace: &str, job: Job, cancel: &CancellationToken) -> JobOutcome {
        let key = job.key().clone();
        let operation = job.operation();
        let result = match job {
            Job::Upload(asset) => self.upload(namespace, &asset, cancel).await,
            Job::Delete(key) => self.delete(namespace, &key, cancel).await,
        };
        JobOutcome {
            key,
            operation,
            result,
        }
    }

    async fn upload(
        &self,
        namespace: &str,
        asset: &LocalAsset,
        cancel: &CancellationToken,
    ) -> Result<Transferred, ObjectFailure> {
        let failure = |kind: ErrorKind, message: String, attempts: u32| ObjectFailure {
            key: asset.key().clone(),
            operation: SyncOperation::Upload,
            kind,
            message,
            attempts,
        };

        let content = self
            .source
            .read(asset)
            .await
            .map_err(|e| failure(e.kind(), e.to_string(), 0))?;

        // The plan was computed from the scan; never publish different bytes
        // under the scanned fingerprint.
        if Fingerprint::from_bytes(&content) != *asset.fingerprint() {
            let err = ScanError::Changed(asset.path().to_path_buf());
            return Err(failure(err.kind(), err.to_string(), 0));
        }

        let metadata =
            ObjectMetadata::new(asset.fingerprint().clone(), asset.mime_type().clone());
        let key = asset.key();
        let verify = self.options.verify_uploads;

        let attempted = self
            .options
            .retry
            .run("upload", key.as_str(), cancel, || {
                let content = content.clone();
                let metadata = &metadata;
                async move {
                    self.store.put(namespace, key, content, metadata).await?;
                    if verify {
                        self.verify(namespace, key, &metadata.fingerprint).await?;
                    }
                    Ok::<(), StoreError>(())
                }
            })
            .await;

        match attempted.outcome {
            Ok(()) => Ok(Transferred {
                bytes: content.len() as u64,
                attempts: attempted.attempts,
            }),
            Err(e) => Err(failure(e.kind(), e.to_string(), attempted.attempts)),
        }
    }

    async fn verify(
        &self,
        namespace: &str,
        key: &ObjectKey,
        expected: &Fingerprint,
    ) -> Result<(), StoreError> {
        let found = match self.store.head(namespace, key).await? {
            Some(object) if object.fingerprint.matches(expected) => return Ok(()),
            Some(object) => object.fingerprint.to_string(),
            None => "<missing>".to_string(),
        };
        Err(StoreError::VerifyMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            found,
        })
    }

    async fn delete(
        &self,
        namespace: &str,
        key: &ObjectKey,
        cancel: &CancellationToken,
    ) -> Result<Transferred, ObjectFailure> {
        let attempted = self
            .options
            .retry
            .run("delete", key.as_str(), cancel, || {
                self.store.delete(namespace, key)
            })
            .await;

        match attempted.outcome {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(Transferred {
                bytes: 0,
                attempts: attempted.attempts,
            }),
            Err(e) => Err(ObjectFailure {
                key: key.clone(),
                operation: SyncOperation::Delete,
                kind: e.kind(),
                message: e.to_string(),
                attempts: attempted.attempts,
            }),
        }
    }
}
