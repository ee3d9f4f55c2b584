//! Deploy Use Case
//!
//! Orchestrates the deployment flow:
//! 1. Scan the source and list the remote namespace (in parallel)
//! 2. Diff the two inventories into a plan
//! 3. Sync: uploads, then deletions
//! 4. Invalidate CDN paths for whatever changed
//!
//! Partial sync failures do not stop the run: caches are still invalidated
//! for the objects that did change. Only scan and inventory failures are
//! fatal, and they happen before any remote mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::invalidation::InvalidationCoordinator;
use crate::application::inventory::InventoryReader;
use crate::application::retry::RetryPolicy;
use crate::application::sync::SyncExecutor;
use crate::domain::entities::{
    DeploymentPlan, DeploymentResult, InvalidationReceipt, LocalAsset, RemoteObject, RunFailure,
};
use crate::domain::ports::{
    AssetSource, CdnControlPlane, DeployEvent, DeployEventSink, ObjectStore, ScanRequest,
};
use crate::domain::services::{find_duplicates, DiffPlanner, DuplicateGroup};
use crate::domain::value_objects::{DeployPhase, DeployStatus, ErrorKind, InvalidationPaths};
use crate::error::DeployError;

use super::options::DeployOptions;

/// Call timeout for the single submission made after a cancel
const CANCELLED_SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Scan and diff output, without any remote mutation
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub assets: Vec<LocalAsset>,
    pub remote: Vec<RemoteObject>,
    pub plan: DeploymentPlan,
    pub duplicates: Vec<DuplicateGroup>,
}

/// Deploy use case - orchestrates the deployment flow
///
/// Parameterized by its ports so tests can substitute in-memory backends.
pub struct DeployUseCase {
    source: Arc<dyn AssetSource>,
    store: Arc<dyn ObjectStore>,
    cdn: Option<Arc<dyn CdnControlPlane>>,
    poll_interval: Option<Duration>,
}

impl DeployUseCase {
    pub fn new(source: Arc<dyn AssetSource>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            source,
            store,
            cdn: None,
            poll_interval: None,
        }
    }

    /// Attach a CDN; without one, invalidation is skipped.
    pub fn with_cdn(mut self, cdn: Arc<dyn CdnControlPlane>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Coordinator for the attached CDN, used for `--wait` and `status`.
    pub fn coordinator(&self, options: &DeployOptions) -> Option<InvalidationCoordinator> {
        let cdn = self.cdn.clone()?;
        let coordinator = InvalidationCoordinator::new(cdn, options.sync.retry.clone());
        Some(match self.poll_interval {
            Some(interval) => coordinator.with_poll_interval(interval),
            None => coordinator,
        })
    }

    /// Scan and diff only.
    pub async fn plan(
        &self,
        options: &DeployOptions,
        cancel: &CancellationToken,
    ) -> Result<PlanOutcome, DeployError> {
        let (assets, remote) = self.scan(options, cancel).await?;
        let planner = DiffPlanner::new(options.prune, options.invalidation.clone());
        let plan = planner.plan(&assets, &remote);
        let duplicates = find_duplicates(&assets);
        Ok(PlanOutcome {
            assets,
            remote,
            plan,
            duplicates,
        })
    }

    /// Run a full deployment.
    ///
    /// Always returns a result; fatal errors are reported in
    /// [`DeploymentResult::failure`].
    pub async fn execute(
        &self,
        options: &DeployOptions,
        events: Arc<dyn DeployEventSink>,
        cancel: &CancellationToken,
    ) -> DeploymentResult {
        let started = Instant::now();
        let run_cancel = cancel.child_token();
        let deadline = options
            .run_deadline
            .map(|limit| DeadlineGuard::arm(limit, run_cancel.clone()));

        let mut run = Run::start(options.dry_run, events);
        self.drive(options, &mut run, &run_cancel).await;

        if let Some(guard) = &deadline {
            if guard.fired() && run.result.status == DeployStatus::Cancelled {
                run.warn(format!("run deadline of {:?} exceeded", guard.limit));
            }
        }

        run.result.elapsed = started.elapsed();
        run.result
    }

    async fn scan(
        &self,
        options: &DeployOptions,
        cancel: &CancellationToken,
    ) -> Result<(Vec<LocalAsset>, Vec<RemoteObject>), DeployError> {
        let request = ScanRequest::new(&options.source)
            .with_exclude(options.exclude.clone())
            .with_concurrency(options.sync.concurrency);
        let inventory = InventoryReader::new(self.store.clone(), options.sync.retry.clone());

        let (scanned, listed) = tokio::join!(
            self.source.scan(&request),
            inventory.read_all(&options.namespace, cancel)
        );

        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        let assets = scanned?;
        let remote = listed.map_err(DeployError::Inventory)?;
        Ok((assets, remote))
    }

    async fn drive(&self, options: &DeployOptions, run: &mut Run, cancel: &CancellationToken) {
        let (assets, remote) = match self.scan(options, cancel).await {
            Ok(inventories) => inventories,
            Err(DeployError::Cancelled) => return run.cancel(),
            Err(err) => return run.fail(err.kind(), err.to_string()),
        };

        let duplicates = find_duplicates(&assets);
        for group in &duplicates {
            tracing::info!(
                fingerprint = group.fingerprint.short(),
                keys = ?group.keys,
                "identical content at several paths"
            );
        }
        run.emit(DeployEvent::Scanned {
            asset_count: assets.len(),
            total_bytes: assets.iter().map(LocalAsset::size).sum(),
            duplicate_groups: duplicates.len(),
        });

        run.enter(DeployPhase::Diffing);
        let planner = DiffPlanner::new(options.prune, options.invalidation.clone());
        let plan = planner.plan(&assets, &remote);
        run.emit(DeployEvent::Planned {
            to_upload: plan.to_upload.len(),
            to_delete: plan.to_delete.len(),
            unchanged: plan.unchanged.len(),
            retained: plan.retained.len(),
            remote_count: remote.len(),
        });
        run.result.skipped = plan.unchanged.len();
        run.result.retained = plan.retained.len();

        if options.dry_run {
            run.result.plan = Some(plan);
            return run.finish();
        }
        if plan.is_noop() {
            tracing::info!("remote namespace already up to date");
            return run.finish();
        }

        run.enter(DeployPhase::Syncing);
        let executor = SyncExecutor::new(
            self.store.clone(),
            self.source.clone(),
            options.sync.clone(),
        );
        let report = executor
            .execute(&options.namespace, &plan, &assets, &run.events, cancel)
            .await;
        run.result.uploaded = report.uploaded.clone();
        run.result.deleted = report.deleted.clone();
        run.result.errors = report.failures.clone();

        let paths = if report.failures.is_empty() && !report.cancelled {
            plan.invalidation.clone()
        } else {
            planner.invalidation_for(report.succeeded(), &plan)
        };

        if report.cancelled {
            self.invalidate_after_cancel(options, &paths, run).await;
            return run.cancel();
        }

        run.enter(DeployPhase::Invalidating);
        if let Some(coordinator) = self.coordinator(options) {
            submit_invalidation(&coordinator, options, &paths, run, cancel).await;
        } else if !paths.is_empty() {
            tracing::info!(paths = paths.len(), "no CDN configured, skipping invalidation");
        }
        run.finish();
    }

    /// Objects that changed before the cancel still get one submission,
    /// unretried and outside the cancelled token.
    async fn invalidate_after_cancel(
        &self,
        options: &DeployOptions,
        paths: &InvalidationPaths,
        run: &mut Run,
    ) {
        if paths.is_empty() {
            return;
        }
        let Some(cdn) = self.cdn.clone() else {
            return;
        };

        tracing::info!(paths = paths.len(), "invalidating objects changed before cancellation");
        run.enter(DeployPhase::Invalidating);
        let coordinator = InvalidationCoordinator::new(
            cdn,
            RetryPolicy::no_retry().with_call_timeout(CANCELLED_SUBMIT_TIMEOUT),
        );
        submit_invalidation(&coordinator, options, paths, run, &CancellationToken::new()).await;
    }
}

async fn submit_invalidation(
    coordinator: &InvalidationCoordinator,
    options: &DeployOptions,
    paths: &InvalidationPaths,
    run: &mut Run,
    cancel: &CancellationToken,
) {
    if paths.is_empty() {
        tracing::debug!("nothing to invalidate");
        return;
    }

    match coordinator
        .submit(&options.distribution, paths, cancel)
        .await
    {
        Ok(Some(receipt)) => {
            run.emit(DeployEvent::InvalidationSubmitted {
                distribution: receipt.distribution.clone(),
                batch_ids: receipt.batch_ids.clone(),
                path_count: receipt.paths.len(),
            });
            run.result.invalidation = Some(receipt);
        }
        Ok(None) => {}
        Err(err) => {
            run.emit(DeployEvent::InvalidationFailed {
                distribution: err.distribution.clone(),
                error: err.source.to_string(),
            });
            run.warn(err.to_string());
            if !err.batch_ids.is_empty() {
                run.result.invalidation = Some(InvalidationReceipt {
                    distribution: err.distribution,
                    batch_ids: err.batch_ids,
                    paths: paths.to_paths(),
                });
            }
        }
    }
}

/// Mutable state of one run
struct Run {
    result: DeploymentResult,
    events: Arc<dyn DeployEventSink>,
}

impl Run {
    fn start(dry_run: bool, events: Arc<dyn DeployEventSink>) -> Self {
        let run = Self {
            result: DeploymentResult::new(dry_run),
            events,
        };
        tracing::info!(phase = %DeployPhase::Scanning, "deploy phase");
        run.emit(DeployEvent::PhaseChanged {
            phase: DeployPhase::Scanning,
        });
        run
    }

    fn emit(&self, event: DeployEvent) {
        if event.is_detailed() && !self.events.wants_detailed_events() {
            return;
        }
        self.events.on_event(event);
    }

    fn enter(&mut self, next: DeployPhase) {
        debug_assert!(
            self.result.phase.can_transition_to(next),
            "invalid transition {} -> {}",
            self.result.phase,
            next
        );
        tracing::info!(phase = %next, "deploy phase");
        self.result.phase = next;
        self.emit(DeployEvent::PhaseChanged { phase: next });
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.result.warnings.push(message);
    }

    fn fail(&mut self, kind: ErrorKind, message: String) {
        tracing::error!(phase = %self.result.phase, kind = %kind, error = %message, "deploy failed");
        self.result.failure = Some(RunFailure {
            phase: self.result.phase,
            kind,
            message,
        });
        self.enter(DeployPhase::Failed);
        self.complete(DeployStatus::Failed);
    }

    fn cancel(&mut self) {
        tracing::warn!(phase = %self.result.phase, "deploy cancelled");
        self.complete(DeployStatus::Cancelled);
    }

    fn finish(&mut self) {
        self.enter(DeployPhase::Done);
        let status = if self.result.errors.is_empty() {
            DeployStatus::Succeeded
        } else {
            DeployStatus::PartiallyFailed
        };
        self.complete(status);
    }

    fn complete(&mut self, status: DeployStatus) {
        self.result.status = status;
        self.emit(DeployEvent::Completed {
            status,
            uploaded: self.result.uploaded.len(),
            deleted: self.result.deleted.len(),
            skipped: self.result.skipped,
            errors: self.result.errors.len(),
        });
    }
}

/// Cancels the run when its time budget runs out; disarmed on drop.
struct DeadlineGuard {
    limit: Duration,
    fired: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl DeadlineGuard {
    fn arm(limit: Duration, cancel: CancellationToken) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            flag.store(true, Ordering::SeqCst);
            tracing::warn!(limit_secs = limit.as_secs(), "run deadline reached, cancelling");
            cancel.cancel();
        });
        Self { limit, fired, task }
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}
