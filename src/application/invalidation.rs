//! Invalidation Coordinator
//!
//! Submits invalidation paths to the CDN, split into chunks when the backend
//! caps paths per request, and optionally polls for completion. Submission
//! never blocks on propagation.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::retry::RetryPolicy;
use crate::domain::entities::InvalidationReceipt;
use crate::domain::ports::{CdnControlPlane, CdnError, InvalidationStatus};
use crate::domain::value_objects::InvalidationPaths;

/// Default interval between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Submission failed after retries.
///
/// Chunks accepted before the failure are still listed in `batch_ids`.
#[derive(Debug, Error)]
#[error("invalidation for distribution '{distribution}' failed: {source}")]
pub struct InvalidationError {
    pub distribution: String,
    pub batch_ids: Vec<String>,
    #[source]
    pub source: CdnError,
}

/// Result of waiting for batches to propagate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    TimedOut { pending: Vec<String> },
    Cancelled { pending: Vec<String> },
}

/// Coordinates invalidation requests against one CDN backend
#[derive(Clone)]
pub struct InvalidationCoordinator {
    cdn: Arc<dyn CdnControlPlane>,
    retry: RetryPolicy,
    poll_interval: Duration,
}

impl InvalidationCoordinator {
    pub fn new(cdn: Arc<dyn CdnControlPlane>, retry: RetryPolicy) -> Self {
        Self {
            cdn,
            retry,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Submit the path set. Returns `None` when there is nothing to invalidate.
    pub async fn submit(
        &self,
        distribution: &str,
        paths: &InvalidationPaths,
        cancel: &CancellationToken,
    ) -> Result<Option<InvalidationReceipt>, InvalidationError> {
        let paths = paths.to_paths();
        if paths.is_empty() {
            return Ok(None);
        }

        let limit = self.cdn.max_paths_per_request().max(1);
        let chunks: Vec<&[String]> = paths.chunks(limit).collect();
        tracing::info!(
            distribution,
            paths = paths.len(),
            requests = chunks.len(),
            "submitting invalidation"
        );

        let submissions = chunks.iter().map(|chunk| async move {
            self.retry
                .run("invalidate", distribution, cancel, || {
                    self.cdn.invalidate(distribution, chunk)
                })
                .await
                .outcome
        });

        let mut batch_ids = Vec::with_capacity(chunks.len());
        let mut first_error = None;
        for outcome in join_all(submissions).await {
            match outcome {
                Ok(batch_id) => batch_ids.push(batch_id),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(source) = first_error {
            tracing::warn!(distribution, error = %source, "invalidation not submitted");
            return Err(InvalidationError {
                distribution: distribution.to_string(),
                batch_ids,
                source,
            });
        }

        tracing::info!(distribution, batches = ?batch_ids, "invalidation submitted");
        Ok(Some(InvalidationReceipt {
            distribution: distribution.to_string(),
            batch_ids,
            paths,
        }))
    }

    /// Current state of each batch.
    pub async fn status(
        &self,
        distribution: &str,
        batch_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, InvalidationStatus)>, CdnError> {
        let checks = batch_ids.iter().map(|id| async move {
            let status = self
                .retry
                .run("invalidation_status", id, cancel, || {
                    self.cdn.invalidation_status(distribution, id)
                })
                .await
                .outcome?;
            Ok::<_, CdnError>((id.clone(), status))
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Poll until every batch completes, `timeout` elapses or `cancel` fires.
    pub async fn wait(
        &self,
        distribution: &str,
        batch_ids: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, CdnError> {
        let deadline = Instant::now() + timeout;
        let mut pending: Vec<String> = batch_ids.to_vec();

        loop {
            let statuses = self.status(distribution, &pending, cancel).await?;
            pending = statuses
                .into_iter()
                .filter(|(_, status)| *status == InvalidationStatus::Pending)
                .map(|(id, _)| id)
                .collect();

            if pending.is_empty() {
                tracing::info!(distribution, "invalidation completed");
                return Ok(WaitOutcome::Completed);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(distribution, pending = ?pending, "invalidation still propagating");
                return Ok(WaitOutcome::TimedOut { pending });
            }

            tracing::debug!(distribution, pending = pending.len(), "waiting for invalidation");
            let nap = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = cancel.cancelled() => return Ok(WaitOutcome::Cancelled { pending }),
            }
        }
    }
}
