//! Tracing Event Sink
//!
//! Mirrors deploy events into the structured log so text-mode runs leave
//! the same trail as NDJSON runs.

use crate::domain::ports::{DeployEvent, DeployEventSink};

/// Event sink that logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink {
    detailed: bool,
}

impl TracingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log per-object events (at debug level).
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }
}

impl DeployEventSink for TracingEventSink {
    fn on_event(&self, event: DeployEvent) {
        match event {
            DeployEvent::PhaseChanged { phase } => {
                tracing::debug!(phase = %phase, "phase changed");
            }
            DeployEvent::Scanned {
                asset_count,
                total_bytes,
                duplicate_groups,
            } => {
                tracing::info!(asset_count, total_bytes, duplicate_groups, "scan complete");
            }
            DeployEvent::Planned {
                to_upload,
                to_delete,
                unchanged,
                retained,
                remote_count,
            } => {
                tracing::info!(
                    to_upload,
                    to_delete,
                    unchanged,
                    retained,
                    remote_count,
                    "plan ready"
                );
            }
            DeployEvent::ObjectUploaded {
                key,
                bytes,
                attempts,
            } => {
                tracing::debug!(key = %key, bytes, attempts, "uploaded");
            }
            DeployEvent::ObjectDeleted { key, attempts } => {
                tracing::debug!(key = %key, attempts, "deleted");
            }
            DeployEvent::ObjectFailed {
                key,
                operation,
                kind,
                error,
                attempts,
            } => {
                tracing::warn!(
                    key = %key,
                    operation = operation.as_str(),
                    kind = %kind,
                    attempts,
                    error = %error,
                    "object failed"
                );
            }
            DeployEvent::InvalidationSubmitted {
                distribution,
                batch_ids,
                path_count,
            } => {
                tracing::info!(
                    distribution = %distribution,
                    batches = ?batch_ids,
                    path_count,
                    "invalidation submitted"
                );
            }
            DeployEvent::InvalidationFailed {
                distribution,
                error,
            } => {
                tracing::warn!(distribution = %distribution, error = %error, "invalidation failed");
            }
            DeployEvent::Completed {
                status,
                uploaded,
                deleted,
                skipped,
                errors,
            } => {
                tracing::info!(
                    status = %status,
                    uploaded,
                    deleted,
                    skipped,
                    errors,
                    "deploy finished"
                );
            }
        }
    }

    fn wants_detailed_events(&self) -> bool {
        self.detailed
    }
}
