//! Deploy Event Port
//!
//! Provides an observable interface for deploy operations.
//! Enables progress reporting, JSON event streams, and log mirroring.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::entities::SyncOperation;
use crate::domain::value_objects::{DeployPhase, DeployStatus, ErrorKind, ObjectKey};

/// Event emitted during deploy operations
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// Orchestrator entered a new phase
    PhaseChanged { phase: DeployPhase },

    /// Local scan finished
    Scanned {
        asset_count: usize,
        total_bytes: u64,
        duplicate_groups: usize,
    },

    /// Diff finished
    Planned {
        to_upload: usize,
        to_delete: usize,
        unchanged: usize,
        retained: usize,
        remote_count: usize,
    },

    /// Object written and verified
    ObjectUploaded {
        key: ObjectKey,
        bytes: u64,
        attempts: u32,
    },

    /// Object removed from the namespace
    ObjectDeleted { key: ObjectKey, attempts: u32 },

    /// Object failed permanently
    ObjectFailed {
        key: ObjectKey,
        operation: SyncOperation,
        kind: ErrorKind,
        error: String,
        attempts: u32,
    },

    /// Invalidation accepted by the CDN
    InvalidationSubmitted {
        distribution: String,
        batch_ids: Vec<String>,
        path_count: usize,
    },

    /// Invalidation could not be submitted (warning)
    InvalidationFailed { distribution: String, error: String },

    /// Run finished
    Completed {
        status: DeployStatus,
        uploaded: usize,
        deleted: usize,
        skipped: usize,
        errors: usize,
    },
}

impl DeployEvent {
    /// Per-object events, suppressed for sinks that only want summaries.
    pub fn is_detailed(&self) -> bool {
        matches!(
            self,
            DeployEvent::ObjectUploaded { .. } | DeployEvent::ObjectDeleted { .. }
        )
    }
}

/// Trait for receiving deploy events
///
/// Implementations:
/// - `JsonEventSink`: NDJSON event stream for CI
/// - `TracingEventSink`: mirrors events into the log
/// - `NoopEventSink`: silent operation
pub trait DeployEventSink: Send + Sync {
    /// Handle a deploy event
    fn on_event(&self, event: DeployEvent);

    /// Check if this sink wants per-object events
    fn wants_detailed_events(&self) -> bool {
        true
    }
}

/// No-op event sink for silent operation
pub struct NoopEventSink;

impl DeployEventSink for NoopEventSink {
    fn on_event(&self, _event: DeployEvent) {}

    fn wants_detailed_events(&self) -> bool {
        false
    }
}

/// Sink that keeps every event in memory
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DeployEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeployEvent> {
        self.events.lock().clone()
    }

    /// Phases in the order they were entered.
    pub fn phases(&self) -> Vec<DeployPhase> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DeployEvent::PhaseChanged { phase } => Some(*phase),
                _ => None,
            })
            .collect()
    }
}

impl DeployEventSink for RecordingEventSink {
    fn on_event(&self, event: DeployEvent) {
        self.events.lock().push(event);
    }
}

/// Fan events out to several sinks
pub struct MultiEventSink {
    sinks: Vec<Arc<dyn DeployEventSink>>,
}

impl MultiEventSink {
    pub fn new(sinks: Vec<Arc<dyn DeployEventSink>>) -> Self {
        Self { sinks }
    }
}

impl DeployEventSink for MultiEventSink {
    fn on_event(&self, event: DeployEvent) {
        for sink in &self.sinks {
            if event.is_detailed() && !sink.wants_detailed_events() {
                continue;
            }
            sink.on_event(event.clone());
        }
    }
}
