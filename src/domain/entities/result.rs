//! Deployment Result Entity
//!
//! Created once per run and returned by the orchestrator. Enumerates every
//! failed object; the status reflects the worst severity encountered.

use std::time::Duration;

use serde::Serialize;

use crate::domain::entities::DeploymentPlan;
use crate::domain::value_objects::{DeployPhase, DeployStatus, ErrorKind, ObjectKey};

/// Kind of remote mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Upload,
    Delete,
}

impl SyncOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOperation::Upload => "upload",
            SyncOperation::Delete => "delete",
        }
    }
}

/// A per-object error recorded after retries were exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectFailure {
    pub key: ObjectKey,
    pub operation: SyncOperation,
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: u32,
}

/// Non-recoverable error that ended the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub phase: DeployPhase,
    pub kind: ErrorKind,
    pub message: String,
}

/// Submitted invalidation batches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InvalidationReceipt {
    pub distribution: String,
    pub batch_ids: Vec<String>,
    pub paths: Vec<String>,
}

impl InvalidationReceipt {
    /// Primary batch identifier (first submitted chunk).
    pub fn batch_id(&self) -> Option<&str> {
        self.batch_ids.first().map(String::as_str)
    }
}

/// Outcome of a deployment run
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub status: DeployStatus,
    /// Last phase reached
    pub phase: DeployPhase,
    pub uploaded: Vec<ObjectKey>,
    pub deleted: Vec<ObjectKey>,
    /// Unchanged objects that were not transferred
    pub skipped: usize,
    /// Remote-only objects left in place (pruning disabled)
    pub retained: usize,
    pub errors: Vec<ObjectFailure>,
    /// Non-fatal problems (invalidation failures, skipped invalidation)
    pub warnings: Vec<String>,
    pub invalidation: Option<InvalidationReceipt>,
    pub failure: Option<RunFailure>,
    pub dry_run: bool,
    /// The computed plan, kept for dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<DeploymentPlan>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl DeploymentResult {
    /// Empty result for a run that has not mutated anything yet.
    pub fn new(dry_run: bool) -> Self {
        Self {
            status: DeployStatus::Succeeded,
            phase: DeployPhase::Scanning,
            uploaded: Vec::new(),
            deleted: Vec::new(),
            skipped: 0,
            retained: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            invalidation: None,
            failure: None,
            dry_run,
            plan: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn has_changes(&self) -> bool {
        !self.uploaded.is_empty() || !self.deleted.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
