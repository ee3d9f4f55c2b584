//! Deployment status, phase and error classification

use std::fmt;

use serde::{Deserialize, Serialize};

/// Overall outcome of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    /// Every planned operation succeeded
    Succeeded,
    /// Sync finished but some objects failed after retries
    PartiallyFailed,
    /// Aborted by a non-recoverable error
    Failed,
    /// Stopped by the caller or the run deadline
    Cancelled,
}

impl DeployStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> i32 {
        match self {
            DeployStatus::Succeeded => 0,
            DeployStatus::PartiallyFailed => 1,
            DeployStatus::Failed | DeployStatus::Cancelled => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeployStatus::Succeeded => "succeeded",
            DeployStatus::PartiallyFailed => "partially_failed",
            DeployStatus::Failed => "failed",
            DeployStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_success(self) -> bool {
        self == DeployStatus::Succeeded
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state
///
/// `Scanning → Diffing → Syncing → Invalidating → Done`; `Failed` is reachable
/// from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    Scanning,
    Diffing,
    Syncing,
    Invalidating,
    Done,
    Failed,
}

impl DeployPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DeployPhase::Scanning => "scanning",
            DeployPhase::Diffing => "diffing",
            DeployPhase::Syncing => "syncing",
            DeployPhase::Invalidating => "invalidating",
            DeployPhase::Done => "done",
            DeployPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeployPhase::Done | DeployPhase::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: DeployPhase) -> bool {
        use DeployPhase::*;
        match (self, next) {
            (Scanning, Diffing)
            | (Diffing, Syncing)
            | (Diffing, Done)
            | (Syncing, Invalidating)
            | (Syncing, Done)
            | (Invalidating, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy shared by every layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Local read failure (fatal)
    Io,
    /// Authentication or authorization failure (fatal)
    Permission,
    /// Network or backend hiccup (retried)
    Transient,
    /// CDN invalidation could not be submitted (warning only)
    Invalidation,
    /// Run stopped by a cancellation signal
    Cancelled,
    /// Invalid configuration or arguments (fatal)
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Permission => "permission",
            ErrorKind::Transient => "transient",
            ErrorKind::Invalidation => "invalidation",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
