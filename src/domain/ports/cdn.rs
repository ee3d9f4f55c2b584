//! CDN Control Plane Port
//!
//! Invalidation is two-phase: `invalidate` returns a batch identifier as
//! soon as the request is accepted, and `invalidation_status` reports
//! propagation separately.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::ErrorKind;

/// Boxed future returned by every CDN operation
pub type CdnFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CdnError>> + Send + 'a>>;

/// Propagation state of an invalidation batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationStatus {
    Pending,
    Completed,
}

impl fmt::Display for InvalidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationStatus::Pending => write!(f, "pending"),
            InvalidationStatus::Completed => write!(f, "completed"),
        }
    }
}

/// CDN control plane errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdnError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unknown distribution: {0}")]
    UnknownDistribution(String),

    #[error("unknown invalidation batch: {0}")]
    UnknownBatch(String),

    #[error("{count} paths exceed the per-request limit of {limit}")]
    TooManyPaths { count: usize, limit: usize },

    #[error("transient CDN error: {0}")]
    Transient(String),

    #[error("CDN call timed out after {0:?}")]
    Timeout(Duration),

    #[error("CDN I/O error: {0}")]
    Io(String),
}

impl CdnError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CdnError::Transient(_) | CdnError::Timeout(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CdnError::PermissionDenied(_) => ErrorKind::Permission,
            CdnError::Transient(_) | CdnError::Timeout(_) => ErrorKind::Transient,
            _ => ErrorKind::Invalidation,
        }
    }
}

/// CDN control plane abstraction
pub trait CdnControlPlane: Send + Sync {
    /// Human-readable backend description for logs
    fn describe(&self) -> String;

    /// Maximum number of paths accepted by a single `invalidate` call.
    fn max_paths_per_request(&self) -> usize;

    /// Submit an invalidation; returns the batch identifier.
    fn invalidate<'a>(&'a self, distribution: &'a str, paths: &'a [String])
        -> CdnFuture<'a, String>;

    /// Current propagation state of a batch.
    fn invalidation_status<'a>(
        &'a self,
        distribution: &'a str,
        batch_id: &'a str,
    ) -> CdnFuture<'a, InvalidationStatus>;
}
