//! Error types for edgepush
//!
//! Uses `thiserror` for library errors. Each port has its own error type;
//! `DeployError` is the top-level error for operations that abort a run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::ports::{CdnError, ScanError, StoreError};
use crate::domain::value_objects::ErrorKind;

/// Result type alias for edgepush operations
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that abort a deployment before any remote mutation
#[derive(Error, Debug)]
pub enum DeployError {
    /// Local source could not be scanned
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Remote inventory could not be read
    #[error("remote inventory failed: {0}")]
    Inventory(#[source] StoreError),

    /// CDN control plane failure outside a deploy run
    #[error(transparent)]
    Cdn(#[from] CdnError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Run stopped by a cancellation signal
    #[error("deployment cancelled")]
    Cancelled,
}

impl DeployError {
    /// Position of this error in the taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Scan(e) => e.kind(),
            DeployError::Inventory(e) => e.kind(),
            DeployError::Cdn(e) => e.kind(),
            DeployError::Config(_) => ErrorKind::Config,
            DeployError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn scan_errors_are_io() {
        let err = DeployError::from(ScanError::RootNotFound(PathBuf::from("dist")));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "scan failed: source directory not found: dist");
    }

    #[test]
    fn unreadable_local_file_is_io_even_when_access_is_denied() {
        let err = DeployError::from(ScanError::Unreadable {
            path: PathBuf::from("dist/secret.html"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn inventory_permission_errors_are_permission() {
        let err = DeployError::Inventory(StoreError::PermissionDenied("403".into()));
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn cancelled_has_its_own_kind() {
        assert_eq!(DeployError::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
