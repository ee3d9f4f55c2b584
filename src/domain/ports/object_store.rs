//! Object Store Port
//!
//! The destination namespace: a flat key space where every object carries a
//! fingerprint and content type alongside its bytes.
//!
//! Implementations:
//! - `MemoryObjectStore`: in-process, for tests
//! - `LocalDirObjectStore`: a directory tree with sidecar metadata
//! - `S3ObjectStore`: S3 and compatible services (feature `s3`)

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::domain::entities::{ObjectMetadata, RemoteObject};
use crate::domain::value_objects::{ErrorKind, ObjectKey};

/// Boxed future returned by every store operation
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<RemoteObject>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// Object store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("transient store error: {0}")]
    Transient(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("stored fingerprint for '{key}' is {found}, expected {expected}")]
    VerifyMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("invalid key '{0}' reported by store")]
    InvalidKey(String),

    #[error("store I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Transient(_) | StoreError::Timeout(_) | StoreError::VerifyMismatch { .. }
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::PermissionDenied(_) => ErrorKind::Permission,
            StoreError::NamespaceNotFound(_) => ErrorKind::Config,
            StoreError::Transient(_) | StoreError::Timeout(_) | StoreError::VerifyMismatch { .. } => {
                ErrorKind::Transient
            }
            StoreError::NotFound(_) | StoreError::InvalidKey(_) | StoreError::Io(_) => ErrorKind::Io,
        }
    }

    /// Classify a local I/O error raised by a file-backed store.
    pub fn from_io(err: io::Error, context: &str) -> Self {
        let message = format!("{}: {}", context, err);
        match err.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(message),
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(message),
            io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => StoreError::Transient(message),
            _ => StoreError::Io(message),
        }
    }
}

/// Destination namespace abstraction
pub trait ObjectStore: Send + Sync {
    /// Human-readable backend description for logs
    fn describe(&self) -> String;

    /// List one page of objects; pass the previous page's token to continue.
    fn list_page<'a>(
        &'a self,
        namespace: &'a str,
        token: Option<&'a str>,
    ) -> StoreFuture<'a, ListPage>;

    /// Metadata of a single object, `None` if absent.
    fn head<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
    ) -> StoreFuture<'a, Option<RemoteObject>>;

    /// Create or overwrite an object; content and metadata are published together.
    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
        content: Bytes,
        metadata: &'a ObjectMetadata,
    ) -> StoreFuture<'a, ()>;

    /// Remove an object; `NotFound` if it does not exist.
    fn delete<'a>(&'a self, namespace: &'a str, key: &'a ObjectKey) -> StoreFuture<'a, ()>;
}
