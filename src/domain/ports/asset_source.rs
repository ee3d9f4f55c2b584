//! Asset Source Port
//!
//! Read-only access to the local build output: a recursive scan that yields
//! fingerprinted assets, and content reads for upload.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use crate::domain::entities::LocalAsset;
use crate::domain::value_objects::{ErrorKind, ExcludeError, KeyError};

/// Boxed future returned by asset source operations
pub type ScanFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ScanError>> + Send + 'a>>;

/// What to scan
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: PathBuf,
    /// Gitignore-style globs relative to `root`
    pub exclude: Vec<String>,
    /// Files hashed in parallel
    pub concurrency: usize,
}

impl ScanRequest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: Vec::new(),
            concurrency: 16,
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Local scan and read errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("source is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("symlink cycle detected at {} (points back to {})", .path.display(), .ancestor.display())]
    SymlinkCycle { path: PathBuf, ancestor: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} changed since it was scanned", .0.display())]
    Changed(PathBuf),

    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    #[error("cannot derive object key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("directory walk failed: {0}")]
    Walk(String),
}

impl ScanError {
    /// Local failures are `Io` whatever the OS reason; `Permission` is
    /// reserved for remote authorization.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Exclude(_) => ErrorKind::Config,
            _ => ErrorKind::Io,
        }
    }
}

/// Local asset source abstraction
pub trait AssetSource: Send + Sync {
    /// Walk the root and fingerprint every regular file, ordered by key.
    fn scan<'a>(&'a self, request: &'a ScanRequest) -> ScanFuture<'a, Vec<LocalAsset>>;

    /// Read an asset's full content.
    fn read<'a>(&'a self, asset: &'a LocalAsset) -> ScanFuture<'a, Bytes>;
}
