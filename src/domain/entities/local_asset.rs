//! Local Asset Entity
//!
//! One regular file found under the source root, read once per run.

use std::path::{Path, PathBuf};

use crate::domain::value_objects::{Fingerprint, MimeType, ObjectKey};

/// A file scheduled to be reconciled against the remote namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    key: ObjectKey,
    path: PathBuf,
    size: u64,
    fingerprint: Fingerprint,
    mime_type: MimeType,
}

impl LocalAsset {
    /// Create an asset; the MIME type is derived from the key.
    pub fn new(
        key: ObjectKey,
        path: impl Into<PathBuf>,
        size: u64,
        fingerprint: Fingerprint,
    ) -> Self {
        let mime_type = MimeType::from_key(key.as_str());
        Self {
            key,
            path: path.into(),
            size,
            fingerprint,
            mime_type,
        }
    }

    /// Build an asset from in-memory content (tests, synthetic sources).
    pub fn from_content(key: ObjectKey, path: impl Into<PathBuf>, content: &[u8]) -> Self {
        let fingerprint = Fingerprint::from_bytes(content);
        Self::new(key, path, content.len() as u64, fingerprint)
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Absolute path on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn mime_type(&self) -> &MimeType {
        &self.mime_type
    }
}
