//! Remote Object Entity
//!
//! An object as reported by the destination namespace. The fingerprint comes
//! from stored metadata and is never recomputed from content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Fingerprint, MimeType, ObjectKey};

/// Object currently stored in the destination namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: ObjectKey,
    /// Empty when the object carries no fingerprint metadata
    pub fingerprint: Fingerprint,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
}

impl RemoteObject {
    pub fn new(key: ObjectKey, fingerprint: Fingerprint) -> Self {
        Self {
            key,
            fingerprint,
            last_modified: None,
            size: 0,
        }
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Whether the object was written without fingerprint metadata.
    pub fn is_foreign(&self) -> bool {
        self.fingerprint.is_empty()
    }
}

/// Metadata written atomically with an object's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub fingerprint: Fingerprint,
    pub mime_type: MimeType,
}

impl ObjectMetadata {
    pub fn new(fingerprint: Fingerprint, mime_type: MimeType) -> Self {
        Self {
            fingerprint,
            mime_type,
        }
    }
}
