//! Object Key Value Object
//!
//! The unique key shared by a local asset and its remote object: a POSIX
//! style relative path (`css/site.css`). Ordering is byte-wise, which makes
//! scan output and plans deterministic across platforms.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while deriving a key from a path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("empty object key")]
    Empty,

    #[error("path '{0}' is not valid UTF-8")]
    NonUtf8(String),

    #[error("path '{0}' must be relative to the source root")]
    NotRelative(String),

    #[error("path '{0}' contains a parent or current directory component")]
    Traversal(String),
}

/// Relative object key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Build a key from a path relative to the source root.
    ///
    /// Separators are normalized to `/` regardless of platform.
    pub fn from_relative_path(path: &Path) -> Result<Self, KeyError> {
        let mut segments = Vec::new();

        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| KeyError::NonUtf8(path.to_string_lossy().into_owned()))?;
                    segments.push(part);
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(KeyError::NotRelative(path.display().to_string()));
                }
                Component::CurDir | Component::ParentDir => {
                    return Err(KeyError::Traversal(path.display().to_string()));
                }
            }
        }

        if segments.is_empty() {
            return Err(KeyError::Empty);
        }

        Ok(Self(segments.join("/")))
    }

    /// Parse a key as reported by a remote store.
    ///
    /// Leading slashes are stripped; traversal segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }
        if trimmed.split('/').any(|s| s == ".." || s == ".") {
            return Err(KeyError::Traversal(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path as requested through the CDN (`/css/site.css`).
    pub fn cdn_path(&self) -> String {
        format!("/{}", self.0)
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
