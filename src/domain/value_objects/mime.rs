//! MIME type derivation
//!
//! Content types are looked up from the file extension. Text types carry an
//! explicit `charset=utf-8` so browsers never have to sniff.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback for unknown or missing extensions
pub const OCTET_STREAM: &str = "application/octet-stream";

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("webmanifest", "application/manifest+json"),
    ("xml", "application/xml"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("wasm", "application/wasm"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
];

/// Content type stored alongside an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeType(String);

impl MimeType {
    /// Derive the content type from a key or file name.
    pub fn from_key(key: &str) -> Self {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        let extension = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return Self(OCTET_STREAM.to_string()),
        };

        let essence = EXTENSION_TABLE
            .iter()
            .find(|(e, _)| *e == extension)
            .map(|(_, mime)| *mime)
            .unwrap_or(OCTET_STREAM);

        if is_textual(essence) {
            Self(format!("{}; charset=utf-8", essence))
        } else {
            Self(essence.to_string())
        }
    }

    /// Wrap a content type reported by a backend.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Type without parameters (`text/html` for `text/html; charset=utf-8`).
    pub fn essence(&self) -> &str {
        self.0.split(';').next().unwrap_or(&self.0).trim()
    }
}

impl Default for MimeType {
    fn default() -> Self {
        Self(OCTET_STREAM.to_string())
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_textual(essence: &str) -> bool {
    essence.starts_with("text/")
        || matches!(
            essence,
            "application/json" | "application/manifest+json" | "application/xml" | "image/svg+xml"
        )
}
