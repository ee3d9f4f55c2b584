//! Content Fingerprint Value Object
//!
//! A stable content hash used to detect change without comparing bytes.
//! Local files are fingerprinted on every run; remote objects carry the
//! fingerprint that was written into their metadata at upload time.

use std::fmt;
use std::io::{self, Read};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Read buffer used when hashing files.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Content fingerprint
///
/// Wraps a SHA-256 digest with the `sha256:` prefix. The empty fingerprint
/// stands for "unknown" (an object written by a foreign process without
/// metadata) and never matches anything, including another empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Prefix for SHA-256 fingerprints
    pub const PREFIX: &'static str = "sha256:";

    /// The unknown fingerprint.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Parse a stored fingerprint (with or without prefix).
    ///
    /// Blank input yields the empty fingerprint.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Self::empty()
        } else if raw.starts_with(Self::PREFIX) {
            Self(raw.to_string())
        } else {
            Self(format!("{}{}", Self::PREFIX, raw))
        }
    }

    /// Fingerprint an in-memory buffer.
    pub fn from_bytes(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(format!("{}{:x}", Self::PREFIX, digest))
    }

    /// Fingerprint a reader, returning the digest and the number of bytes read.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<(Self, u64)> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
            total += n as u64;
        }

        Ok((Self(format!("{}{:x}", Self::PREFIX, hasher.finalize())), total))
    }

    /// Whether this is the unknown fingerprint.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Full fingerprint string with prefix (empty for the unknown fingerprint)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digest without prefix
    pub fn hex(&self) -> &str {
        self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
    }

    /// Short form for display (first 12 hex chars).
    pub fn short(&self) -> &str {
        let hex = self.hex();
        &hex[..hex.len().min(12)]
    }

    /// Whether two fingerprints prove identical content.
    ///
    /// The empty fingerprint never matches.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        !self.is_empty() && self.0 == other.0
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
