//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod exclude_patterns;
mod fingerprint;
mod invalidation_paths;
mod mime;
mod object_key;
mod status;

pub use exclude_patterns::{ExcludeError, ExcludePatterns, IGNORE_FILE};
pub use fingerprint::Fingerprint;
pub use invalidation_paths::{InvalidationPaths, WILDCARD_PATH};
pub use mime::{MimeType, OCTET_STREAM};
pub use object_key::{KeyError, ObjectKey};
pub use status::{DeployPhase, DeployStatus, ErrorKind};
