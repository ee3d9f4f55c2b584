//! Object store adapters

mod flaky;
mod local_dir;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use flaky::FlakyObjectStore;
pub use local_dir::{LocalDirObjectStore, META_DIR};
pub use memory::{MemoryObjectStore, DEFAULT_PAGE_SIZE};
#[cfg(feature = "s3")]
pub use s3::{S3ObjectStore, S3Settings};
