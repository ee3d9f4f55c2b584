//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `fs/` - Local asset source (scan + read)
//! - `store/` - Object stores (memory, local directory, S3)
//! - `cdn/` - CDN control planes (memory, file journal)
//! - `events/` - Deploy event sinks (NDJSON, tracing)

pub mod cdn;
pub mod events;
pub mod fs;
pub mod store;

pub use cdn::{JournalCdn, MemoryCdn};
pub use events::{JsonEventSink, TracingEventSink};
pub use fs::LocalAssetSource;
pub use store::{FlakyObjectStore, LocalDirObjectStore, MemoryObjectStore};
