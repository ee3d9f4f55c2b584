//! CDN control plane adapters

mod journal;
mod memory;

pub use journal::{Journal, JournalBatch, JournalCdn};
pub use memory::{MemoryCdn, DEFAULT_MAX_PATHS};
