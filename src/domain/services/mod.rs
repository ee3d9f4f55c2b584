//! Domain Services
//!
//! Stateless logic over domain types: planning, invalidation path
//! derivation and duplicate diagnostics.

mod duplicates;
mod invalidation;
mod planner;

pub use duplicates::{find_duplicates, DuplicateGroup};
pub use invalidation::{InvalidationPolicy, DEFAULT_ROOT_DOCUMENT, DEFAULT_WILDCARD_THRESHOLD};
pub use planner::DiffPlanner;
