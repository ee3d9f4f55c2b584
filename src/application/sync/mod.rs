//! Sync Executor
//!
//! Applies a [`DeploymentPlan`](crate::domain::entities::DeploymentPlan) to
//! the destination namespace.

mod executor;

pub use executor::{SyncExecutor, SyncOptions, SyncReport, DEFAULT_CONCURRENCY};
