//! Application Layer
//!
//! Use cases that orchestrate the business flow.
//! This layer:
//! - Depends on Domain layer (entities, services, ports)
//! - Does NOT contain business rules (those are in Domain)
//! - Coordinates between Infrastructure and Domain
//!
//! ## Use Cases
//!
//! - `DeployUseCase` - Orchestrates a run (scan, inventory, diff, sync, invalidate)
//!
//! ## Services
//!
//! - `InventoryReader` - Paginated, retried listing of the remote namespace
//! - `SyncExecutor` - Bounded-concurrency upload/delete of a plan
//! - `InvalidationCoordinator` - Chunked CDN submission and status polling
//! - `RetryPolicy` - Exponential backoff with jitter and per-call timeout

pub mod deploy;
pub mod invalidation;
pub mod inventory;
pub mod retry;
pub mod sync;

pub use deploy::{DeployOptions, DeployUseCase, PlanOutcome};
pub use invalidation::{InvalidationCoordinator, InvalidationError, WaitOutcome};
pub use inventory::InventoryReader;
pub use retry::{Attempted, RetryPolicy, RetryableError};
pub use sync::{SyncExecutor, SyncOptions, SyncReport};
