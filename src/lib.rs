//! edgepush - idempotent static-site deployment
//!
//! edgepush fingerprints a local build directory, diffs it against the
//! objects already in a remote namespace, uploads what changed, optionally
//! prunes what disappeared and asks the CDN in front of the namespace to
//! drop stale cache entries.
//!
//! Storage and CDN backends sit behind the [`domain::ports::ObjectStore`]
//! and [`domain::ports::CdnControlPlane`] traits.

pub mod application;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod presentation;
pub mod runtime_state;

// Re-exports for convenience
pub use application::{DeployOptions, DeployUseCase, PlanOutcome, RetryPolicy, SyncOptions};
pub use config::{Config, ConfigError};
pub use domain::entities::{DeploymentPlan, DeploymentResult, LocalAsset, RemoteObject};
pub use domain::ports::{CdnControlPlane, DeployEvent, DeployEventSink, ObjectStore};
pub use domain::services::{DiffPlanner, InvalidationPolicy};
pub use domain::value_objects::{DeployPhase, DeployStatus, ErrorKind, Fingerprint, ObjectKey};
pub use error::{DeployError, DeployResult};
