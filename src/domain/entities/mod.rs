//! Domain Entities
//!
//! Core types with identity: local assets, remote objects, the plan that
//! reconciles them and the result of applying it.

mod local_asset;
mod plan;
mod remote_object;
mod result;

pub use local_asset::LocalAsset;
pub use plan::DeploymentPlan;
pub use remote_object::{ObjectMetadata, RemoteObject};
pub use result::{
    DeploymentResult, InvalidationReceipt, ObjectFailure, RunFailure, SyncOperation,
};
