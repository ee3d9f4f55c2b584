//! Domain Ports
//!
//! Interfaces the application layer depends on. Infrastructure provides the
//! implementations.

pub mod asset_source;
pub mod cdn;
pub mod deploy_events;
pub mod object_store;

pub use asset_source::{AssetSource, ScanError, ScanFuture, ScanRequest};
pub use cdn::{CdnControlPlane, CdnError, CdnFuture, InvalidationStatus};
pub use deploy_events::{
    DeployEvent, DeployEventSink, MultiEventSink, NoopEventSink, RecordingEventSink,
};
pub use object_store::{ListPage, ObjectStore, StoreError, StoreFuture};
