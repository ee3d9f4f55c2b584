//! Domain Layer
//!
//! Pure deployment logic without I/O dependencies.
//!
//! ## Structure
//!
//! - `entities/` - LocalAsset, RemoteObject, DeploymentPlan, DeploymentResult
//! - `value_objects/` - Fingerprint, ObjectKey, ExcludePatterns, MimeType, status types
//! - `services/` - DiffPlanner, invalidation path derivation, duplicate diagnostics
//! - `ports/` - Interfaces implemented by infrastructure
//!
//! ## Design Principles
//!
//! 1. **No I/O** - This layer never touches the file system or network directly
//! 2. **Pure Functions** - Services are stateless and testable
//! 3. **Ports & Adapters** - All I/O goes through trait-defined ports

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
