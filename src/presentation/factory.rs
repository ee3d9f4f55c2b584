//! Use Case Factory
//!
//! Creates use cases with infrastructure dependencies wired up from the
//! resolved configuration. This is the dependency injection point for the
//! binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::application::{DeployUseCase, InvalidationCoordinator};
use crate::config::{CdnBackend, CdnConfig, Config, ConfigError, StoreBackend, StoreConfig};
use crate::domain::ports::{CdnControlPlane, ObjectStore};
use crate::infrastructure::{
    JournalCdn, LocalAssetSource, LocalDirObjectStore, MemoryCdn, MemoryObjectStore,
};
use crate::runtime_state::STATE_DIR;

/// Default journal location for the `journal` CDN backend
const DEFAULT_JOURNAL_DIR: &str = "cdn";

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Object store for the configured backend.
pub fn create_object_store(
    config: &StoreConfig,
    base_dir: &Path,
) -> Result<Arc<dyn ObjectStore>, ConfigError> {
    match config.backend {
        StoreBackend::Local => {
            let root = config
                .root
                .as_deref()
                .ok_or_else(|| ConfigError::Missing("store.root".to_string()))?;
            Ok(Arc::new(
                LocalDirObjectStore::new(resolve(base_dir, root)).with_page_size(config.page_size),
            ))
        }
        StoreBackend::Memory => {
            Ok(Arc::new(MemoryObjectStore::new().with_page_size(config.page_size)))
        }
        StoreBackend::S3 => create_s3_store(config),
    }
}

#[cfg(feature = "s3")]
fn create_s3_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, ConfigError> {
    use crate::infrastructure::store::{S3ObjectStore, S3Settings};

    Ok(Arc::new(S3ObjectStore::new(S3Settings {
        region: config.region.clone(),
        endpoint: config.endpoint.clone(),
        allow_http: config.allow_http,
    })))
}

#[cfg(not(feature = "s3"))]
fn create_s3_store(_config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, ConfigError> {
    Err(ConfigError::Unsupported(
        "store.backend = \"s3\" requires a build with the `s3` feature".to_string(),
    ))
}

/// CDN control plane for the configured backend, `None` when disabled.
pub fn create_cdn(config: &CdnConfig, base_dir: &Path) -> Option<Arc<dyn CdnControlPlane>> {
    match config.backend {
        CdnBackend::Journal => {
            let dir = match &config.journal_dir {
                Some(dir) => resolve(base_dir, dir),
                None => base_dir.join(STATE_DIR).join(DEFAULT_JOURNAL_DIR),
            };
            Some(Arc::new(
                JournalCdn::new(dir)
                    .with_settle_time(Duration::from_secs(config.settle_secs))
                    .with_max_paths(config.max_paths_per_request),
            ))
        }
        CdnBackend::Memory => {
            Some(Arc::new(MemoryCdn::new().with_max_paths(config.max_paths_per_request)))
        }
        CdnBackend::None => None,
    }
}

/// Deploy use case with every port bound to its configured adapter.
pub fn create_deploy_use_case(
    config: &Config,
    base_dir: &Path,
) -> Result<DeployUseCase, ConfigError> {
    let store = create_object_store(&config.store, base_dir)?;
    let use_case = DeployUseCase::new(Arc::new(LocalAssetSource::new()), store)
        .with_poll_interval(config.poll_interval());

    Ok(match create_cdn(&config.cdn, base_dir) {
        Some(cdn) => use_case.with_cdn(cdn),
        None => use_case,
    })
}

/// Coordinator for `status`, `None` when the CDN is disabled.
pub fn create_invalidation_coordinator(
    config: &Config,
    base_dir: &Path,
) -> Option<InvalidationCoordinator> {
    let cdn = create_cdn(&config.cdn, base_dir)?;
    Some(
        InvalidationCoordinator::new(cdn, config.retry_policy())
            .with_poll_interval(config.poll_interval()),
    )
}
