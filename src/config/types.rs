//! Configuration type definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::retry::RetryPolicy;
use crate::application::sync::SyncOptions;
use crate::domain::services::{
    InvalidationPolicy, DEFAULT_ROOT_DOCUMENT, DEFAULT_WILDCARD_THRESHOLD,
};
use crate::domain::value_objects::ObjectKey;

use super::loader::{self, ConfigError, ConfigWarning};

/// Deploy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Build output directory
    #[serde(default)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub distribution: Option<String>,

    #[serde(default)]
    pub prune: bool,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default = "default_root_document")]
    pub root_document: String,

    #[serde(default = "default_wildcard_threshold")]
    pub wildcard_threshold: f64,

    #[serde(default)]
    pub dry_run: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            source: None,
            namespace: None,
            distribution: None,
            prune: false,
            exclude: Vec::new(),
            root_document: default_root_document(),
            wildcard_threshold: default_wildcard_threshold(),
            dry_run: false,
        }
    }
}

fn default_root_document() -> String {
    DEFAULT_ROOT_DOCUMENT.to_string()
}

fn default_wildcard_threshold() -> f64 {
    DEFAULT_WILDCARD_THRESHOLD
}

/// Transfer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Whole-run budget; unset means no deadline
    #[serde(default)]
    pub run_deadline_secs: Option<u64>,

    #[serde(default = "default_true")]
    pub verify_uploads: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            run_deadline_secs: None,
            verify_uploads: true,
        }
    }
}

fn default_concurrency() -> usize {
    crate::application::sync::DEFAULT_CONCURRENCY
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Object store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Directory tree under `store.root`
    #[default]
    Local,
    /// In-process; nothing survives the run
    Memory,
    /// S3 or compatible (requires the `s3` feature)
    S3,
}

impl StoreBackend {
    pub const NAMES: &'static [&'static str] = &["local", "memory", "s3"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "memory" => Some(Self::Memory),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }
}

/// Object store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for the `local` backend
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub allow_http: bool,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            root: None,
            region: None,
            endpoint: None,
            allow_http: false,
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    crate::infrastructure::store::DEFAULT_PAGE_SIZE
}

/// CDN backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CdnBackend {
    /// Invalidations journaled under `cdn.journal_dir`
    #[default]
    Journal,
    Memory,
    /// Skip invalidation entirely
    None,
}

impl CdnBackend {
    pub const NAMES: &'static [&'static str] = &["journal", "memory", "none"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "journal" => Some(Self::Journal),
            "memory" => Some(Self::Memory),
            "none" | "off" => Some(Self::None),
            _ => None,
        }
    }
}

/// CDN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdnConfig {
    #[serde(default)]
    pub backend: CdnBackend,

    #[serde(default)]
    pub journal_dir: Option<PathBuf>,

    #[serde(default = "default_max_paths")]
    pub max_paths_per_request: usize,

    #[serde(default)]
    pub settle_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            backend: CdnBackend::default(),
            journal_dir: None,
            max_paths_per_request: default_max_paths(),
            settle_secs: 0,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_max_paths() -> usize {
    crate::infrastructure::cdn::DEFAULT_MAX_PATHS
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub color: ColorMode,
}

/// Color output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub const NAMES: &'static [&'static str] = &["auto", "always", "never"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub cdn: CdnConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load a single TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, _warnings) = loader::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load a single file and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        loader::load_with_warnings(path)
    }

    /// Retry policy for store and CDN calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.sync.max_attempts)
            .with_initial_delay(Duration::from_millis(self.sync.initial_backoff_ms))
            .with_max_delay(Duration::from_millis(self.sync.max_backoff_ms))
            .with_call_timeout(Duration::from_secs(self.sync.call_timeout_secs.max(1)))
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            concurrency: self.sync.concurrency.max(1),
            verify_uploads: self.sync.verify_uploads,
            retry: self.retry_policy(),
        }
    }

    pub fn invalidation_policy(&self) -> Result<InvalidationPolicy, ConfigError> {
        let root = ObjectKey::parse(&self.deploy.root_document).map_err(|e| {
            ConfigError::Invalid {
                key: "deploy.root_document".to_string(),
                message: e.to_string(),
            }
        })?;
        let threshold = self.deploy.wildcard_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                key: "deploy.wildcard_threshold".to_string(),
                message: format!("{} is outside 0.0..=1.0", threshold),
            });
        }
        Ok(InvalidationPolicy::new(root, threshold))
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.sync.run_deadline_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.cdn.poll_interval_ms.max(1))
    }
}
