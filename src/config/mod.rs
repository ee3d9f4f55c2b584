//! Configuration module for edgepush
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (EDGEPUSH_*)
//! 3. Project config (./edgepush.toml or --config)
//! 4. User config (<config_dir>/edgepush/config.toml)
//! 5. Built-in defaults (lowest priority)

mod env_validator;
mod loader;
mod types;

pub use env_validator::{levenshtein, EnvVarValidator};
pub use loader::{
    default_user_config, load_layered, load_layered_with_env, load_with_warnings,
    with_env_overrides, ConfigError, ConfigSources, ConfigWarning, LoadedConfig,
    CONFIG_HOME_ENV, PROJECT_CONFIG_FILE,
};
pub use types::{
    CdnBackend, CdnConfig, ColorMode, Config, DeployConfig, OutputConfig, StoreBackend,
    StoreConfig, SyncConfig,
};
