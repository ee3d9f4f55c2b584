//! Configuration loading
//!
//! Files are merged key by key (user config first, project config on top),
//! then `EDGEPUSH_*` variables are applied. CLI flags are applied last by
//! the command layer.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::env_validator::{closest, EnvVarValidator};
use super::types::{CdnBackend, ColorMode, Config, StoreBackend};

/// Project config file, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "edgepush.toml";

/// Overrides the user config directory (tests, sandboxed CI)
pub const CONFIG_HOME_ENV: &str = "EDGEPUSH_CONFIG_HOME";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("{0}")]
    Unsupported(String),
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Key not recognised in a config file
    UnknownKey {
        key: String,
        file: PathBuf,
        line: Option<usize>,
        suggestion: Option<String>,
    },
    /// Environment override with an unusable value (ignored)
    InvalidEnv {
        var: String,
        value: String,
        suggestion: Option<String>,
        valid_values: Vec<String>,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnknownKey {
                key,
                file,
                line,
                suggestion,
            } => {
                write!(f, "unknown config key '{}' in {}", key, file.display())?;
                if let Some(line) = line {
                    write!(f, ":{}", line)?;
                }
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean '{}'?)", suggestion)?;
                }
                Ok(())
            }
            ConfigWarning::InvalidEnv {
                var,
                value,
                suggestion,
                valid_values,
            } => {
                write!(f, "ignoring {}='{}'", var, value)?;
                if let Some(suggestion) = suggestion {
                    write!(f, ", did you mean '{}'?", suggestion)?;
                }
                if !valid_values.is_empty() {
                    write!(f, " (valid values: {})", valid_values.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Where to look for config files
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// `--config <path>`; must exist when given
    pub explicit: Option<PathBuf>,
    /// Directory searched for `edgepush.toml`
    pub project_dir: Option<PathBuf>,
    /// User config file; `None` skips the user layer
    pub user_file: Option<PathBuf>,
}

impl ConfigSources {
    /// Standard locations relative to `cwd`.
    pub fn discover(cwd: &Path, explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            project_dir: Some(cwd.to_path_buf()),
            user_file: default_user_config(),
        }
    }

    fn project_file(&self) -> Option<PathBuf> {
        match &self.explicit {
            Some(path) => Some(path.clone()),
            None => self
                .project_dir
                .as_ref()
                .map(|dir| dir.join(PROJECT_CONFIG_FILE)),
        }
    }
}

/// Fully resolved configuration and everything worth telling the user
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
    /// Files that contributed, lowest priority first
    pub files: Vec<PathBuf>,
}

/// User config file (`<config_dir>/edgepush/config.toml`).
pub fn default_user_config() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(CONFIG_HOME_ENV) {
        return Some(PathBuf::from(home).join("config.toml"));
    }
    dirs::config_dir().map(|dir| dir.join("edgepush").join("config.toml"))
}

/// Load a single file and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let table = read_table(path)?;
    let warnings = unknown_keys(path, &table)?;
    let config = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok((config, warnings))
}

/// Load user and project layers plus environment overrides.
pub fn load_layered(sources: &ConfigSources) -> Result<LoadedConfig, ConfigError> {
    load_layered_with_env(sources, |name| std::env::var(name).ok())
}

/// [`load_layered`] with an injectable environment.
pub fn load_layered_with_env<F>(sources: &ConfigSources, env: F) -> Result<LoadedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged = toml::Table::new();
    let mut warnings = Vec::new();
    let mut files = Vec::new();

    if let Some(user) = &sources.user_file {
        if user.is_file() {
            let table = read_table(user)?;
            warnings.extend(unknown_keys(user, &table)?);
            merge(&mut merged, table);
            files.push(user.clone());
        }
    }

    if let Some(project) = sources.project_file() {
        if project.is_file() {
            let table = read_table(&project)?;
            warnings.extend(unknown_keys(&project, &table)?);
            merge(&mut merged, table);
            files.push(project);
        } else if sources.explicit.is_some() {
            return Err(ConfigError::NotFound(project));
        }
    }

    let origin = files.last().cloned().unwrap_or_default();
    let config: Config = toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: origin,
            message: e.to_string(),
        })?;

    let (config, env_warnings) = with_env_overrides(config, env);
    warnings.extend(env_warnings);

    for file in &files {
        tracing::debug!(file = %file.display(), "loaded config");
    }

    Ok(LoadedConfig {
        config,
        warnings,
        files,
    })
}

/// Apply environment variable overrides (`EDGEPUSH_*` prefix).
pub fn with_env_overrides<F>(mut config: Config, env: F) -> (Config, Vec<ConfigWarning>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    if let Some(source) = env("EDGEPUSH_SOURCE") {
        config.deploy.source = Some(PathBuf::from(source));
    }
    if let Some(namespace) = env("EDGEPUSH_NAMESPACE") {
        config.deploy.namespace = Some(namespace);
    }
    if let Some(distribution) = env("EDGEPUSH_DISTRIBUTION") {
        config.deploy.distribution = Some(distribution);
    }

    if let Some(raw) = env("EDGEPUSH_PRUNE") {
        match EnvVarValidator::new("EDGEPUSH_PRUNE", &["true", "false"]).parse(&raw, parse_bool) {
            Ok(prune) => config.deploy.prune = prune,
            Err(w) => warnings.push(w),
        }
    }

    if let Some(raw) = env("EDGEPUSH_CONCURRENCY") {
        match EnvVarValidator::new("EDGEPUSH_CONCURRENCY", &[])
            .parse(&raw, |s| s.parse::<usize>().ok().filter(|n| *n > 0))
        {
            Ok(n) => config.sync.concurrency = n,
            Err(w) => warnings.push(w),
        }
    }

    if let Some(raw) = env("EDGEPUSH_RUN_DEADLINE_SECS") {
        match EnvVarValidator::new("EDGEPUSH_RUN_DEADLINE_SECS", &[])
            .parse(&raw, |s| s.parse::<u64>().ok())
        {
            Ok(secs) => config.sync.run_deadline_secs = Some(secs),
            Err(w) => warnings.push(w),
        }
    }

    if let Some(raw) = env("EDGEPUSH_STORE_BACKEND") {
        match EnvVarValidator::new("EDGEPUSH_STORE_BACKEND", StoreBackend::NAMES)
            .parse(&raw, StoreBackend::parse)
        {
            Ok(backend) => config.store.backend = backend,
            Err(w) => warnings.push(w),
        }
    }
    if let Some(root) = env("EDGEPUSH_STORE_ROOT") {
        config.store.root = Some(PathBuf::from(root));
    }

    if let Some(raw) = env("EDGEPUSH_CDN_BACKEND") {
        match EnvVarValidator::new("EDGEPUSH_CDN_BACKEND", CdnBackend::NAMES)
            .parse(&raw, CdnBackend::parse)
        {
            Ok(backend) => config.cdn.backend = backend,
            Err(w) => warnings.push(w),
        }
    }
    if let Some(dir) = env("EDGEPUSH_CDN_JOURNAL_DIR") {
        config.cdn.journal_dir = Some(PathBuf::from(dir));
    }

    if let Some(raw) = env("EDGEPUSH_COLOR") {
        match EnvVarValidator::new("EDGEPUSH_COLOR", ColorMode::NAMES).parse(&raw, ColorMode::parse)
        {
            Ok(color) => config.output.color = color,
            Err(w) => warnings.push(w),
        }
    }

    (config, warnings)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    content.parse::<toml::Table>().map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Unknown keys in one file, reported with line numbers.
fn unknown_keys(path: &Path, table: &toml::Table) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let _: Config = serde_ignored::deserialize(toml::Value::Table(table.clone()), |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let original = fs::read_to_string(path).unwrap_or_default();
    Ok(unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning::UnknownKey {
                line: find_line_number(&original, &key),
                suggestion: closest(&key, KNOWN_KEYS),
                key,
                file: path.to_path_buf(),
            }
        })
        .collect())
}

/// Deep-merge `overlay` into `base`; overlay wins on conflicts.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

const KNOWN_KEYS: &[&str] = &[
    "deploy",
    "source",
    "namespace",
    "distribution",
    "prune",
    "exclude",
    "root_document",
    "wildcard_threshold",
    "dry_run",
    "sync",
    "concurrency",
    "max_attempts",
    "initial_backoff_ms",
    "max_backoff_ms",
    "call_timeout_secs",
    "run_deadline_secs",
    "verify_uploads",
    "store",
    "backend",
    "root",
    "region",
    "endpoint",
    "allow_http",
    "page_size",
    "cdn",
    "journal_dir",
    "max_paths_per_request",
    "settle_secs",
    "poll_interval_ms",
    "output",
    "color",
];
