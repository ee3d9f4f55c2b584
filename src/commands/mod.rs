//! Command entry points
//!
//! Each command resolves the layered config, merges its flags on top, runs
//! the matching use case and returns the process exit code.

mod deploy;
mod plan;
mod status;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::application::DeployOptions;
use crate::config::{self, CdnBackend, Config, ConfigError, ConfigSources, ConfigWarning};
use crate::presentation::cli::{Cli, Commands, TargetArgs};
use crate::presentation::output::{write_event, TextRenderer};
use crate::presentation::terminal::{detect_capabilities, resolve_color};

pub use deploy::run_deploy;
pub use plan::run_plan;
pub use status::run_status;

/// Exit code for runs that never got going (bad config, unreadable state)
pub const EXIT_FATAL: i32 = 2;

/// Everything a command needs besides its own flags
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Working directory; relative paths and run state resolve against it
    pub cwd: PathBuf,
    pub config: Config,
    pub json: bool,
    pub verbose: u8,
    pub renderer: TextRenderer,
}

impl CommandContext {
    /// Resolve config for `cli` as seen from `cwd`.
    pub fn load(cli: &Cli, cwd: &Path) -> Result<Self, ConfigError> {
        let sources = ConfigSources::discover(cwd, cli.config.clone());
        let loaded = config::load_layered(&sources)?;
        let ctx = Self::from_config(cli, cwd, loaded.config);
        ctx.report_config_warnings(&loaded.warnings);
        Ok(ctx)
    }

    pub fn from_config(cli: &Cli, cwd: &Path, config: Config) -> Self {
        let caps = detect_capabilities();
        let color = !cli.json
            && resolve_color(cli.color.map(Into::into), config.output.color, &caps);
        Self {
            cwd: cwd.to_path_buf(),
            renderer: TextRenderer::new(color, caps.supports_unicode, cli.verbose),
            json: cli.json,
            verbose: cli.verbose,
            config,
        }
    }

    fn report_config_warnings(&self, warnings: &[ConfigWarning]) {
        for warning in warnings {
            tracing::warn!(%warning, "config");
        }
        if warnings.is_empty() {
            return;
        }
        if self.json {
            let mut out = std::io::stdout().lock();
            for warning in warnings {
                let _ = write_event(
                    &mut out,
                    &serde_json::json!({
                        "event": "warning",
                        "command": "config",
                        "message": warning.to_string(),
                    }),
                );
            }
        } else {
            eprint!("{}", self.renderer.render_config_warnings(warnings));
        }
    }

    /// Write text to stdout, or nothing in JSON mode.
    pub fn print(&self, text: &str) {
        if self.json {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    pub fn emit(&self, event: &serde_json::Value) {
        if !self.json {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = write_event(&mut out, event);
        let _ = out.flush();
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Merge `args` over the config into deploy options.
    ///
    /// Flags win over config; `--prune` can only switch pruning on and
    /// `--exclude` globs add to the configured ones.
    pub fn deploy_options(
        &self,
        args: &TargetArgs,
        dry_run: bool,
    ) -> Result<DeployOptions, ConfigError> {
        let deploy = &self.config.deploy;

        let source = args
            .source
            .clone()
            .or_else(|| deploy.source.clone())
            .ok_or_else(|| ConfigError::Missing("deploy.source (--source)".to_string()))?;
        let namespace = args
            .namespace
            .clone()
            .or_else(|| deploy.namespace.clone())
            .ok_or_else(|| ConfigError::Missing("deploy.namespace (--namespace)".to_string()))?;
        let distribution = args
            .distribution
            .clone()
            .or_else(|| deploy.distribution.clone());
        let distribution = match distribution {
            Some(distribution) => distribution,
            None if self.config.cdn.backend == CdnBackend::None => String::new(),
            None => {
                return Err(ConfigError::Missing(
                    "deploy.distribution (--distribution)".to_string(),
                ))
            }
        };

        let mut exclude = deploy.exclude.clone();
        exclude.extend(args.exclude.iter().cloned());

        let mut sync = self.config.sync_options();
        if let Some(concurrency) = args.concurrency {
            sync.concurrency = concurrency as usize;
        }

        Ok(DeployOptions::new(self.resolve_path(&source), namespace, distribution)
            .with_prune(args.prune || deploy.prune)
            .with_exclude(exclude)
            .with_dry_run(dry_run || deploy.dry_run)
            .with_invalidation(self.config.invalidation_policy()?)
            .with_sync(sync)
            .with_run_deadline(self.config.run_deadline()))
    }
}

/// Run the parsed command line.
pub async fn run(cli: Cli, cwd: PathBuf, cancel: CancellationToken) -> Result<i32> {
    let ctx = CommandContext::load(&cli, &cwd)?;
    match &cli.command {
        Commands::Deploy(args) => run_deploy(&ctx, args, &cancel).await,
        Commands::Plan(args) => run_plan(&ctx, args, &cancel).await,
        Commands::Status(args) => run_status(&ctx, args, &cancel).await,
    }
}
