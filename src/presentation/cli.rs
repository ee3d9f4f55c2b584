//! CLI Argument Parsing
//!
//! Global flags (--config, --json, --color, --verbose) are inherited by all
//! subcommands. Every deploy flag is optional so the layered config can fill
//! in what the command line leaves out.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ColorMode;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

impl From<ColorWhen> for ColorMode {
    fn from(when: ColorWhen) -> Self {
        match when {
            ColorWhen::Auto => ColorMode::Auto,
            ColorWhen::Always => ColorMode::Always,
            ColorWhen::Never => ColorMode::Never,
        }
    }
}

/// edgepush - deploy a static site to object storage and invalidate its CDN
#[derive(Parser, Debug)]
#[command(name = "edgepush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./edgepush.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// NDJSON events on stdout, JSON log lines on stderr
    #[arg(long, global = true)]
    pub json: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorWhen>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync a build directory to its namespace and invalidate the CDN
    Deploy(DeployArgs),

    /// Scan and diff only (same as `deploy --dry-run`)
    Plan(TargetArgs),

    /// Poll the status of invalidation batches
    Status(StatusArgs),
}

/// Source, destination and diff settings shared by `deploy` and `plan`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArgs {
    /// Build output directory
    #[arg(short, long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Destination namespace (bucket, bucket/prefix or directory name)
    #[arg(short, long, value_name = "ID")]
    pub namespace: Option<String>,

    /// CDN distribution to invalidate
    #[arg(short, long, value_name = "ID")]
    pub distribution: Option<String>,

    /// Delete remote objects with no local counterpart
    #[arg(long)]
    pub prune: bool,

    /// Exclude paths matching a gitignore-style glob (repeatable)
    #[arg(short, long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Parallel transfers
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Dry run - print the plan without mutating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Wait for the invalidation to propagate
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    pub wait_timeout: u64,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusArgs {
    /// Distribution (defaults to the last deploy's)
    #[arg(short, long, value_name = "ID")]
    pub distribution: Option<String>,

    /// Batch to check (repeatable; defaults to the last deploy's batches)
    #[arg(short, long = "batch", value_name = "ID")]
    pub batches: Vec<String>,

    /// Poll until every batch completes
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    pub timeout: u64,
}
