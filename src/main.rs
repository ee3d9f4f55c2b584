//! edgepush CLI
//!
//! Usage: edgepush <COMMAND>
//!
//! Commands:
//!   deploy  Sync a build directory and invalidate the CDN
//!   plan    Scan and diff only
//!   status  Poll invalidation batches

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use is_terminal::IsTerminal;
use tokio_util::sync::CancellationToken;

use edgepush::commands::{self, EXIT_FATAL};
use edgepush::logging::{self, LogSettings};
use edgepush::presentation::Cli;

/// Exit code when a second Ctrl+C abandons in-flight transfers
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let cli = Cli::parse();
    logging::init(LogSettings {
        verbose: cli.verbose,
        json: cli.json,
        color: std::io::stderr().is_terminal(),
    });

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone());

    let code = match run(cli, cancel) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::run(cli, cwd, cancel))
}

/// First Ctrl+C drains in-flight work; the second exits immediately.
fn install_interrupt_handler(cancel: CancellationToken) {
    let interrupted = Arc::new(AtomicBool::new(false));
    let result = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("Interrupted, finishing in-flight transfers (Ctrl+C again to abort)");
        cancel.cancel();
    });
    if let Err(err) = result {
        tracing::warn!(error = %err, "could not install Ctrl+C handler");
    }
}
