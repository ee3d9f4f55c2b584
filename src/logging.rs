//! Logging initialisation
//!
//! Logs go to stderr so stdout stays free for plan output and NDJSON events.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "EDGEPUSH_LOG";

/// Logging settings derived from CLI flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Number of `-v` flags
    pub verbose: u8,
    /// Emit log lines as JSON
    pub json: bool,
    pub color: bool,
}

/// Default directive for a verbosity count.
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "edgepush=warn",
        1 => "edgepush=info",
        2 => "edgepush=debug",
        _ => "edgepush=trace",
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(settings: LogSettings) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(settings.verbose)));

    let subscriber = tracing_subscriber::registry().with(filter);
    let result = if settings.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(settings.color)
                    .with_target(false),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(verbose = settings.verbose, json = settings.json, "logging initialised");
    }
}
