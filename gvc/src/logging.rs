//! Diagnostic logging for the CLI.
//!
//! Library code emits `tracing` events; this installs the subscriber that
//! prints them. Logs always go to stderr so stdout stays parseable in
//! `--json` mode.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive (e.g. `gvc_core=debug`).
pub const LOG_ENV: &str = "GVC_LOG";

/// Filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Build the filter: `GVC_LOG` wins over the verbosity flag.
fn build_env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
