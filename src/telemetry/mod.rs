//! Logging setup for the minirag binary
//!
//! Library code only emits `tracing` events; the subscriber is installed
//! once here. `RUST_LOG` wins over the `-q/-v/-vv` flags.

use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;

/// Build the event filter for a verbosity level
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()))
}

/// Install the global subscriber, writing to stderr
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_target(matches!(verbosity, Verbosity::VeryVerbose))
        .with_writer(std::io::stderr)
        .try_init();
}
