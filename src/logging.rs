//! Logging setup for the binary
//!
//! Logs go to stderr so stdout carries nothing but the balances CSV.
//! `RUST_LOG` takes precedence over the level passed on the command line.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber
///
/// Calling it more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
