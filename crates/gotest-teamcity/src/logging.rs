//! Tracing subscriber setup
//!
//! Service messages own stdout, so every log line goes to stderr.

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` directives plus a global `level`
#[must_use]
pub fn env_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed; the
/// existing one stays in place.
pub fn init(level: tracing::Level) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .try_init()
}
