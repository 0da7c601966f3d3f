//! Configuration for the gotest-teamcity converter
//!
//! This module provides the command-line configuration and maps it onto the
//! plain options the conversion engine understands.

use clap::Parser;
use gotest_events::EngineOptions;

/// Convert `go test -v` output on stdin into TeamCity service messages on stdout
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gotest-teamcity")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Prefix added to every reported test name
    ///
    /// Useful when the same tests run in several configurations within one
    /// build, e.g. `--name linux-race`. The prefix and the test name are
    /// separated by a space.
    #[arg(short, long, env = "GOTEST_TEAMCITY_NAME")]
    pub name: Option<String>,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr; stdout only carries service messages.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Print a JSON summary of the run to stderr once the input ends
    #[arg(long, default_value = "false")]
    pub summary: bool,
}

impl Config {
    /// Engine options derived from the command line
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        match self.name.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => EngineOptions::with_name_prefix(prefix),
            _ => EngineOptions::default(),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MultilineName` if the name prefix contains a
    /// line break, which would split service messages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref name) = self.name {
            if name.contains(['\n', '\r']) {
                return Err(ConfigError::MultilineName(name.clone()));
            }
        }
        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Name prefix spans several lines
    #[error("Test name prefix must be a single line: {0:?}")]
    MultilineName(String),
}
