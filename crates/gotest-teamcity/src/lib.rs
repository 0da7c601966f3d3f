//! gotest-teamcity library
//!
//! This module exports the command-line plumbing of gotest-teamcity for use
//! in integration tests. The conversion itself lives in `gotest-events`.

pub mod config;
pub mod logging;

use std::io::{BufRead, Write};

use anyhow::Context;
use gotest_events::{Clock, RunSummary, convert};
use tracing::{debug, info};

use crate::config::Config;

/// Convert `input` to service messages on `output`
///
/// # Errors
///
/// Returns an error if reading the log or writing messages fails.
pub fn run<R, W, C>(config: &Config, input: R, output: W, clock: C) -> anyhow::Result<RunSummary>
where
    R: BufRead,
    W: Write,
    C: Clock,
{
    let options = config.engine_options();
    debug!(?options, "starting conversion");

    let summary =
        convert(input, output, clock, options).context("failed to convert test output")?;

    info!(
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        panicked = summary.panicked,
        races = summary.races,
        packages = summary.packages.len(),
        "conversion finished"
    );
    Ok(summary)
}

/// Write `summary` as a single JSON line
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_summary<W: Write>(summary: &RunSummary, mut out: W) -> anyhow::Result<()> {
    let json = serde_json::to_string(summary).context("failed to serialize run summary")?;
    writeln!(out, "{json}").context("failed to write run summary")?;
    Ok(())
}
