// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Error types for gotest-events

use thiserror::Error;

/// Errors that can occur while converting test output
///
/// Malformed log text is never an error; only the underlying reader and
/// writer can fail.
#[derive(Debug, Error)]
pub enum EventsError {
    /// Error reading the test log or writing service messages
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A duration literal from an end marker could not be parsed
    #[error("Invalid duration: {value}")]
    InvalidDuration {
        /// The literal as it appeared in the log
        value: String,
    },
}
