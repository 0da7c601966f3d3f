// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! TeamCity service messages
//!
//! Every message is rendered on a single line:
//!
//! ```text
//! ##teamcity[testStarted timestamp='2017-01-02T04:05:06.789' pkg='pkg/name' name='TestA' captureStandardOutput='true']
//! ```
//!
//! Attribute values go through [`escape`], which uses `|` as the escape
//! character. [`unescape`] reverses it.

use std::fmt;

/// Message attached to a failure caused by a data race
pub const RACE_MESSAGE: &str = "Race detected!";

/// Message attached to a test that never reported a result
pub const PANIC_MESSAGE: &str = "Test ended in panic.";

/// A single service message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMessage<'a> {
    /// `testSuiteStarted`
    SuiteStarted {
        /// Suite name
        name: &'a str,
    },
    /// `testSuiteFinished`
    SuiteFinished {
        /// Suite name
        name: &'a str,
    },
    /// `testStarted`, with captured output following it
    TestStarted {
        /// Start timestamp
        timestamp: &'a str,
        /// Owning package
        package: &'a str,
        /// Test name
        name: &'a str,
    },
    /// `testIgnored`
    TestIgnored {
        /// End timestamp
        timestamp: &'a str,
        /// Test name
        name: &'a str,
    },
    /// `testFailed`
    TestFailed {
        /// End timestamp
        timestamp: &'a str,
        /// Test name
        name: &'a str,
        /// Short failure reason
        message: Option<&'a str>,
        /// Failure details
        details: &'a str,
    },
    /// `testFinished`
    TestFinished {
        /// End timestamp
        timestamp: &'a str,
        /// Test name
        name: &'a str,
        /// Duration in whole milliseconds
        duration_ms: i64,
    },
}

impl fmt::Display for ServiceMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SuiteStarted { name } => {
                write!(f, "##teamcity[testSuiteStarted name='{}']", Escaped(name))
            }
            Self::SuiteFinished { name } => {
                write!(f, "##teamcity[testSuiteFinished name='{}']", Escaped(name))
            }
            Self::TestStarted {
                timestamp,
                package,
                name,
            } => write!(
                f,
                "##teamcity[testStarted timestamp='{}' pkg='{}' name='{}' captureStandardOutput='true']",
                Escaped(timestamp),
                Escaped(package),
                Escaped(name)
            ),
            Self::TestIgnored { timestamp, name } => write!(
                f,
                "##teamcity[testIgnored timestamp='{}' name='{}']",
                Escaped(timestamp),
                Escaped(name)
            ),
            Self::TestFailed {
                timestamp,
                name,
                message,
                details,
            } => {
                write!(
                    f,
                    "##teamcity[testFailed timestamp='{}' name='{}'",
                    Escaped(timestamp),
                    Escaped(name)
                )?;
                if let Some(message) = message {
                    write!(f, " message='{}'", Escaped(message))?;
                }
                write!(f, " details='{}']", Escaped(details))
            }
            Self::TestFinished {
                timestamp,
                name,
                duration_ms,
            } => write!(
                f,
                "##teamcity[testFinished timestamp='{}' name='{}' duration='{}']",
                Escaped(timestamp),
                Escaped(name),
                duration_ms
            ),
        }
    }
}

/// Writes its contents escaped, without allocating
#[derive(Debug, Clone, Copy)]
pub struct Escaped<'a>(pub &'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(idx) = rest.find(['|', '\n', '\r', '\'', '[', ']']) {
            f.write_str(&rest[..idx])?;
            let replacement = match rest.as_bytes()[idx] {
                b'|' => "||",
                b'\n' => "|n",
                b'\r' => "|r",
                b'\'' => "|'",
                b'[' => "|[",
                _ => "|]",
            };
            f.write_str(replacement)?;
            rest = &rest[idx + 1..];
        }
        f.write_str(rest)
    }
}

/// Escape a value for use inside a service message attribute
///
/// Each special character is replaced exactly once, so the pipes this
/// introduces are never escaped again.
///
/// ```
/// use gotest_events::message::escape;
///
/// assert_eq!(escape("a|b\n['c']"), "a||b|n|[|'c|'|]");
/// ```
#[must_use]
pub fn escape(value: &str) -> String {
    Escaped(value).to_string()
}

/// Reverse [`escape`]
///
/// Unknown escape sequences and a trailing lone `|` are kept as they are.
#[must_use]
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '|' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(c @ ('|' | '\'' | '[' | ']')) => out.push(c),
            Some(other) => {
                out.push('|');
                out.push(other);
            }
            None => out.push('|'),
        }
    }
    out
}
