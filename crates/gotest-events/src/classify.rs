// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Line classification for `go test -v` output
//!
//! [`classify`] looks at one raw line (terminator included) and reports which
//! marker it carries. It keeps no state: deciding whether plain text is a
//! detail line, captured output or pass-through is up to the engine, which
//! knows which test is open.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::EventsError;
use crate::record::Outcome;

// Whitespace is ASCII only, as `go test` writes it: `(?-u:\s)` and its
// complement `[^\t\n\x0C\r ]`.
static RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^=== RUN(?-u:\s)+([a-zA-Z_][^\t\n\x0C\r ]*)").expect("static regex is valid")
});

static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?-u:\s)*)--- (PASS|SKIP|FAIL):(?-u:\s)+([a-zA-Z_][^\t\n\x0C\r ]*) \((-?[.0-9s]+)\)",
    )
    .expect("static regex is valid")
});

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:ok|FAIL)(?-u:\s)+([a-z][^\t\n\x0C\r ]*)").expect("static regex is valid")
});

/// Bare `PASS` / `FAIL` lines, or lines opening with a run trailer phrase
static TERMINATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:PASS|FAIL)\r?\n?$|exit status|Found [0-9]+ data race|coverage:)")
        .expect("static regex is valid")
});

const RACE_PREFIX: &str = "WARNING: DATA RACE";

/// Detail-line prefix in effect before any end marker has been seen
pub const DEFAULT_DETAIL_PREFIX: &str = "\t";

/// What a single line of test output means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `=== RUN   TestName`
    Start {
        /// Test name
        name: &'a str,
    },
    /// `--- PASS: TestName (0.01s)`, possibly indented
    End {
        /// Whitespace before `---`
        indent: &'a str,
        /// Reported outcome
        outcome: Outcome,
        /// Test name
        name: &'a str,
        /// Reported duration in milliseconds
        duration_ms: i64,
    },
    /// `ok  	pkg/path	0.012s` or `FAIL	pkg/path	0.012s`
    Package {
        /// Package import path
        path: &'a str,
    },
    /// `PASS`, `FAIL`, `exit status 1`, `Found 2 data race(s)`, `coverage: ...`
    Terminator,
    /// `WARNING: DATA RACE`
    Race,
    /// Anything else
    Text,
}

impl Line<'_> {
    /// Markers that close a test waiting for its detail lines
    #[must_use]
    pub fn closes_pending(&self) -> bool {
        matches!(
            self,
            Self::Start { .. } | Self::End { .. } | Self::Package { .. }
        )
    }
}

/// Classify one line of `go test -v` output
///
/// Markers are checked in priority order: start, end, package summary, run
/// terminator, data race.
///
/// ```
/// use gotest_events::classify::{Line, classify};
///
/// assert_eq!(classify("=== RUN   TestA\n"), Line::Start { name: "TestA" });
/// assert_eq!(classify("ok  \tpkg/name\t0.012s\n"), Line::Package { path: "pkg/name" });
/// assert_eq!(classify("hello\n"), Line::Text);
/// ```
#[must_use]
pub fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = RUN_RE.captures(line) {
        if let Some(name) = caps.get(1) {
            return Line::Start {
                name: name.as_str(),
            };
        }
    }

    if let Some(caps) = END_RE.captures(line) {
        if let (Some(indent), Some(keyword), Some(name), Some(duration)) =
            (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
        {
            if let Some(outcome) = Outcome::from_marker(keyword.as_str()) {
                let duration_ms = parse_duration_ms(duration.as_str()).unwrap_or_else(|err| {
                    debug!(%err, "treating unparseable duration as zero");
                    0
                });
                return Line::End {
                    indent: indent.as_str(),
                    outcome,
                    name: name.as_str(),
                    duration_ms,
                };
            }
        }
    }

    if let Some(caps) = PACKAGE_RE.captures(line) {
        if let Some(path) = caps.get(1) {
            return Line::Package {
                path: path.as_str(),
            };
        }
    }

    if TERMINATOR_RE.is_match(line) {
        return Line::Terminator;
    }

    if line.starts_with(RACE_PREFIX) {
        return Line::Race;
    }

    Line::Text
}

/// Prefix carried by detail lines that follow an end marker with `indent`
#[must_use]
pub fn detail_prefix(indent: &str) -> String {
    format!("{indent}{DEFAULT_DETAIL_PREFIX}")
}

/// Strip `prefix` and one trailing newline from a detail line
///
/// Returns `None` if the line does not carry the prefix.
#[must_use]
pub fn strip_detail<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_prefix(prefix)
}

/// Parse a duration as printed by `go test`, e.g. `0.01s` or `-0.00s`
///
/// Only seconds are accepted, optionally as several segments (`1s0.5s`).
/// Fractions are parsed exactly to nanoseconds and the result is truncated
/// toward zero to whole milliseconds.
///
/// # Errors
///
/// Returns `EventsError::InvalidDuration` if the literal is malformed or
/// overflows.
pub fn parse_duration_ms(literal: &str) -> Result<i64, EventsError> {
    let invalid = || EventsError::InvalidDuration {
        value: literal.to_string(),
    };

    let (negative, mut rest) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: i64 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after) = rest.split_at(int_len);
        let (frac_part, after) = match after.strip_prefix('.') {
            Some(after) => {
                let frac_len = after.bytes().take_while(u8::is_ascii_digit).count();
                after.split_at(frac_len)
            }
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        rest = after.strip_prefix('s').ok_or_else(invalid)?;

        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut frac_nanos: i64 = 0;
        let mut scale: i64 = 100_000_000;
        for digit in frac_part.bytes().take(9) {
            frac_nanos += i64::from(digit - b'0') * scale;
            scale /= 10;
        }

        total_nanos = whole
            .checked_mul(1_000_000_000)
            .and_then(|n| n.checked_add(frac_nanos))
            .and_then(|n| total_nanos.checked_add(n))
            .ok_or_else(invalid)?;
    }

    let millis = total_nanos / 1_000_000;
    Ok(if negative { -millis } else { millis })
}
