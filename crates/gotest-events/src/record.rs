// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Test record types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Separator between a subtest name and its parent
pub const NAME_SEPARATOR: char = '/';

/// Result reported by a `--- PASS|FAIL|SKIP` marker
///
/// A record whose outcome is still [`Outcome::Unset`] when it is emitted
/// never reported a result; it is treated as having panicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// No end marker seen yet
    #[default]
    Unset,
    /// Test passed
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

impl Outcome {
    /// Parse the keyword used in an end marker
    #[must_use]
    pub fn from_marker(keyword: &str) -> Option<Self> {
        match keyword {
            "PASS" => Some(Self::Pass),
            "FAIL" => Some(Self::Fail),
            "SKIP" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Whether an end marker has been seen
    #[must_use]
    pub fn is_set(self) -> bool {
        self != Self::Unset
    }
}

/// How a finalized record is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Reported as ignored, with no finish message
    Ignored,
    /// Data race detected while the test ran
    Race,
    /// Test reported a failure
    Failed,
    /// Test passed
    Passed,
    /// Test never reported a result
    Panicked,
}

/// A single test reconstructed from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    /// Full test name, e.g. `TestOuter/inner_case`
    pub name: String,
    /// When the start marker (or the first marker naming the test) was seen
    pub start: NaiveDateTime,
    /// When the record was finalized
    pub end: Option<NaiveDateTime>,
    /// Output captured while the test was open, verbatim
    pub output: String,
    /// Indented lines following the end marker, prefix stripped
    pub details: Vec<String>,
    /// Reported outcome
    pub outcome: Outcome,
    /// Reported duration in milliseconds
    pub duration_ms: i64,
    /// A `WARNING: DATA RACE` block appeared while the test was open
    pub race: bool,
    /// Another test was started underneath this one
    pub suite: bool,
    /// Package attached while the test was still open
    pub package: Option<String>,
    pub(crate) seq: u64,
}

impl TestRecord {
    /// Create an open record
    #[must_use]
    pub fn new(name: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            start,
            end: None,
            output: String::new(),
            details: Vec::new(),
            outcome: Outcome::Unset,
            duration_ms: 0,
            race: false,
            suite: false,
            package: None,
            seq: 0,
        }
    }

    /// The end marker has been seen but the record is not yet staged
    #[must_use]
    pub fn is_pending_close(&self) -> bool {
        self.outcome.is_set()
    }

    /// Decide which failure message, if any, this record produces
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        match self.outcome {
            Outcome::Skip => Verdict::Ignored,
            _ if self.race => Verdict::Race,
            Outcome::Fail => Verdict::Failed,
            Outcome::Pass => Verdict::Passed,
            Outcome::Unset => Verdict::Panicked,
        }
    }

    /// Detail lines joined into a single block
    #[must_use]
    pub fn details_text(&self) -> String {
        self.details.join("\n")
    }
}

/// An entry waiting for its package to be known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    /// A line outside any test, replayed verbatim
    Raw(String),
    /// Opening bracket of an inferred suite
    SuiteStarted(String),
    /// Closing bracket of an inferred suite
    SuiteFinished(String),
    /// A finalized test
    Test(TestRecord),
}

/// Immediate parent of a hierarchical test name
///
/// ```
/// use gotest_events::record::parent_name;
///
/// assert_eq!(parent_name("TestA/sub/case"), Some("TestA/sub"));
/// assert_eq!(parent_name("TestA"), None);
/// ```
#[must_use]
pub fn parent_name(name: &str) -> Option<&str> {
    name.rfind(NAME_SEPARATOR)
        .map(|idx| &name[..idx])
        .filter(|parent| !parent.is_empty())
}

/// Every proper ancestor of `name`, nearest first
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_name(name), |n| parent_name(n))
}

/// `candidate` is `name` itself or one of its ancestors
#[must_use]
pub fn is_ancestor_or_self(candidate: &str, name: &str) -> bool {
    match name.strip_prefix(candidate) {
        Some(rest) => rest.is_empty() || rest.starts_with(NAME_SEPARATOR),
        None => false,
    }
}
