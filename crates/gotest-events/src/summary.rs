// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Totals for a converted run

use serde::{Deserialize, Serialize};

use crate::record::Verdict;

/// What the engine reported over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests reported as passed
    pub passed: usize,
    /// Tests reported as failed, including data races
    pub failed: usize,
    /// Tests reported as ignored
    pub skipped: usize,
    /// Tests that never reported a result
    pub panicked: usize,
    /// Failures caused by a data race
    pub races: usize,
    /// Package names seen in summary lines, in order
    pub packages: Vec<String>,
    /// Lines replayed outside any test
    pub passthrough_lines: usize,
}

impl RunSummary {
    /// Create an empty summary
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of tests reported
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.panicked
    }

    /// No test failed or panicked
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.panicked == 0
    }

    pub(crate) fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Ignored => self.skipped += 1,
            Verdict::Race => {
                self.failed += 1;
                self.races += 1;
            }
            Verdict::Failed => self.failed += 1,
            Verdict::Passed => self.passed += 1,
            Verdict::Panicked => self.panicked += 1,
        }
    }

    pub(crate) fn record_package(&mut self, package: &str) {
        if !self.packages.iter().any(|p| p == package) {
            self.packages.push(package.to_string());
        }
    }
}
