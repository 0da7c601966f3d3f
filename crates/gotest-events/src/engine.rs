// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Event reconstruction
//!
//! The [`Engine`] consumes `go test -v` output one line at a time and writes
//! TeamCity service messages. A test is only written once the next
//! structural marker proves that no more detail lines follow, and only once
//! the package summary line names the package it belongs to. Anything still
//! open when the input ends is flushed by [`Engine::finish`].
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use gotest_events::{Engine, EngineOptions, FixedClock};
//!
//! let at = NaiveDate::from_ymd_opt(2017, 1, 2)
//!     .and_then(|d| d.and_hms_milli_opt(4, 5, 6, 789))
//!     .unwrap();
//! let mut out = Vec::new();
//! let mut engine = Engine::new(&mut out, FixedClock::new(at), EngineOptions::default());
//! engine.process_line("=== RUN   TestA\n").unwrap();
//! engine.process_line("--- PASS: TestA (0.01s)\n").unwrap();
//! engine.process_line("ok  \tpkg/name\t0.012s\n").unwrap();
//! let summary = engine.finish().unwrap();
//!
//! assert_eq!(summary.passed, 1);
//! let out = String::from_utf8(out).unwrap();
//! assert!(out.ends_with("ok  \tpkg/name\t0.012s\n"));
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::mem;

use tracing::{debug, trace};

use crate::classify::{DEFAULT_DETAIL_PREFIX, Line, classify, detail_prefix, strip_detail};
use crate::clock::{Clock, format_timestamp};
use crate::error::EventsError;
use crate::message::{PANIC_MESSAGE, RACE_MESSAGE, ServiceMessage};
use crate::record::{Outcome, Staged, TestRecord, Verdict, ancestors, is_ancestor_or_self};
use crate::summary::RunSummary;

/// Package reported for tests whose package line never arrived
pub const UNKNOWN_PACKAGE: &str = "unknown";

/// Package label used when closing suites at the end of input
pub const IRRELEVANT_PACKAGE: &str = "irrelevant";

/// Options supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Prepended, followed by a space, to every reported test name
    pub name_prefix: String,
}

impl EngineOptions {
    /// Options with a test name prefix
    #[must_use]
    pub fn with_name_prefix(prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: prefix.into(),
        }
    }
}

/// Streaming converter from `go test -v` output to service messages
pub struct Engine<W, C> {
    writer: W,
    clock: C,
    options: EngineOptions,
    /// Tests that have been named but not yet staged
    open: HashMap<String, TestRecord>,
    /// The test that plain text is attributed to
    current: Option<String>,
    /// Suites that are open in the output, outermost first
    suites: Vec<String>,
    /// Entries waiting for a package line
    staged: Vec<Staged>,
    /// Run terminator lines, replayed after everything else
    trailer: String,
    detail_prefix: String,
    next_seq: u64,
    summary: RunSummary,
}

impl<W: Write, C: Clock> Engine<W, C> {
    /// Create an engine writing to `writer`
    pub fn new(writer: W, clock: C, options: EngineOptions) -> Self {
        Self {
            writer,
            clock,
            options,
            open: HashMap::new(),
            current: None,
            suites: Vec::new(),
            staged: Vec::new(),
            trailer: String::new(),
            detail_prefix: DEFAULT_DETAIL_PREFIX.to_string(),
            next_seq: 0,
            summary: RunSummary::empty(),
        }
    }

    /// Feed every line of `reader` through the engine
    ///
    /// Invalid UTF-8 is replaced rather than rejected. A final line without
    /// a terminator is processed like any other.
    ///
    /// # Errors
    ///
    /// Returns `EventsError::Io` if reading or writing fails.
    pub fn process_reader<R: BufRead>(&mut self, mut reader: R) -> Result<(), EventsError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            self.process_line(&line)?;
        }
    }

    /// Process one line, including its terminator
    ///
    /// # Errors
    ///
    /// Returns `EventsError::Io` if flushing a package to the writer fails.
    pub fn process_line(&mut self, line: &str) -> Result<(), EventsError> {
        let kind = classify(line);
        trace!(?kind, "classified line");

        if kind.closes_pending() {
            self.close_pending();
        }

        match kind {
            Line::Start { name } => {
                self.open_test(name);
            }
            Line::End {
                indent,
                outcome,
                name,
                duration_ms,
            } => self.end_test(indent, outcome, name, duration_ms),
            Line::Package { path } => self.finish_package(path, line)?,
            Line::Terminator => self.trailer.push_str(line),
            Line::Race => match self.current_mut() {
                Some(record) => record.race = true,
                None => self.text(line),
            },
            Line::Text => self.text(line),
        }
        Ok(())
    }

    /// Flush all remaining state and write the run terminator lines
    ///
    /// # Errors
    ///
    /// Returns `EventsError::Io` if writing fails.
    pub fn finish(mut self) -> Result<RunSummary, EventsError> {
        if let Some(record) = self.current.take().and_then(|name| self.open.remove(&name)) {
            if !record.is_pending_close() {
                debug!(name = %record.name, "test still running at end of input");
            }
            self.stage_record(record);
        }
        self.flush_staged(UNKNOWN_PACKAGE)?;
        self.close_all_suites()?;

        let mut orphans: Vec<TestRecord> = self.open.drain().map(|(_, record)| record).collect();
        orphans.sort_by_key(|record| record.seq);
        for orphan in orphans {
            debug!(name = %orphan.name, "flushing test that never finished");
            self.stage_record(orphan);
        }
        self.flush_staged(UNKNOWN_PACKAGE)?;
        self.close_all_suites()?;

        self.writer.write_all(self.trailer.as_bytes())?;
        self.writer.flush()?;
        Ok(self.summary)
    }

    fn current_mut(&mut self) -> Option<&mut TestRecord> {
        let name = self.current.as_deref()?;
        self.open.get_mut(name)
    }

    fn open_test(&mut self, name: &str) {
        if self.open.contains_key(name) {
            debug!(name, "test started again before finishing, replacing it");
        }
        let mut record = TestRecord::new(name, self.clock.now());
        record.seq = self.next_seq;
        self.next_seq += 1;
        self.open.insert(name.to_string(), record);

        for ancestor in ancestors(name) {
            if let Some(parent) = self.open.get_mut(ancestor) {
                parent.suite = true;
            }
        }
        self.current = Some(name.to_string());
    }

    fn end_test(&mut self, indent: &str, outcome: Outcome, name: &str, duration_ms: i64) {
        if !self.open.contains_key(name) {
            debug!(name, "end marker without start marker");
            self.open_test(name);
        }
        self.detail_prefix = detail_prefix(indent);
        if let Some(record) = self.open.get_mut(name) {
            record.outcome = outcome;
            record.duration_ms = duration_ms;
        }
        self.current = Some(name.to_string());
    }

    fn text(&mut self, line: &str) {
        let prefix = &self.detail_prefix;
        let current = self
            .current
            .as_deref()
            .and_then(|name| self.open.get_mut(name));
        match current {
            Some(record) => {
                let detail = record
                    .is_pending_close()
                    .then(|| strip_detail(line, prefix))
                    .flatten();
                match detail {
                    Some(detail) => record.details.push(detail.to_string()),
                    None => record.output.push_str(line),
                }
            }
            None => {
                self.staged.push(Staged::Raw(line.to_string()));
                self.summary.passthrough_lines += 1;
            }
        }
    }

    fn finish_package(&mut self, package: &str, line: &str) -> Result<(), EventsError> {
        self.flush_staged(package)?;
        for record in self.open.values_mut() {
            record.package = Some(package.to_string());
        }
        self.summary.record_package(package);
        self.trailer.push_str(line);
        Ok(())
    }

    /// Stage the current test if its end marker has been seen
    fn close_pending(&mut self) {
        let pending = self
            .current_mut()
            .is_some_and(|record| record.is_pending_close());
        if !pending {
            return;
        }
        if let Some(record) = self.current.take().and_then(|name| self.open.remove(&name)) {
            self.stage_record(record);
        }
    }

    /// Bracket `record` with the suites its name implies, then stage it
    fn stage_record(&mut self, mut record: TestRecord) {
        while let Some(top) = self.suites.last() {
            if is_ancestor_or_self(top, &record.name) {
                break;
            }
            if let Some(closed) = self.suites.pop() {
                self.staged.push(Staged::SuiteFinished(closed));
            }
        }

        let mut missing: Vec<&str> = ancestors(&record.name)
            .filter(|ancestor| !self.suites.iter().any(|s| s == ancestor))
            .collect();
        missing.reverse();
        for ancestor in missing {
            self.staged.push(Staged::SuiteStarted(ancestor.to_string()));
            self.suites.push(ancestor.to_string());
        }

        if record.suite && self.suites.last() != Some(&record.name) {
            self.staged.push(Staged::SuiteStarted(record.name.clone()));
            self.suites.push(record.name.clone());
        }

        record.end = Some(self.clock.now());
        self.staged.push(Staged::Test(record));
    }

    fn close_all_suites(&mut self) -> Result<(), EventsError> {
        while let Some(name) = self.suites.pop() {
            self.staged.push(Staged::SuiteFinished(name));
        }
        self.flush_staged(IRRELEVANT_PACKAGE)
    }

    fn flush_staged(&mut self, package: &str) -> Result<(), EventsError> {
        for entry in mem::take(&mut self.staged) {
            self.emit(entry, package)?;
        }
        Ok(())
    }

    fn emit(&mut self, entry: Staged, package: &str) -> Result<(), EventsError> {
        match entry {
            Staged::Raw(line) => self.writer.write_all(line.as_bytes())?,
            Staged::SuiteStarted(name) => {
                writeln!(self.writer, "{}", ServiceMessage::SuiteStarted { name: &name })?;
            }
            Staged::SuiteFinished(name) => {
                writeln!(self.writer, "{}", ServiceMessage::SuiteFinished { name: &name })?;
            }
            Staged::Test(record) => {
                let package = record.package.as_deref().unwrap_or(package);
                self.emit_test(&record, package)?;
            }
        }
        Ok(())
    }

    fn emit_test(&mut self, record: &TestRecord, package: &str) -> Result<(), EventsError> {
        let name = self.display_name(&record.name);
        let start = format_timestamp(record.start);
        let end = format_timestamp(record.end.unwrap_or(record.start));
        let verdict = record.verdict();
        self.summary.record(verdict);

        writeln!(
            self.writer,
            "{}",
            ServiceMessage::TestStarted {
                timestamp: &start,
                package,
                name: &name,
            }
        )?;
        self.writer.write_all(record.output.as_bytes())?;

        let details = record.details_text();
        let failure = match verdict {
            Verdict::Ignored => {
                writeln!(
                    self.writer,
                    "{}",
                    ServiceMessage::TestIgnored {
                        timestamp: &end,
                        name: &name,
                    }
                )?;
                return Ok(());
            }
            Verdict::Passed => None,
            Verdict::Race => Some(Some(RACE_MESSAGE)),
            Verdict::Failed => Some(None),
            Verdict::Panicked => Some(Some(PANIC_MESSAGE)),
        };
        if let Some(message) = failure {
            writeln!(
                self.writer,
                "{}",
                ServiceMessage::TestFailed {
                    timestamp: &end,
                    name: &name,
                    message,
                    details: &details,
                }
            )?;
        }
        writeln!(
            self.writer,
            "{}",
            ServiceMessage::TestFinished {
                timestamp: &end,
                name: &name,
                duration_ms: record.duration_ms,
            }
        )?;
        Ok(())
    }

    fn display_name(&self, name: &str) -> String {
        if self.options.name_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", self.options.name_prefix, name)
        }
    }
}

/// Convert a whole `go test -v` log
///
/// # Errors
///
/// Returns `EventsError::Io` if reading or writing fails.
pub fn convert<R, W, C>(
    reader: R,
    writer: W,
    clock: C,
    options: EngineOptions,
) -> Result<RunSummary, EventsError>
where
    R: BufRead,
    W: Write,
    C: Clock,
{
    let mut engine = Engine::new(writer, clock, options);
    engine.process_reader(reader)?;
    engine.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, NaiveDateTime};
    use similar_asserts::assert_eq;

    const TS: &str = "2017-01-02T04:05:06.789";

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 1, 2)
            .and_then(|d| d.and_hms_milli_opt(4, 5, 6, 789))
            .expect("valid date")
    }

    fn run_with(input: &str, options: EngineOptions) -> (String, RunSummary) {
        let mut out = Vec::new();
        let summary = convert(input.as_bytes(), &mut out, FixedClock::new(at()), options)
            .expect("conversion should succeed");
        (String::from_utf8(out).expect("utf-8 output"), summary)
    }

    fn run(input: &str) -> String {
        run_with(input, EngineOptions::default()).0
    }

    fn started(name: &str, pkg: &str) -> String {
        format!(
            "##teamcity[testStarted timestamp='{TS}' pkg='{pkg}' name='{name}' captureStandardOutput='true']\n"
        )
    }

    fn finished(name: &str, ms: i64) -> String {
        format!("##teamcity[testFinished timestamp='{TS}' name='{name}' duration='{ms}']\n")
    }

    #[test]
    fn test_single_passing_test() {
        let out = run("=== RUN   TestA\n--- PASS: TestA (0.01s)\nok  \tpkg/name\t0.012s\n");
        let expected = [
            started("TestA", "pkg/name"),
            finished("TestA", 10),
            "ok  \tpkg/name\t0.012s\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_subtest_without_package_is_bracketed() {
        let out = run("=== RUN Parent/Child\n--- FAIL: Parent/Child (0.00s)\n\tsome detail\n");
        let expected = [
            "##teamcity[testSuiteStarted name='Parent']\n".to_string(),
            started("Parent/Child", "unknown"),
            format!(
                "##teamcity[testFailed timestamp='{TS}' name='Parent/Child' details='some detail']\n"
            ),
            finished("Parent/Child", 0),
            "##teamcity[testSuiteFinished name='Parent']\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_captured_output_between_start_and_finish() {
        let out = run("=== RUN   TestA\nhello\nworld\n--- PASS: TestA (0.00s)\n");
        let expected = [
            started("TestA", "unknown"),
            "hello\nworld\n".to_string(),
            finished("TestA", 0),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_skipped_test_is_ignored_without_finish() {
        let out = run("=== RUN   TestS\n--- SKIP: TestS (0.00s)\n\ts_test.go:5: not today\nok  \tp\t0.1s\n");
        let expected = [
            started("TestS", "p"),
            format!("##teamcity[testIgnored timestamp='{TS}' name='TestS']\n"),
            "ok  \tp\t0.1s\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_failure_details_joined_and_escaped() {
        let out = run(
            "=== RUN   TestF\n--- FAIL: TestF (0.50s)\n\tf_test.go:9: got 'a'\n\t[want b]\nFAIL\nFAIL\tp\t0.5s\n",
        );
        let expected = [
            started("TestF", "p"),
            format!(
                "##teamcity[testFailed timestamp='{TS}' name='TestF' details='f_test.go:9: got |'a|'|n|[want b|]']\n"
            ),
            finished("TestF", 500),
            "FAIL\nFAIL\tp\t0.5s\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_race_flag_reports_failure() {
        let out = run("=== RUN   TestR\nWARNING: DATA RACE\nRead at 0x00c\n--- PASS: TestR (0.00s)\nok  \tp\t0.1s\n");
        let expected = [
            started("TestR", "p"),
            "Read at 0x00c\n".to_string(),
            format!(
                "##teamcity[testFailed timestamp='{TS}' name='TestR' message='Race detected!' details='']\n"
            ),
            finished("TestR", 0),
            "ok  \tp\t0.1s\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_race_marker_without_test_is_passthrough() {
        let input = "WARNING: DATA RACE\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_unterminated_test_reports_panic() {
        let (out, summary) = run_with(
            "=== RUN   TestP\npanic: boom\ngoroutine 1 [running]:\n",
            EngineOptions::default(),
        );
        let expected = [
            started("TestP", "unknown"),
            "panic: boom\ngoroutine 1 [running]:\n".to_string(),
            format!(
                "##teamcity[testFailed timestamp='{TS}' name='TestP' message='Test ended in panic.' details='']\n"
            ),
            finished("TestP", 0),
        ]
        .concat();
        assert_eq!(out, expected);
        assert_eq!(summary.panicked, 1);
    }

    #[test]
    fn test_end_without_start_is_synthesized() {
        let out = run("--- PASS: TestLost (0.02s)\nok  \tp\t0.1s\n");
        let expected = [
            started("TestLost", "p"),
            finished("TestLost", 20),
            "ok  \tp\t0.1s\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_passthrough_before_tests() {
        let out = run("go: downloading x\n=== RUN   TestA\n--- PASS: TestA (0.00s)\nok  \tp\t0.1s\n");
        assert!(out.starts_with("go: downloading x\n##teamcity[testStarted"));
    }

    #[test]
    fn test_only_unrecognized_lines_round_trip() {
        let input = "just\nsome\n\ttext\nwithout markers";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_terminators_replayed_last() {
        let out = run("PASS\n=== RUN   TestA\n--- PASS: TestA (0.00s)\ncoverage: 1% of statements\n");
        let expected = [
            started("TestA", "unknown"),
            finished("TestA", 0),
            "PASS\ncoverage: 1% of statements\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_words_starting_with_pass_or_fail_stay_in_test() {
        let out = run(
            "=== RUN   TestA\nPASSWORD reset ok\nFAILED to dial\n--- PASS: TestA (0.00s)\nok  \tp\t0.1s\n",
        );
        let expected = [
            started("TestA", "p"),
            "PASSWORD reset ok\nFAILED to dial\n".to_string(),
            finished("TestA", 0),
            "ok  \tp\t0.1s\n".to_string(),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_non_ascii_indent_is_captured_output() {
        let out = run("=== RUN   TestA\n\u{a0}--- PASS: TestX (0.01s)\n--- PASS: TestA (0.00s)\n");
        let expected = [
            started("TestA", "unknown"),
            "\u{a0}--- PASS: TestX (0.01s)\n".to_string(),
            finished("TestA", 0),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_nested_suites_close_when_leaving() {
        let input = "\
=== RUN   TestOuter
=== RUN   TestOuter/inner
--- PASS: TestOuter (0.00s)
    --- PASS: TestOuter/inner (0.00s)
=== RUN   TestNext
--- PASS: TestNext (0.00s)
ok  \tp\t0.1s
";
        let expected = [
            "##teamcity[testSuiteStarted name='TestOuter']\n".to_string(),
            started("TestOuter", "p"),
            finished("TestOuter", 0),
            started("TestOuter/inner", "p"),
            finished("TestOuter/inner", 0),
            "##teamcity[testSuiteFinished name='TestOuter']\n".to_string(),
            started("TestNext", "p"),
            finished("TestNext", 0),
            "ok  \tp\t0.1s\n".to_string(),
        ]
        .concat();
        assert_eq!(run(input), expected);
    }

    #[test]
    fn test_sibling_prefix_is_not_ancestor() {
        let input = "\
=== RUN   TestA
=== RUN   TestA/x
--- PASS: TestA (0.00s)
    --- PASS: TestA/x (0.00s)
=== RUN   TestAB
--- PASS: TestAB (0.00s)
";
        let out = run(input);
        let finish = out
            .find("testSuiteFinished name='TestA'")
            .expect("suite closed");
        let sibling = out.find("name='TestAB'").expect("sibling emitted");
        assert!(finish < sibling, "TestA must close before TestAB:\n{out}");
    }

    #[test]
    fn test_nested_detail_prefix() {
        let input = "\
=== RUN   TestOuter
=== RUN   TestOuter/inner
--- FAIL: TestOuter (0.00s)
    --- FAIL: TestOuter/inner (0.00s)
    \tx_test.go:3: nested failure
";
        let out = run(input);
        assert!(out.contains(
            "testFailed timestamp='2017-01-02T04:05:06.789' name='TestOuter/inner' details='x_test.go:3: nested failure'"
        ));
        assert!(out.contains("name='TestOuter' details='']"));
    }

    #[test]
    fn test_package_attached_to_open_tests() {
        let input = "\
=== RUN   TestHang
=== RUN   TestDone
--- PASS: TestDone (0.00s)
ok  \tpkg/one\t0.1s
";
        let out = run(input);
        assert!(out.contains(&started("TestDone", "pkg/one")));
        // TestHang never ended but picked up the package while still open
        assert!(out.contains(&started("TestHang", "pkg/one")));
        assert!(out.contains("name='TestHang' message='Test ended in panic.'"));
        assert!(out.ends_with("ok  \tpkg/one\t0.1s\n"));
    }

    #[test]
    fn test_orphans_flushed_in_start_order() {
        let input = "=== RUN   TestB\n=== RUN   TestA\n=== RUN   TestC\n";
        let out = run(input);
        let c = out.find("name='TestC'").expect("current flushed");
        let b = out.find("name='TestB'").expect("orphan B flushed");
        let a = out.find("name='TestA'").expect("orphan A flushed");
        assert!(c < b && b < a, "unexpected order:\n{out}");
    }

    #[test]
    fn test_restart_replaces_open_record() {
        let input = "=== RUN   TestA\nfirst\n=== RUN   TestA\nsecond\n--- PASS: TestA (0.00s)\n";
        let out = run(input);
        assert_eq!(out.matches("testStarted").count(), 1);
        assert!(out.contains("second\n"));
        assert!(!out.contains("first\n"));
    }

    #[test]
    fn test_name_prefix() {
        let (out, _) = run_with(
            "=== RUN   Parent/Child\n--- PASS: Parent/Child (0.00s)\n",
            EngineOptions::with_name_prefix("linux"),
        );
        assert!(out.contains("name='linux Parent/Child' captureStandardOutput"));
        // Suite names are reported without the prefix
        assert!(out.contains("##teamcity[testSuiteStarted name='Parent']"));
    }

    #[test]
    fn test_summary_counts() {
        let input = "\
=== RUN   TestA
--- PASS: TestA (0.00s)
=== RUN   TestB
--- FAIL: TestB (0.00s)
=== RUN   TestC
--- SKIP: TestC (0.00s)
FAIL
FAIL\tpkg/x\t0.1s
";
        let (_, summary) = run_with(input, EngineOptions::default());
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.packages, vec!["pkg/x"]);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut out = Vec::new();
        let input: &[u8] = b"bad \xff byte\n";
        convert(input, &mut out, FixedClock::new(at()), EngineOptions::default())
            .expect("conversion should succeed");
        assert_eq!(String::from_utf8(out).expect("utf-8"), "bad \u{fffd} byte\n");
    }
}
