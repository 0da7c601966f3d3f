// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Wall-clock access for start/end timestamps
//!
//! The engine never reads the system time directly; it asks a [`Clock`].
//! Use [`SystemClock`] in production and [`FixedClock`] when output must be
//! reproducible.

use chrono::{Local, NaiveDateTime};

/// Timestamp layout used by TeamCity service messages
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Source of the current wall-clock time
pub trait Clock {
    /// Current local time
    fn now(&self) -> NaiveDateTime;

    /// Current time formatted for a service message
    fn timestamp(&self) -> String {
        format_timestamp(self.now())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Reads the local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Create a clock frozen at `at`
    #[must_use]
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Format a timestamp with millisecond precision
#[must_use]
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
