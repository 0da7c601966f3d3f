// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! gotest-events: test event reconstruction from `go test -v` output
//!
//! This library crate reads the human-readable output of `go test -v` line
//! by line and writes TeamCity service messages describing every test and
//! every suite implied by subtest names.
//!
//! # Example
//!
//! ```no_run
//! use gotest_events::{EngineOptions, SystemClock, convert};
//!
//! let stdin = std::io::stdin().lock();
//! let stdout = std::io::stdout().lock();
//! let summary = convert(stdin, stdout, SystemClock, EngineOptions::default()).unwrap();
//! eprintln!("{} tests", summary.total());
//! ```

pub mod classify;
pub mod clock;
pub mod engine;
pub mod error;
pub mod message;
pub mod record;
pub mod summary;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{Engine, EngineOptions, convert};
pub use error::EventsError;
pub use message::{ServiceMessage, escape, unescape};
pub use record::{Outcome, TestRecord};
pub use summary::RunSummary;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::engine::{Engine, EngineOptions, convert};
    pub use crate::error::EventsError;
    pub use crate::summary::RunSummary;
}
