// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Fuzz target for the conversion engine
//!
//! Feeds arbitrary bytes through `convert`, which must never panic and must
//! only fail on I/O errors.

#![no_main]

use libfuzzer_sys::fuzz_target;

use chrono::NaiveDateTime;
use gotest_events::{EngineOptions, FixedClock, convert};

fuzz_target!(|data: &[u8]| {
    let mut out = Vec::new();
    let clock = FixedClock::new(NaiveDateTime::default());
    let result = convert(data, &mut out, clock, EngineOptions::default());
    assert!(result.is_ok(), "in-memory conversion cannot fail");
});
