// Copyright (c) 2026 - present gotest-teamcity contributors
// SPDX-License-Identifier: MIT

//! Fuzz target for line classification and escaping

#![no_main]

use libfuzzer_sys::fuzz_target;

use gotest_events::classify::{classify, parse_duration_ms};
use gotest_events::{escape, unescape};

fuzz_target!(|input: &str| {
    for line in input.split_inclusive('\n') {
        let _ = classify(line);
        let _ = parse_duration_ms(line.trim());
        assert_eq!(unescape(&escape(line)), line);
    }
});
