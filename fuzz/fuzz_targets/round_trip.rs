#![no_main]

use libfuzzer_sys::fuzz_target;
use quill::bridge::{RoundTrip, destroy_source_file, parse_source_file, round_trip_check};

fuzz_target!(|data: &[u8]| {
    // Inputs too large for 32-bit offsets are rejected before parsing.
    let Ok(file) = parse_source_file(data, "Fuzz", "fuzz.qd", Some(&|_: &str| true)) else {
        return;
    };
    assert_eq!(round_trip_check(&file), RoundTrip::Identical);
    destroy_source_file(file);
});
