//! Fuzz target for the "select first N" count parser.

#![no_main]

use libfuzzer_sys::fuzz_target;

use artpick::bulk::parse_select_count;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(n) = parse_select_count(text) {
        // Any accepted count re-parses to itself.
        assert_eq!(parse_select_count(&n.to_string()), Ok(n));
    }
});
