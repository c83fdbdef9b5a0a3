//! Fuzz target for config file parsing.
//!
//! Malformed TOML, wrong types and out-of-range values must all surface as
//! `ConfigError`, never a panic. Whatever parses must be valid and must
//! round-trip through `save_to`/`load_from`.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tempfile::TempDir;

use artpick::config::Config;

#[derive(Arbitrary, Debug)]
struct ConfigInput {
    toml_content: String,
    round_trip: bool,
}

fuzz_target!(|input: ConfigInput| {
    let Ok(config) = Config::from_toml(&input.toml_content) else {
        return;
    };
    assert!(config.validate().is_ok());

    if !input.round_trip {
        return;
    }
    let temp_dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let path = temp_dir.path().join("config.toml");
    if config.save_to(&path).is_err() {
        return;
    }
    let reloaded = Config::load_from(&path).expect("saved config reloads");
    assert_eq!(reloaded, config);
});
