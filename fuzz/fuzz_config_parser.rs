//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`. Whatever validates must also
//! build a material table without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = mmpost_config::AppConfig::parse(s) {
            let table = config.build_material_table();
            assert_eq!(table.len(), config.tools.len());
        }
    }
});
