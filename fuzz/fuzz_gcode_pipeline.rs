//! Fuzz target for the gcode reader and the full rewrite pipeline.
//!
//! Run with: cargo +nightly fuzz run fuzz_gcode_pipeline
//!
//! The first byte toggles the optional passes; the rest is program text.
//! Reading then rendering must reproduce the text exactly, and a run must
//! either succeed or fail with an error, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mmpost_config::PostprocessConfig;
use mmpost_config::material::{MaterialProfile, MaterialTable, Offset};
use mmpost_core::Postprocessor;
use mmpost_core::gcode::{parse, render};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };

    let (program, _) = parse(text);
    assert_eq!(render(&program.instructions, program.line_ending), text);

    let materials = MaterialTable::new()
        .with(
            0,
            MaterialProfile::new("PETG", 240.0)
                .oozy(Offset::new(5.0, -1.5))
                .with_idle_temperature(170.0),
        )
        .with(1, MaterialProfile::new("PLA", 210.0));
    let options = PostprocessConfig {
        wait_for_temperature: flags & 1 != 0,
        wipe_feed_rate: (flags & 2 != 0).then_some(3000.0),
        minimize_temperatures: flags & 4 != 0,
        cooldown_at_end: flags & 8 != 0,
    };

    let optional_passes = options.minimize_temperatures || options.cooldown_at_end;

    if let Ok(out) = Postprocessor::with_materials(materials, options).run(text) {
        if out.summary.regions == 0 && !optional_passes {
            assert_eq!(out.text, text);
        }
    }
});
