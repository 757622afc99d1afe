//! End-to-end runs of the postprocessor over small programs.

use mmpost_core::{DiagnosticKind, PostprocessError, Postprocessor};
use mmpost_test_utils::config::{TestConfigBuilder, two_tool_config};
use mmpost_test_utils::gcode::{END_HOME, ProgramBuilder, START_HOME};
use pretty_assertions::assert_eq;

fn position(lines: &[&str], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| *l == needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in output"))
}

#[test_log::test]
fn test_program_without_sentinels_is_unchanged() {
    let input = ProgramBuilder::new()
        .lines(&[
            "; generated by slicer",
            "M140 S60",
            "M104 S210 ; nozzle",
            "G28",
            "T0",
            "G1 X10.000 Y20.000 E0.12345 F1800",
            "",
            "G1 X-0.5 Y3",
            "M117 Layer 1 of 20",
        ])
        .build();

    let out = Postprocessor::new(&two_tool_config()).run(&input).unwrap();
    assert_eq!(out.text, input);
    assert_eq!(out.summary.regions, 0);
}

#[test_log::test]
fn test_ramp_and_wipe_for_oozy_outgoing_tool() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "M104 S240", "G1 X5 Y5 E1"])
        .region(Some((10.0, 10.0)), &[])
        .line("G1 X30 Y30 E2")
        .build();

    let out = Postprocessor::new(&two_tool_config()).run(&input).unwrap();
    assert_eq!(
        out.text,
        "\
T0
M104 S240
G1 X5 Y5 E1
M104 T1 S210
; EXTRUDER START HOME
G0 X10 Y10
G1 X15 Y10
G1 X10 Y10
; EXTRUDER END HOME
G1 X30 Y30 E2
"
    );
    assert!(out.diagnostics.is_empty());

    let lines: Vec<&str> = out.text.lines().collect();
    let end = position(&lines, END_HOME);
    assert!(position(&lines, "M104 T1 S210") < end);
    assert!(position(&lines, "G1 X15 Y10") < position(&lines, "G1 X10 Y10"));
    assert!(position(&lines, "G1 X10 Y10") < end);
}

#[test_log::test]
fn test_unclosed_region_fails() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "G1 X1 Y1"])
        .start_marker()
        .line("G0 X10 Y10")
        .line("G1 X2 Y2")
        .build();

    let err = Postprocessor::new(&two_tool_config())
        .run(&input)
        .unwrap_err();
    assert_eq!(
        err,
        PostprocessError::MalformedRegion {
            line: 3,
            reason: "start marker has no matching end marker".to_string(),
        }
    );
}

#[test_log::test]
fn test_unknown_tool_leaves_region_unchanged() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "M104 S240"])
        .region(Some((10.0, 10.0)), &["T4"])
        .line("G1 X30 Y30 E2")
        .build();

    let out = Postprocessor::new(&two_tool_config()).run(&input).unwrap();
    assert_eq!(out.text, input);
    assert_eq!(out.diagnostics.len(), 1);
    let warning = out.diagnostics.iter().next().unwrap();
    assert_eq!(warning.kind, DiagnosticKind::UnknownTool);
    assert_eq!(warning.line, Some(3));
}

#[test_log::test]
fn test_no_profiles_configured() {
    let input = ProgramBuilder::new()
        .line("T0")
        .region(Some((1.0, 1.0)), &[])
        .region(Some((1.0, 1.0)), &[])
        .build();

    let out = Postprocessor::new(&TestConfigBuilder::new().build())
        .run(&input)
        .unwrap();
    assert_eq!(out.text, input);
    assert_eq!(out.diagnostics.count(DiagnosticKind::UnknownTool), 2);
}

#[test_log::test]
fn test_tools_alternate_across_regions() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "M104 S240"])
        .region(Some((10.0, 10.0)), &[])
        .line("G1 X1 Y1 E1")
        .region(Some((20.0, 20.0)), &[])
        .line("G1 X2 Y2 E2")
        .build();

    let config = TestConfigBuilder::new()
        .oozy_tool(0, "PETG", 240.0, (5.0, 0.0))
        .idle(170.0)
        .tool(1, "PLA", 210.0)
        .idle(150.0)
        .build();
    let out = Postprocessor::new(&config).run(&input).unwrap();
    assert_eq!(
        out.text,
        "\
T0
M104 S240
M104 T1 S210
; EXTRUDER START HOME
G0 X10 Y10
G1 X15 Y10
G1 X10 Y10
M104 T0 S170
; EXTRUDER END HOME
G1 X1 Y1 E1
M104 T0 S240
; EXTRUDER START HOME
G0 X20 Y20
M104 T1 S150
; EXTRUDER END HOME
G1 X2 Y2 E2
"
    );
    assert_eq!(out.summary.temperature_ramps, 2);
    assert_eq!(out.summary.wipes, 1);
    assert_eq!(out.summary.idle_ramps, 2);
}

#[test_log::test]
fn test_missing_home_position_skips_wipe() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "M104 S240"])
        .region(None, &["G0 Z10"])
        .build();

    let out = Postprocessor::new(&two_tool_config()).run(&input).unwrap();
    assert_eq!(
        out.text,
        format!("T0\nM104 S240\nM104 T1 S210\n{START_HOME}\nG0 Z10\n{END_HOME}\n")
    );
    assert_eq!(out.diagnostics.count(DiagnosticKind::MissingHomePosition), 1);
}

#[test_log::test]
fn test_crlf_program_keeps_line_endings() {
    let input = ProgramBuilder::new()
        .crlf()
        .lines(&["T0", "M104 S240"])
        .region(Some((10.0, 10.0)), &[])
        .build();

    let out = Postprocessor::new(&two_tool_config()).run(&input).unwrap();
    assert_eq!(
        out.text,
        "T0\r\nM104 S240\r\nM104 T1 S210\r\n; EXTRUDER START HOME\r\nG0 X10 Y10\r\nG1 X15 Y10\r\nG1 X10 Y10\r\n; EXTRUDER END HOME\r\n"
    );
}

#[test_log::test]
fn test_wait_and_feed_rate_options() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "M109 S240"])
        .region(Some((10.0, 10.0)), &[])
        .build();

    let config = TestConfigBuilder::new()
        .oozy_tool(0, "PETG", 240.0, (0.0, -3.0))
        .tool(1, "PLA", 210.0)
        .wait_for_temperature(true)
        .wipe_feed_rate(3000.0)
        .build();
    let out = Postprocessor::new(&config).run(&input).unwrap();
    assert_eq!(
        out.text,
        "\
T0
M109 S240
M109 T1 S210
; EXTRUDER START HOME
G0 X10 Y10
G1 X10 Y7 F3000
G1 X10 Y10 F3000
; EXTRUDER END HOME
"
    );
}

#[test_log::test]
fn test_minimize_and_cooldown() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "M104 S240", "M104 S240", "G1 X1 Y1 E1"])
        .region(None, &["T1", "M109 S210"])
        .lines(&["M104 T1 S210", "G1 X2 Y2 E2"])
        .build();

    let config = TestConfigBuilder::new()
        .tool(0, "PLA", 240.0)
        .tool(1, "PLA", 210.0)
        .minimize_temperatures(true)
        .cooldown_at_end(true)
        .build();
    let out = Postprocessor::new(&config).run(&input).unwrap();
    assert_eq!(
        out.text,
        "\
T0
M104 S240
G1 X1 Y1 E1
M104 T1 S210
; EXTRUDER START HOME
T1
M109 S210
; EXTRUDER END HOME
G1 X2 Y2 E2
M104 T0 S0
M104 T1 S0
"
    );
    assert_eq!(out.summary.dropped_temperature_commands, 2);
    assert_eq!(out.summary.cooldown_commands, 2);
    assert_eq!(out.summary.lines_out, out.text.lines().count());
}

#[test_log::test]
fn test_cooldown_after_unterminated_last_line() {
    let input = ProgramBuilder::new()
        .lines(&["T0", "G1 X1"])
        .without_trailing_newline()
        .build();
    assert_eq!(input, "T0\nG1 X1");

    let config = TestConfigBuilder::new()
        .tool(0, "PLA", 210.0)
        .tool(1, "PLA", 205.0)
        .cooldown_at_end(true)
        .build();
    let out = Postprocessor::new(&config).run(&input).unwrap();
    assert_eq!(out.text, "T0\nG1 X1\nM104 T0 S0\nM104 T1 S0\n");
}
