//! Gcode program builders for tests.
//!
//! [`ProgramBuilder`] assembles program text line by line, with helpers for
//! the sentinel-bounded tool-change regions that the rewriter acts on.

/// Comment that opens a tool-change region.
pub const START_HOME: &str = "; EXTRUDER START HOME";
/// Comment that closes a tool-change region.
pub const END_HOME: &str = "; EXTRUDER END HOME";

/// Fluent builder for gcode program text.
///
/// # Example
///
/// ```ignore
/// let text = ProgramBuilder::new()
///     .line("T0")
///     .line("M104 S240")
///     .region(Some((10.0, 10.0)), &["T1"])
///     .line("G1 X20 Y20 E1")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            line_ending: "\n",
            trailing_newline: true,
        }
    }

    /// Use `\r\n` between lines.
    pub fn crlf(mut self) -> Self {
        self.line_ending = "\r\n";
        self
    }

    /// Leave the last line unterminated.
    pub fn without_trailing_newline(mut self) -> Self {
        self.trailing_newline = false;
        self
    }

    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn lines(mut self, lines: &[&str]) -> Self {
        self.lines.extend(lines.iter().map(|l| l.to_string()));
        self
    }

    pub fn start_marker(self) -> Self {
        self.line(START_HOME)
    }

    pub fn end_marker(self) -> Self {
        self.line(END_HOME)
    }

    /// A complete region: start marker, optional `G0` home move, `body`,
    /// end marker.
    pub fn region(self, home: Option<(f64, f64)>, body: &[&str]) -> Self {
        let builder = self.start_marker();
        let builder = match home {
            Some((x, y)) => builder.line(&format!("G0 X{x} Y{y}")),
            None => builder,
        };
        builder.lines(body).end_marker()
    }

    pub fn build(self) -> String {
        let mut text = self.lines.join(self.line_ending);
        if self.trailing_newline && !self.lines.is_empty() {
            text.push_str(self.line_ending);
        }
        text
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A layer of printing moves, for filler between regions.
pub fn printing_moves(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("G1 X{i} Y{i} E{:.2}", i as f64 * 0.05))
        .collect()
}
