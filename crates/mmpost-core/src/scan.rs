//! Tool-change scanner. Finds regions bounded by sentinel comments.
//!
//! The per-extruder start/end scripts of the slicer carry two fixed comments,
//! `; EXTRUDER START HOME` and `; EXTRUDER END HOME`. Each pair bounds one
//! [`ToolChangeRegion`]. The scanner is a fold over the instruction stream:
//! the running [`ToolState`] is threaded through it as an explicit accumulator
//! and decides the outgoing and incoming tool of every region.

use std::collections::BTreeMap;

use tracing::debug;

use crate::PostprocessError;
use crate::gcode::{Instruction, Point};
use crate::temperature::{Commanded, Observed, ToolState};

/// Comment text (after trimming) that opens a tool-change region.
pub const START_MARKER: &str = "; EXTRUDER START HOME";
/// Comment text (after trimming) that closes a tool-change region.
pub const END_MARKER: &str = "; EXTRUDER END HOME";

/// Sentinel classification of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
    Other,
}

impl Marker {
    /// Classify an instruction by exact match of its trimmed comment text.
    pub fn classify(instruction: &Instruction) -> Self {
        match instruction.comment_text() {
            Some(START_MARKER) => Marker::Start,
            Some(END_MARKER) => Marker::End,
            _ => Marker::Other,
        }
    }
}

/// One tool-change region, `[start_index, end_index]` inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolChangeRegion {
    /// Line index of the start marker.
    pub start_index: usize,
    /// Line index of the end marker.
    pub end_index: usize,
    /// Tool that takes over after the region.
    pub incoming_tool: u32,
    /// Tool active before the region; unset when no tool was known yet.
    pub outgoing_tool: Option<u32>,
    /// XY of the move immediately following the start marker.
    pub home_position: Option<Point>,
    /// Temperatures commanded per tool before the start marker.
    pub commanded_at_start: BTreeMap<u32, Commanded>,
}

impl ToolChangeRegion {
    /// The temperature commanded for the incoming tool when the region opened.
    pub fn incoming_commanded(&self) -> Option<Commanded> {
        self.commanded_at_start.get(&self.incoming_tool).copied()
    }

    /// Number of lines spanned, markers included.
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Always false; a region spans at least its two markers.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A region whose end marker has not been seen yet.
#[derive(Debug, Clone)]
struct OpenRegion {
    start_index: usize,
    outgoing_tool: Option<u32>,
    explicit_incoming: Option<u32>,
    home_position: Option<Point>,
    awaiting_home: bool,
    commanded_at_start: BTreeMap<u32, Commanded>,
}

/// Accumulator threaded through the scan.
#[derive(Debug, Clone)]
struct ScanState<'a> {
    tools: ToolState,
    configured: &'a [u32],
    open: Option<OpenRegion>,
    regions: Vec<ToolChangeRegion>,
}

impl<'a> ScanState<'a> {
    fn new(configured: &'a [u32]) -> Self {
        Self {
            tools: ToolState::new(),
            configured,
            open: None,
            regions: Vec::new(),
        }
    }

    fn step(mut self, index: usize, instruction: &Instruction) -> Result<Self, PostprocessError> {
        match Marker::classify(instruction) {
            Marker::Start => {
                if let Some(open) = &self.open {
                    return Err(PostprocessError::malformed(
                        index,
                        format!(
                            "start marker while the region opened at line {} is still open",
                            open.start_index + 1
                        ),
                    ));
                }
                self.open = Some(OpenRegion {
                    start_index: index,
                    outgoing_tool: self.tools.active_tool(),
                    explicit_incoming: None,
                    home_position: None,
                    awaiting_home: true,
                    commanded_at_start: self.tools.snapshot(),
                });
            }
            Marker::End => {
                let Some(open) = self.open.take() else {
                    return Err(PostprocessError::malformed(
                        index,
                        "end marker without a matching start marker",
                    ));
                };
                self.close(open, index);
            }
            Marker::Other => {
                if let Some(open) = self.open.as_mut() {
                    if open.awaiting_home && !instruction.is_blank() {
                        open.awaiting_home = false;
                        open.home_position = instruction.xy_target();
                    }
                }
                if let Observed::ToolSelected(tool) = self.tools.observe(instruction) {
                    if let Some(open) = self.open.as_mut() {
                        open.explicit_incoming = Some(tool);
                    }
                }
            }
        }
        Ok(self)
    }

    fn close(&mut self, open: OpenRegion, end_index: usize) {
        let incoming_tool = open
            .explicit_incoming
            .unwrap_or_else(|| next_tool(open.outgoing_tool, self.configured));
        self.tools.select_tool(incoming_tool);

        let region = ToolChangeRegion {
            start_index: open.start_index,
            end_index,
            incoming_tool,
            outgoing_tool: open.outgoing_tool,
            home_position: open.home_position,
            commanded_at_start: open.commanded_at_start,
        };
        debug!(
            start = region.start_index + 1,
            end = region.end_index + 1,
            outgoing = ?region.outgoing_tool,
            incoming = region.incoming_tool,
            home = ?region.home_position,
            "Scanned tool-change region"
        );
        self.regions.push(region);
    }

    fn finish(self) -> Result<Vec<ToolChangeRegion>, PostprocessError> {
        match self.open {
            Some(open) => Err(PostprocessError::malformed(
                open.start_index,
                "start marker has no matching end marker",
            )),
            None => Ok(self.regions),
        }
    }
}

/// The tool that follows `outgoing` when the region names none explicitly.
///
/// Advances to the next configured tool index, wrapping to the lowest one.
/// With no configured tools it is a plain increment. A program with no
/// tool history starts at the lowest configured tool, else `T0`.
pub fn next_tool(outgoing: Option<u32>, configured: &[u32]) -> u32 {
    let lowest = configured.iter().copied().min();
    match outgoing {
        None => lowest.unwrap_or(0),
        Some(tool) => configured
            .iter()
            .copied()
            .filter(|&t| t > tool)
            .min()
            .or(lowest)
            .unwrap_or_else(|| tool.saturating_add(1)),
    }
}

/// Scan a program for tool-change regions.
///
/// Regions are returned in program order and never overlap. Nested or
/// unbalanced markers fail with [`PostprocessError::MalformedRegion`].
/// `configured` lists the tool indices that have a material profile.
pub fn scan(
    instructions: &[Instruction],
    configured: &[u32],
) -> Result<Vec<ToolChangeRegion>, PostprocessError> {
    instructions
        .iter()
        .enumerate()
        .try_fold(ScanState::new(configured), |state, (index, instruction)| {
            state.step(index, instruction)
        })?
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::parse;
    use pretty_assertions::assert_eq;

    fn scan_text(text: &str, configured: &[u32]) -> Result<Vec<ToolChangeRegion>, PostprocessError> {
        let (program, _) = parse(text);
        scan(&program.instructions, configured)
    }

    #[test]
    fn test_marker_classification() {
        let (program, _) = parse("; EXTRUDER START HOME\n  ; EXTRUDER END HOME  \n;EXTRUDER START HOME\nG1 X1 ; EXTRUDER END HOME\n");
        let markers: Vec<_> = program.instructions.iter().map(Marker::classify).collect();
        assert_eq!(
            markers,
            vec![Marker::Start, Marker::End, Marker::Other, Marker::Other]
        );
    }

    #[test]
    fn test_no_markers() {
        let regions = scan_text("G1 X1\nT1\nG1 X2\n", &[0, 1]).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_single_region() {
        let text = "\
T0
M104 S200
G1 X5 Y5 E1
; EXTRUDER START HOME
G0 X10 Y10
T1
G1 Z1
; EXTRUDER END HOME
G1 X20 Y20 E2
";
        let regions = scan_text(text, &[0, 1]).unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.start_index, 3);
        assert_eq!(region.end_index, 7);
        assert_eq!(region.len(), 5);
        assert_eq!(region.outgoing_tool, Some(0));
        assert_eq!(region.incoming_tool, 1);
        assert_eq!(region.home_position, Some(Point::new(10.0, 10.0)));
        assert_eq!(region.commanded_at_start.get(&0).unwrap().target, 200.0);
        assert_eq!(region.incoming_commanded(), None);
    }

    #[test]
    fn test_first_region_without_history() {
        let text = "; EXTRUDER START HOME\n; EXTRUDER END HOME\n";
        let regions = scan_text(text, &[0, 1]).unwrap();
        assert_eq!(regions[0].outgoing_tool, None);
        assert_eq!(regions[0].incoming_tool, 0);
        assert_eq!(regions[0].home_position, None);
    }

    #[test]
    fn test_counter_alternates_between_regions() {
        let text = "\
T0
; EXTRUDER START HOME
; EXTRUDER END HOME
G1 X1
; EXTRUDER START HOME
; EXTRUDER END HOME
G1 X2
; EXTRUDER START HOME
; EXTRUDER END HOME
";
        let regions = scan_text(text, &[0, 1]).unwrap();
        let pairs: Vec<_> = regions
            .iter()
            .map(|r| (r.outgoing_tool, r.incoming_tool))
            .collect();
        assert_eq!(pairs, vec![(Some(0), 1), (Some(1), 0), (Some(0), 1)]);
    }

    #[test]
    fn test_counter_increments_without_configured_tools() {
        let text = "T2\n; EXTRUDER START HOME\n; EXTRUDER END HOME\n";
        let regions = scan_text(text, &[]).unwrap();
        assert_eq!(regions[0].incoming_tool, 3);
    }

    #[test]
    fn test_counter_skips_unconfigured_indices() {
        let text = "\
T0
; EXTRUDER START HOME
; EXTRUDER END HOME
; EXTRUDER START HOME
; EXTRUDER END HOME
";
        let regions = scan_text(text, &[0, 2]).unwrap();
        let incoming: Vec<_> = regions.iter().map(|r| r.incoming_tool).collect();
        assert_eq!(incoming, vec![2, 0]);
    }

    #[test]
    fn test_next_tool() {
        assert_eq!(next_tool(None, &[]), 0);
        assert_eq!(next_tool(None, &[3, 5]), 3);
        assert_eq!(next_tool(Some(3), &[3, 5]), 5);
        assert_eq!(next_tool(Some(5), &[3, 5]), 3);
        assert_eq!(next_tool(Some(4), &[5, 3]), 5);
        assert_eq!(next_tool(Some(9), &[]), 10);
    }

    #[test]
    fn test_explicit_tool_inside_region_wins() {
        let text = "T0\n; EXTRUDER START HOME\nT2\n; EXTRUDER END HOME\n";
        let regions = scan_text(text, &[0, 1, 2]).unwrap();
        assert_eq!(regions[0].outgoing_tool, Some(0));
        assert_eq!(regions[0].incoming_tool, 2);
    }

    #[test]
    fn test_home_requires_xy_move_first() {
        let z_only = "T0\n; EXTRUDER START HOME\nG0 Z5\nG0 X1 Y1\n; EXTRUDER END HOME\n";
        assert_eq!(scan_text(z_only, &[0, 1]).unwrap()[0].home_position, None);

        let comment_first = "T0\n; EXTRUDER START HOME\n; park\nG0 X1 Y1\n; EXTRUDER END HOME\n";
        assert_eq!(scan_text(comment_first, &[0, 1]).unwrap()[0].home_position, None);

        let blank_first = "T0\n; EXTRUDER START HOME\n\nG0 X1 Y2 F9000\n; EXTRUDER END HOME\n";
        assert_eq!(
            scan_text(blank_first, &[0, 1]).unwrap()[0].home_position,
            Some(Point::new(1.0, 2.0))
        );
    }

    #[test]
    fn test_nested_start_is_malformed() {
        let text = "; EXTRUDER START HOME\n; EXTRUDER START HOME\n; EXTRUDER END HOME\n";
        let err = scan_text(text, &[0, 1]).unwrap_err();
        assert!(matches!(err, PostprocessError::MalformedRegion { line: 2, .. }));
    }

    #[test]
    fn test_unmatched_end_is_malformed() {
        let text = "G1 X1\n; EXTRUDER END HOME\n";
        let err = scan_text(text, &[0, 1]).unwrap_err();
        assert!(matches!(err, PostprocessError::MalformedRegion { line: 2, .. }));
    }

    #[test]
    fn test_unterminated_region_is_malformed() {
        let text = "G1 X1\n; EXTRUDER START HOME\nG0 X1 Y1\n";
        let err = scan_text(text, &[0, 1]).unwrap_err();
        assert!(matches!(err, PostprocessError::MalformedRegion { line: 2, .. }));
        assert!(err.to_string().contains("no matching end marker"));
    }

    #[test]
    fn test_regions_ordered_and_disjoint() {
        let text = "\
; EXTRUDER START HOME
; EXTRUDER END HOME
; EXTRUDER START HOME
G1 X1
; EXTRUDER END HOME
; EXTRUDER START HOME
; EXTRUDER END HOME
";
        let regions = scan_text(text, &[0, 1]).unwrap();
        assert_eq!(regions.len(), 3);
        for pair in regions.windows(2) {
            assert!(pair[0].end_index < pair[1].start_index);
        }
    }

    #[test]
    fn test_snapshot_excludes_commands_inside_region() {
        let text = "T0\nM104 T1 S180\n; EXTRUDER START HOME\nM104 T1 S215\n; EXTRUDER END HOME\n";
        let regions = scan_text(text, &[0, 1]).unwrap();
        assert_eq!(regions[0].incoming_commanded().unwrap().target, 180.0);
    }
}
