//! Ramp & wipe planner.
//!
//! For each tool-change region the planner decides:
//!
//! - a temperature ramp for the incoming tool, inserted before the start
//!   marker, when its profile target differs from what is commanded;
//! - a wipe for an oozy outgoing tool (out to `home + wipe_offset`, back to
//!   `home`), inserted before the end marker;
//! - an idle ramp-down for the outgoing tool, after the wipe, when its
//!   profile has an idle temperature.
//!
//! The output is an [`EditPlan`]: disjoint edits sorted by line index.

use std::collections::BTreeMap;

use mmpost_config::material::{MaterialProfile, MaterialTable};
use tracing::debug;

use crate::PostprocessError;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::gcode::{Instruction, Point};
use crate::scan::ToolChangeRegion;
use crate::temperature::same_temperature;

/// How an edit treats its target line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Emit the instructions, then the original line.
    InsertBefore,
    /// Emit the instructions in place of the original line.
    Replace,
}

/// A single edit anchored at an original line.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub line_index: usize,
    pub kind: EditKind,
    pub instructions: Vec<Instruction>,
}

/// An ordered list of disjoint edits.
///
/// Every edit must target a line strictly after the previous one; anything
/// else is rejected with [`PostprocessError::OverlappingEdit`]. An
/// `insert_before` may target one past the last line to append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPlan {
    edits: Vec<Edit>,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `instructions` before the line at `line_index`.
    pub fn insert_before(
        &mut self,
        line_index: usize,
        instructions: Vec<Instruction>,
    ) -> Result<(), PostprocessError> {
        self.push(line_index, EditKind::InsertBefore, instructions)
    }

    /// Replace the line at `line_index`; an empty list deletes it.
    pub fn replace(
        &mut self,
        line_index: usize,
        instructions: Vec<Instruction>,
    ) -> Result<(), PostprocessError> {
        self.push(line_index, EditKind::Replace, instructions)
    }

    fn push(
        &mut self,
        line_index: usize,
        kind: EditKind,
        instructions: Vec<Instruction>,
    ) -> Result<(), PostprocessError> {
        if self.edits.last().is_some_and(|last| last.line_index >= line_index) {
            return Err(PostprocessError::OverlappingEdit {
                line: line_index + 1,
            });
        }
        self.edits.push(Edit {
            line_index,
            kind,
            instructions,
        });
        Ok(())
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Change in line count when the plan is applied.
    pub fn net_lines(&self) -> isize {
        self.edits
            .iter()
            .map(|edit| match edit.kind {
                EditKind::InsertBefore => edit.instructions.len() as isize,
                EditKind::Replace => edit.instructions.len() as isize - 1,
            })
            .sum()
    }
}

/// Planner switches, taken from `[postprocess]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlannerOptions {
    /// Ramp with `M109` instead of `M104`.
    pub wait_for_temperature: bool,
    /// Feed rate attached to wipe moves.
    pub wipe_feed_rate: Option<f64>,
}

/// Planner output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Planned {
    pub plan: EditPlan,
    pub diagnostics: Diagnostics,
    /// Temperature ramps inserted for incoming tools.
    pub ramps: usize,
    /// Wipe sequences inserted for outgoing tools.
    pub wipes: usize,
    /// Idle ramp-downs inserted for outgoing tools.
    pub idle_ramps: usize,
}

/// A temperature the planner itself scheduled, and where.
#[derive(Debug, Clone, Copy)]
struct Scheduled {
    target: f64,
    before_line: usize,
}

/// Plan temperature ramps and wipes for `regions`.
///
/// Regions with an unconfigured tool get no edits and an
/// [`DiagnosticKind::UnknownTool`] warning. Oozy tools without a home position
/// lose only their wipe and get a [`DiagnosticKind::MissingHomePosition`].
pub fn plan(
    regions: &[ToolChangeRegion],
    materials: &MaterialTable,
    options: &PlannerOptions,
) -> Result<Planned, PostprocessError> {
    let mut planned = Planned::default();
    let mut scheduled: BTreeMap<u32, Scheduled> = BTreeMap::new();

    for region in regions {
        let (incoming, outgoing) = match resolve_profiles(region, materials) {
            Ok(profiles) => profiles,
            Err(diagnostic) => {
                planned.diagnostics.push(diagnostic);
                continue;
            }
        };

        let current = commanded_target(region, &scheduled);
        let needs_ramp = !current.is_some_and(|t| same_temperature(t, incoming.target_temperature));
        if needs_ramp {
            planned.plan.insert_before(
                region.start_index,
                vec![Instruction::set_temperature(
                    region.incoming_tool,
                    incoming.target_temperature,
                    options.wait_for_temperature,
                )],
            )?;
            scheduled.insert(
                region.incoming_tool,
                Scheduled {
                    target: incoming.target_temperature,
                    before_line: region.start_index,
                },
            );
            planned.ramps += 1;
        }

        // A region that re-selects the same tool parks nothing.
        let parked_tool = region
            .outgoing_tool
            .filter(|&tool| tool != region.incoming_tool);
        let mut parking = Vec::new();
        if let (Some(tool), Some(profile)) = (parked_tool, outgoing) {
            if let Some(wipe) = plan_wipe(region, profile, options, &mut planned.diagnostics) {
                parking.extend(wipe);
                planned.wipes += 1;
            }
            if let Some(idle) = profile.idle_temperature {
                parking.push(Instruction::set_temperature(tool, idle, false));
                scheduled.insert(
                    tool,
                    Scheduled {
                        target: idle,
                        before_line: region.end_index,
                    },
                );
                planned.idle_ramps += 1;
            }
        }
        if !parking.is_empty() {
            planned.plan.insert_before(region.end_index, parking)?;
        }

        debug!(
            start = region.start_index + 1,
            incoming = region.incoming_tool,
            ramp = needs_ramp,
            "Planned tool-change region"
        );
    }

    Ok(planned)
}

/// Look up both tools of a region; the first missing one is reported.
fn resolve_profiles<'a>(
    region: &ToolChangeRegion,
    materials: &'a MaterialTable,
) -> Result<(&'a MaterialProfile, Option<&'a MaterialProfile>), Diagnostic> {
    let unknown = |err: mmpost_config::material::MaterialError| {
        Diagnostic::new(
            DiagnosticKind::UnknownTool,
            Some(region.start_index),
            format!("{err}; region left unchanged"),
        )
    };
    let incoming = materials.lookup(region.incoming_tool).map_err(unknown)?;
    let outgoing = region
        .outgoing_tool
        .map(|tool| materials.lookup(tool))
        .transpose()
        .map_err(unknown)?;
    Ok((incoming, outgoing))
}

/// The incoming tool's target as of the region start.
///
/// A temperature the planner scheduled earlier wins over the program's own
/// commands, unless the program re-commanded the tool after that point.
fn commanded_target(
    region: &ToolChangeRegion,
    scheduled: &BTreeMap<u32, Scheduled>,
) -> Option<f64> {
    let from_program = region.incoming_commanded();
    match (scheduled.get(&region.incoming_tool), from_program) {
        (Some(ours), Some(theirs))
            if theirs.line_index.is_some_and(|line| line >= ours.before_line) =>
        {
            Some(theirs.target)
        }
        (Some(ours), _) => Some(ours.target),
        (None, theirs) => theirs.map(|c| c.target),
    }
}

fn plan_wipe(
    region: &ToolChangeRegion,
    profile: &MaterialProfile,
    options: &PlannerOptions,
    diagnostics: &mut Diagnostics,
) -> Option<[Instruction; 2]> {
    if !profile.is_oozy {
        return None;
    }
    if profile.wipe_offset.is_zero() {
        debug!(
            line = region.start_index + 1,
            material = %profile.material,
            "Zero wipe offset, no wipe"
        );
        return None;
    }
    let Some(home) = region.home_position else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MissingHomePosition,
            Some(region.start_index),
            format!(
                "no home move after start marker; wipe for oozy {} skipped",
                profile.material
            ),
        ));
        return None;
    };
    Some(wipe_moves(home, profile, options.wipe_feed_rate))
}

/// Out to `home + wipe_offset`, then back to `home`.
pub fn wipe_moves(home: Point, profile: &MaterialProfile, feed_rate: Option<f64>) -> [Instruction; 2] {
    [
        Instruction::linear_move(home.offset_by(profile.wipe_offset), feed_rate),
        Instruction::linear_move(home, feed_rate),
    ]
}
