//! Active-tool and commanded-temperature tracking.
//!
//! [`ToolState`] is a fold over the instruction stream: `T<n>` selects the
//! active tool, `M104`/`M109` set a tool's target (`T` parameter, else the
//! active tool). The scanner snapshots it at region starts, and
//! [`compact_temperatures`] uses it to drop redundant temperature commands.

use std::collections::BTreeMap;

use tracing::debug;

use crate::PostprocessError;
use crate::gcode::{Instruction, M104, M109};
use crate::plan::EditPlan;
use crate::scan::ToolChangeRegion;

/// Temperatures closer than this are considered equal.
pub const TEMPERATURE_EPSILON: f64 = 1e-6;

/// Whether two temperatures are the same setpoint.
pub fn same_temperature(a: f64, b: f64) -> bool {
    (a - b).abs() < TEMPERATURE_EPSILON
}

/// The last temperature commanded for a tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commanded {
    /// Target temperature in degrees Celsius.
    pub target: f64,
    /// Whether the program waited for the target (`M109`).
    pub reached: bool,
    /// Line index of the command, `None` if synthesized.
    pub line_index: Option<usize>,
}

/// A decoded `M104`/`M109`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureCommand {
    pub tool: u32,
    pub target: f64,
    pub wait: bool,
}

/// What an instruction did to the tool state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observed {
    ToolSelected(u32),
    Temperature(TemperatureCommand),
    Nothing,
}

/// Running active tool and per-tool commanded temperatures.
#[derive(Debug, Clone, Default)]
pub struct ToolState {
    active_tool: Option<u32>,
    commanded: BTreeMap<u32, Commanded>,
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tool selected by the last `T<n>` (or region close).
    pub fn active_tool(&self) -> Option<u32> {
        self.active_tool
    }

    /// Make `tool` the active tool.
    pub fn select_tool(&mut self, tool: u32) {
        self.active_tool = Some(tool);
    }

    /// The last temperature commanded for `tool`.
    pub fn commanded(&self, tool: u32) -> Option<Commanded> {
        self.commanded.get(&tool).copied()
    }

    /// All commanded temperatures, by tool.
    pub fn snapshot(&self) -> BTreeMap<u32, Commanded> {
        self.commanded.clone()
    }

    /// Decode a temperature command against the current active tool.
    pub fn temperature_command(&self, instruction: &Instruction) -> Option<TemperatureCommand> {
        let command = instruction.command?;
        let wait = match command {
            M104 => false,
            M109 => true,
            _ => return None,
        };
        let target = instruction.value('S')?;
        let tool = match instruction.value('T') {
            Some(t) if t >= 0.0 && t.fract() == 0.0 => t as u32,
            Some(_) => return None,
            None => self.active_tool?,
        };
        Some(TemperatureCommand { tool, target, wait })
    }

    /// Fold one instruction into the state.
    pub fn observe(&mut self, instruction: &Instruction) -> Observed {
        if let Some(tool) = instruction.tool_select() {
            self.select_tool(tool);
            return Observed::ToolSelected(tool);
        }
        match self.temperature_command(instruction) {
            Some(command) => {
                self.commanded.insert(
                    command.tool,
                    Commanded {
                        target: command.target,
                        reached: command.wait,
                        line_index: instruction.line_index,
                    },
                );
                Observed::Temperature(command)
            }
            None => Observed::Nothing,
        }
    }

    /// Whether `command` would be redundant given the current state.
    ///
    /// An `M104` is redundant when the tool already has the same target; an
    /// `M109` only when that target was also already waited for.
    pub fn is_redundant(&self, command: &TemperatureCommand) -> bool {
        match self.commanded(command.tool) {
            Some(prev) if same_temperature(prev.target, command.target) => {
                !command.wait || prev.reached
            }
            _ => false,
        }
    }
}

/// Plan deletions of redundant temperature commands.
///
/// Only instructions from the original program are deleted; synthesized
/// ones still update the state. Each region's end marker selects its
/// incoming tool, the same way the scanner does. Returns the plan and the
/// number of deletions.
pub fn compact_temperatures(
    instructions: &[Instruction],
    regions: &[ToolChangeRegion],
) -> Result<(EditPlan, usize), PostprocessError> {
    let mut state = ToolState::new();
    let mut plan = EditPlan::new();
    let mut dropped = 0;
    let mut ends = regions.iter().peekable();

    for instruction in instructions {
        let redundant = state
            .temperature_command(instruction)
            .filter(|command| state.is_redundant(command));
        if let (Some(command), Some(index)) = (redundant, instruction.line_index) {
            debug!(
                line = index + 1,
                tool = command.tool,
                target = command.target,
                "Dropping redundant temperature command"
            );
            plan.replace(index, Vec::new())?;
            dropped += 1;
        }
        state.observe(instruction);

        if let Some(index) = instruction.line_index {
            while let Some(region) = ends.next_if(|region| region.end_index <= index) {
                if region.end_index == index {
                    state.select_tool(region.incoming_tool);
                }
            }
        }
    }

    Ok((plan, dropped))
}
