//! Pipeline driver.
//!
//! [`Postprocessor::run`] takes program text and returns the rewritten text
//! together with all recoverable [`Diagnostics`] and a run [`Summary`]. Only
//! a [`PostprocessError`] aborts; in that case there is no output at all.

use std::path::{Path, PathBuf};

use mmpost_config::material::MaterialTable;
use mmpost_config::{AppConfig, PostprocessConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::PostprocessError;
use crate::diagnostics::Diagnostics;
use crate::gcode::{Instruction, parse, render};
use crate::plan::{self, PlannerOptions};
use crate::rewrite;
use crate::scan;
use crate::temperature::compact_temperatures;

/// Counts describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub lines_in: usize,
    pub lines_out: usize,
    pub regions: usize,
    pub temperature_ramps: usize,
    pub wipes: usize,
    pub idle_ramps: usize,
    pub dropped_temperature_commands: usize,
    pub cooldown_commands: usize,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Postprocessed {
    /// The rewritten program.
    #[serde(skip)]
    pub text: String,
    pub diagnostics: Diagnostics,
    pub summary: Summary,
}

/// Rewrites programs against a fixed material table.
#[derive(Debug, Clone)]
pub struct Postprocessor {
    materials: MaterialTable,
    options: PostprocessConfig,
}

impl Postprocessor {
    /// Build from a validated configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_materials(config.build_material_table(), config.postprocess.clone())
    }

    pub fn with_materials(materials: MaterialTable, options: PostprocessConfig) -> Self {
        Self { materials, options }
    }

    /// Run the full pipeline over `text`.
    pub fn run(&self, text: &str) -> Result<Postprocessed, PostprocessError> {
        let (program, mut diagnostics) = parse(text);
        let configured: Vec<u32> = self.materials.tools().collect();
        let regions = scan::scan(&program.instructions, &configured)?;

        let planner = PlannerOptions {
            wait_for_temperature: self.options.wait_for_temperature,
            wipe_feed_rate: self.options.wipe_feed_rate,
        };
        let mut planned = plan::plan(&regions, &self.materials, &planner)?;

        let mut cooldown_commands = 0;
        if self.options.cooldown_at_end {
            let cooldown: Vec<_> = self
                .materials
                .tools()
                .map(|tool| Instruction::set_temperature(tool, 0.0, false))
                .collect();
            cooldown_commands = cooldown.len();
            planned
                .plan
                .insert_before(program.instructions.len(), cooldown)?;
        }

        let mut instructions = rewrite::apply(&program.instructions, &planned.plan);

        let mut dropped = 0;
        if self.options.minimize_temperatures {
            let (compaction, count) = compact_temperatures(&instructions, &regions)?;
            instructions = rewrite::apply(&instructions, &compaction);
            dropped = count;
        }

        diagnostics.extend(planned.diagnostics);
        for diagnostic in diagnostics.iter() {
            warn!(kind = %diagnostic.kind, line = ?diagnostic.line, "{}", diagnostic.message);
        }

        let summary = Summary {
            lines_in: program.instructions.len(),
            lines_out: instructions.len(),
            regions: regions.len(),
            temperature_ramps: planned.ramps,
            wipes: planned.wipes,
            idle_ramps: planned.idle_ramps,
            dropped_temperature_commands: dropped,
            cooldown_commands,
        };
        info!(
            regions = summary.regions,
            ramps = summary.temperature_ramps,
            wipes = summary.wipes,
            warnings = diagnostics.len(),
            "Postprocessed program"
        );

        Ok(Postprocessed {
            text: render(&instructions, program.line_ending),
            diagnostics,
            summary,
        })
    }
}

/// Sibling path with `suffix` inserted before the extension.
///
/// `dir/part.gcode` becomes `dir/part.<suffix>.gcode`; a name without an
/// extension just gets `.<suffix>` appended.
pub fn postprocessed_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(suffix);
    if let Some(extension) = input.extension() {
        name.push(".");
        name.push(extension);
    }
    input.with_file_name(name)
}
