#![deny(unsafe_code)]

//! mmpost core: the gcode rewriting engine.
//!
//! Data flows strictly forward: text → instructions ([`gcode::parse`]) →
//! tool-change regions ([`scan::scan`]) → edit plan ([`plan::plan`]) →
//! edited instructions ([`rewrite::apply`]) → text ([`gcode::render`]).
//! [`Postprocessor`] drives the whole pipeline. The crate does no I/O.

/// Recoverable warnings collected during a run.
pub mod diagnostics;
/// Instruction model, reader, and serializer.
pub mod gcode;
/// Ramp & wipe planner and the edit plan it produces.
pub mod plan;
/// Pipeline driver.
pub mod postprocess;
/// Applies an edit plan to an instruction sequence.
pub mod rewrite;
/// Tool-change region scanner.
pub mod scan;
/// Active tool and commanded temperature tracking.
pub mod temperature;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use gcode::{Instruction, Program};
pub use plan::{EditPlan, PlannerOptions};
pub use postprocess::{Postprocessed, Postprocessor, Summary, postprocessed_path};
pub use scan::ToolChangeRegion;

/// Errors that abort a postprocessing run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PostprocessError {
    /// Start/end sentinels are nested or unbalanced.
    #[error("malformed tool-change region at line {line}: {reason}")]
    MalformedRegion { line: usize, reason: String },

    /// An edit targets a line at or before a previous edit.
    #[error("overlapping edit at line {line}")]
    OverlappingEdit { line: usize },
}

impl PostprocessError {
    /// A [`MalformedRegion`](Self::MalformedRegion) at a 0-based line index.
    pub(crate) fn malformed(line_index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRegion {
            line: line_index + 1,
            reason: reason.into(),
        }
    }
}
