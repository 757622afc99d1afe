//! Instruction rewriter.
//!
//! Builds a fresh sequence from the input and an [`EditPlan`]; the input is
//! never mutated. Edits are matched against each instruction's original
//! `line_index`, so a plan can be applied to a sequence that already
//! contains synthesized instructions (which pass through untouched).

use tracing::debug;

use crate::gcode::Instruction;
use crate::plan::{EditKind, EditPlan};

/// Apply `plan` to `instructions`.
///
/// Every instruction not targeted by a `replace` appears in the output in
/// its original relative order. Inserts anchored past the last line are
/// appended at the end.
pub fn apply(instructions: &[Instruction], plan: &EditPlan) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(instructions.len().saturating_add_signed(plan.net_lines()));
    let mut edits = plan.edits().iter().peekable();

    for instruction in instructions {
        let Some(index) = instruction.line_index else {
            out.push(instruction.clone());
            continue;
        };

        // Edits anchored at lines no longer present are stale.
        while let Some(edit) = edits.next_if(|edit| edit.line_index < index) {
            debug!(line = edit.line_index + 1, "Skipping edit for missing line");
        }

        match edits.next_if(|edit| edit.line_index == index) {
            Some(edit) => {
                out.extend(edit.instructions.iter().cloned());
                if edit.kind == EditKind::InsertBefore {
                    out.push(instruction.clone());
                }
            }
            None => out.push(instruction.clone()),
        }
    }

    for edit in edits {
        match edit.kind {
            EditKind::InsertBefore => out.extend(edit.instructions.iter().cloned()),
            EditKind::Replace => {
                debug!(line = edit.line_index + 1, "Skipping replace past end of program");
            }
        }
    }

    out
}
