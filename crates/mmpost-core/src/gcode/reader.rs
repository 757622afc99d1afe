//! Splits program text into [`Instruction`] records.
//!
//! The reader is permissive: most lines are irrelevant to the rewrite, so a
//! line whose parameters cannot be tokenized is kept verbatim with empty
//! arguments and reported as a [`DiagnosticKind::ParseWarning`].

use super::{Arguments, COMMENT_MARKER, Command, Instruction, Program, Terminator};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};

/// Parse program text into a [`Program`], collecting parse warnings.
pub fn parse(text: &str) -> (Program, Diagnostics) {
    let mut program = Program::default();
    let mut diagnostics = Diagnostics::new();
    let mut line_ending = None;

    for (index, chunk) in text.split_inclusive('\n').enumerate() {
        let (raw, terminator) = split_terminator(chunk);
        if terminator != Terminator::None && line_ending.is_none() {
            line_ending = Some(terminator);
        }

        let (instruction, warning) = parse_line(index, raw, terminator);
        if let Some(message) = warning {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ParseWarning,
                Some(index),
                message,
            ));
        }
        program.instructions.push(instruction);
    }

    program.line_ending = line_ending.unwrap_or_default();
    (program, diagnostics)
}

fn split_terminator(chunk: &str) -> (&str, Terminator) {
    if let Some(line) = chunk.strip_suffix("\r\n") {
        (line, Terminator::CrLf)
    } else if let Some(line) = chunk.strip_suffix('\n') {
        (line, Terminator::Lf)
    } else {
        (chunk, Terminator::None)
    }
}

/// Parse a single line. Returns the instruction and an optional warning.
fn parse_line(index: usize, raw: &str, terminator: Terminator) -> (Instruction, Option<String>) {
    let mut instruction = Instruction {
        line_index: Some(index),
        command: None,
        arguments: Arguments::new(),
        raw_text: raw.to_string(),
        is_comment: false,
        terminator,
    };

    let trimmed = raw.trim();
    if trimmed.starts_with(COMMENT_MARKER) {
        instruction.is_comment = true;
        return (instruction, None);
    }

    let code = match trimmed.split_once(COMMENT_MARKER) {
        Some((code, _comment)) => code,
        None => trimmed,
    };
    let mut words = code.split_whitespace();
    let Some(first) = words.next() else {
        return (instruction, None);
    };

    let Some(command) = Command::parse(first) else {
        return (instruction, Some(format!("unrecognised command word {first:?}")));
    };
    instruction.command = Some(command);

    match parse_arguments(words) {
        Ok(arguments) => instruction.arguments = arguments,
        Err(message) => return (instruction, Some(format!("{command}: {message}"))),
    }
    (instruction, None)
}

fn parse_arguments<'a>(words: impl Iterator<Item = &'a str>) -> Result<Arguments, String> {
    let mut arguments = Arguments::new();
    for word in words {
        let mut chars = word.chars();
        let letter = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => return Err(format!("malformed parameter {word:?}")),
        };
        let value = match chars.as_str() {
            "" => None,
            text => match text.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => return Err(format!("non-numeric value in parameter {word:?}")),
            },
        };
        if arguments.insert(letter, value).is_some() {
            return Err(format!("parameter {letter} given more than once"));
        }
    }
    Ok(arguments)
}
