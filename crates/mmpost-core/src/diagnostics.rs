//! Recoverable issues collected during a run.
//!
//! Anything that does not compromise output validity is reported as a
//! [`Diagnostic`] and processing continues; see [`crate::PostprocessError`]
//! for the fatal cases.

use std::fmt;

use serde::Serialize;

/// The kind of a recoverable issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A line's parameters could not be tokenized; the line was kept verbatim.
    ParseWarning,
    /// A region references a tool with no material profile; its edits were skipped.
    UnknownTool,
    /// An oozy tool's region has no home position; its wipe was skipped.
    MissingHomePosition,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ParseWarning => "parse warning",
            DiagnosticKind::UnknownTool => "unknown tool",
            DiagnosticKind::MissingHomePosition => "missing home position",
        };
        f.write_str(name)
    }
}

/// A single recoverable issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line number in the input, when the issue is tied to a line.
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic anchored at a 0-based `line_index`.
    pub fn new(kind: DiagnosticKind, line_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: line_index.map(|i| i + 1),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Number of diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.0.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
