//! Gcode instruction model, reader, and serializer.
//!
//! A program is an ordered list of [`Instruction`]s, one per input line.
//! Instructions read from the input carry their original `line_index` and
//! `raw_text` and are rendered back verbatim; synthesized instructions carry
//! no `line_index` and are rendered in canonical form.

use std::collections::BTreeMap;
use std::fmt;

use mmpost_config::material::Offset;

/// Text → instructions.
pub mod reader;
/// Instructions → text.
pub mod serializer;

pub use reader::parse;
pub use serializer::{format_instruction, format_number, render};

/// Comment marker for the supported dialect.
pub const COMMENT_MARKER: char = ';';

/// Parameter letter → value. A letter given without a value maps to `None`.
pub type Arguments = BTreeMap<char, Option<f64>>;

/// The line terminator that followed a line in the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Terminator {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// Final line of a file without a trailing newline.
    None,
}

impl Terminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminator::Lf => "\n",
            Terminator::CrLf => "\r\n",
            Terminator::None => "",
        }
    }
}

/// A command word: letter plus number, e.g. `G1`, `M104`, `T0`, `G38.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub letter: char,
    pub number: u32,
    pub subcode: Option<u32>,
}

impl Command {
    pub const fn new(letter: char, number: u32) -> Self {
        Self {
            letter,
            number,
            subcode: None,
        }
    }

    /// Parse a command word. Leading zeros are accepted (`G01` is `G1`).
    pub fn parse(word: &str) -> Option<Self> {
        let mut chars = word.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        let rest = chars.as_str();
        let (main, sub) = match rest.split_once('.') {
            Some((main, sub)) => (main, Some(sub)),
            None => (rest, None),
        };
        if main.is_empty() || !main.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = main.parse().ok()?;
        let subcode = match sub {
            Some(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => Some(s.parse().ok()?),
            Some(_) => return None,
            None => None,
        };
        Some(Self {
            letter,
            number,
            subcode,
        })
    }

    /// `G0` or `G1`.
    pub fn is_linear_move(&self) -> bool {
        self.letter == 'G' && self.subcode.is_none() && self.number <= 1
    }

    /// Any motion command (`G0`–`G3`).
    pub fn is_motion(&self) -> bool {
        self.letter == 'G' && self.subcode.is_none() && self.number <= 3
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)?;
        if let Some(sub) = self.subcode {
            write!(f, ".{sub}")?;
        }
        Ok(())
    }
}

pub const G1: Command = Command::new('G', 1);
pub const M104: Command = Command::new('M', 104);
pub const M109: Command = Command::new('M', 109);

/// A point on the build plate, in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This point displaced by `offset`.
    pub fn offset_by(&self, offset: Offset) -> Self {
        Self {
            x: self.x + offset.x,
            y: self.y + offset.y,
        }
    }
}

/// One line of a gcode program.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Position in the original program; `None` for synthesized instructions.
    pub line_index: Option<usize>,
    /// Leading command word, if the line has one that parsed.
    pub command: Option<Command>,
    /// Parameters following the command. Empty when they failed to parse.
    pub arguments: Arguments,
    /// Original line text without its terminator.
    pub raw_text: String,
    /// Whether the whole line is a comment.
    pub is_comment: bool,
    /// Terminator that followed the line in the input.
    pub terminator: Terminator,
}

impl Instruction {
    /// Start a synthesized instruction; add parameters with [`arg`](Self::arg).
    pub fn synthesized(command: Command) -> Self {
        Self {
            line_index: None,
            command: Some(command),
            arguments: Arguments::new(),
            raw_text: String::new(),
            is_comment: false,
            terminator: Terminator::None,
        }
    }

    /// Add (or overwrite) a parameter.
    pub fn arg(mut self, letter: char, value: f64) -> Self {
        self.arguments.insert(letter, Some(value));
        self
    }

    /// A temperature-set command for `tool`.
    pub fn set_temperature(tool: u32, temperature: f64, wait: bool) -> Self {
        let command = if wait { M109 } else { M104 };
        Self::synthesized(command)
            .arg('T', f64::from(tool))
            .arg('S', temperature)
    }

    /// A `G1` linear move to `point`, with an optional feed rate.
    pub fn linear_move(point: Point, feed_rate: Option<f64>) -> Self {
        let mv = Self::synthesized(G1).arg('X', point.x).arg('Y', point.y);
        match feed_rate {
            Some(feed) => mv.arg('F', feed),
            None => mv,
        }
    }

    /// Whether this instruction was produced by the rewriter.
    pub fn is_synthesized(&self) -> bool {
        self.line_index.is_none()
    }

    /// Whether the line has neither a command nor a comment.
    pub fn is_blank(&self) -> bool {
        self.command.is_none() && !self.is_comment && self.raw_text.trim().is_empty()
    }

    /// The value of a parameter, if present with a value.
    pub fn value(&self, letter: char) -> Option<f64> {
        self.arguments.get(&letter).copied().flatten()
    }

    /// Whether this is a `T<n>` tool-select command; returns the tool.
    pub fn tool_select(&self) -> Option<u32> {
        match self.command {
            Some(Command {
                letter: 'T',
                number,
                subcode: None,
            }) => Some(number),
            _ => None,
        }
    }

    /// Whether this is any motion command.
    pub fn is_motion(&self) -> bool {
        self.command.is_some_and(|c| c.is_motion())
    }

    /// The XY target of a `G0`/`G1` that names both axes.
    pub fn xy_target(&self) -> Option<Point> {
        if !self.command.is_some_and(|c| c.is_linear_move()) {
            return None;
        }
        Some(Point::new(self.value('X')?, self.value('Y')?))
    }

    /// The comment text of a whole-line comment, trimmed.
    pub fn comment_text(&self) -> Option<&str> {
        if self.is_comment {
            Some(self.raw_text.trim())
        } else {
            None
        }
    }
}

/// A parsed program plus the terminator used for synthesized lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// First terminator seen in the input, `\n` if none.
    pub line_ending: Terminator,
}
