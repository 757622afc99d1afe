//! Renders instructions back to program text.
//!
//! Instructions read from the input are written as their `raw_text` so that
//! untouched lines survive byte-for-byte. Synthesized instructions are written
//! in a canonical form: command, then parameters in [`CANONICAL_ORDER`], then
//! any remaining parameters alphabetically.

use super::{Instruction, Terminator};

/// Parameter letters that are written first, in this order.
pub const CANONICAL_ORDER: [char; 7] = ['T', 'S', 'X', 'Y', 'Z', 'E', 'F'];

const MAX_DECIMALS: usize = 4;

/// Render instructions to text.
///
/// `line_ending` terminates synthesized lines, and any unterminated input
/// line that is no longer the last one.
pub fn render(instructions: &[Instruction], line_ending: Terminator) -> String {
    let mut out = String::new();
    let last = instructions.len().saturating_sub(1);
    for (i, instruction) in instructions.iter().enumerate() {
        let ending = if instruction.is_synthesized() {
            out.push_str(&format_instruction(instruction));
            line_ending
        } else {
            out.push_str(&instruction.raw_text);
            match instruction.terminator {
                Terminator::None if i != last => line_ending,
                t => t,
            }
        };
        out.push_str(ending.as_str());
    }
    out
}

/// Format an instruction in canonical form, ignoring its `raw_text`.
pub fn format_instruction(instruction: &Instruction) -> String {
    let mut out = match instruction.command {
        Some(command) => command.to_string(),
        None => return instruction.raw_text.clone(),
    };

    let ordered = CANONICAL_ORDER
        .iter()
        .filter_map(|letter| instruction.arguments.get_key_value(letter));
    let rest = instruction
        .arguments
        .iter()
        .filter(|(letter, _)| !CANONICAL_ORDER.contains(*letter));

    for (letter, value) in ordered.chain(rest) {
        out.push(' ');
        out.push(*letter);
        if let Some(v) = value {
            out.push_str(&format_number(*v));
        }
    }
    out
}

/// Format a number with at most four decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    let mut text = format!("{:.*}", MAX_DECIMALS, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::{Command, G1, M104, Point, parse};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(210.0), "210");
        assert_eq!(format_number(15.5), "15.5");
        assert_eq!(format_number(-0.2), "-0.2");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.23456), "1.2346");
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(100.0), "100");
    }

    #[test]
    fn test_format_canonical_order() {
        let ins = Instruction::synthesized(G1)
            .arg('F', 1200.0)
            .arg('Y', 10.0)
            .arg('X', 15.0);
        assert_eq!(format_instruction(&ins), "G1 X15 Y10 F1200");

        let temp = Instruction::synthesized(M104).arg('S', 210.0).arg('T', 1.0);
        assert_eq!(format_instruction(&temp), "M104 T1 S210");
    }

    #[test]
    fn test_format_extra_letters_alphabetical() {
        let ins = Instruction::synthesized(Command::new('G', 2))
            .arg('J', 1.0)
            .arg('X', 2.0)
            .arg('I', -1.0);
        assert_eq!(format_instruction(&ins), "G2 X2 I-1 J1");
    }

    #[test]
    fn test_format_valueless_parameter() {
        let mut ins = Instruction::synthesized(Command::new('G', 28));
        ins.arguments.insert('X', None);
        assert_eq!(format_instruction(&ins), "G28 X");
    }

    #[test]
    fn test_render_roundtrip_passthrough() {
        let text = "; header\r\nG1 X1 Y2 ; inline\nM117 Hello world\n\nT0";
        let (program, _) = parse(text);
        assert_eq!(render(&program.instructions, program.line_ending), text);
    }

    #[test]
    fn test_render_synthesized_uses_line_ending() {
        let (program, _) = parse("G0 X0\r\nG0 X1\r\n");
        let mut instructions = program.instructions.clone();
        instructions.insert(1, Instruction::linear_move(Point::new(3.0, 4.0), None));
        assert_eq!(
            render(&instructions, program.line_ending),
            "G0 X0\r\nG1 X3 Y4\r\nG0 X1\r\n"
        );
    }

    #[test]
    fn test_render_terminates_formerly_last_line() {
        let (program, _) = parse("G0 X0\nG0 X1");
        let mut instructions = program.instructions.clone();
        instructions.push(Instruction::set_temperature(0, 0.0, false));
        assert_eq!(
            render(&instructions, program.line_ending),
            "G0 X0\nG0 X1\nM104 T0 S0\n"
        );
    }
}
