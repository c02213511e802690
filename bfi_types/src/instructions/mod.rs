use core::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Enum for the raw instructions
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RawInstruction {
    IncrementPointer,    // >
    DecrementPointer,    // <
    IncrementByte,       // +
    DecrementByte,       // -
    OutputByte,          // .
    InputByte,           // ,
    ConditionalForward,  // [
    ConditionalBackward, // ]
}

/// RawInstruction from a char value. Anything else is a comment.
impl RawInstruction {
    pub fn from_char(c: char) -> Option<RawInstruction> {
        match c {
            '>' => Some(RawInstruction::IncrementPointer),
            '<' => Some(RawInstruction::DecrementPointer),
            '+' => Some(RawInstruction::IncrementByte),
            '-' => Some(RawInstruction::DecrementByte),
            '.' => Some(RawInstruction::OutputByte),
            ',' => Some(RawInstruction::InputByte),
            '[' => Some(RawInstruction::ConditionalForward),
            ']' => Some(RawInstruction::ConditionalBackward),
            _ => None,
        }
    }
}

/// Corresponding display strings
impl fmt::Display for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawInstruction::IncrementPointer => write!(f, "Increment Pointer (>)"),
            RawInstruction::DecrementPointer => write!(f, "Decrement Pointer (<)"),
            RawInstruction::IncrementByte => write!(f, "Increment Byte (+)"),
            RawInstruction::DecrementByte => write!(f, "Decrement Byte (-)"),
            RawInstruction::OutputByte => write!(f, "Output Byte (.)"),
            RawInstruction::InputByte => write!(f, "Input Byte (,)"),
            RawInstruction::ConditionalForward => write!(f, "Conditional Forward ([)"),
            RawInstruction::ConditionalBackward => write!(f, "Conditional Backward (])"),
        }
    }
}

/// An instruction together with where it sits in the source text.
///
/// `offset` is the character index into the whole source (comments and
/// newlines included). `line` and `column` are 1-based and only used for
/// display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HumanReadableInstruction {
    instruction: RawInstruction,
    offset: usize,
    line: usize,
    column: usize,
}

impl HumanReadableInstruction {
    pub(crate) fn new(
        instruction: RawInstruction,
        offset: usize,
        line: usize,
        column: usize,
    ) -> Self {
        HumanReadableInstruction {
            instruction,
            offset,
            line: line + 1,
            column: column + 1,
        }
    }

    pub fn raw_instruction(&self) -> RawInstruction {
        self.instruction
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

/// Nice display strings
impl fmt::Display for HumanReadableInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.line, self.column, self.instruction)
    }
}

/// How the VM finds the partner of a bracket when it takes a jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpStrategy {
    /// Count bracket depth from the jumping bracket every time a jump is taken.
    #[default]
    Scan,
    /// Look the partner up in a table built once when the program is loaded.
    Table,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown jump strategy `{0}`, expected `scan` or `table`")]
pub struct ParseJumpStrategyError(String);

impl FromStr for JumpStrategy {
    type Err = ParseJumpStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scan" => Ok(JumpStrategy::Scan),
            "table" => Ok(JumpStrategy::Table),
            _ => Err(ParseJumpStrategyError(s.to_string())),
        }
    }
}

impl fmt::Display for JumpStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JumpStrategy::Scan => write!(f, "scan"),
            JumpStrategy::Table => write!(f, "table"),
        }
    }
}

/// Matching bracket positions, indexed by instruction index.
///
/// Unmatched brackets are left as `None` rather than rejected, so that an
/// unmatched bracket is only reported when the VM actually tries to jump from it.
#[derive(Debug, Clone)]
pub(crate) struct JumpTable {
    matching_brackets: Vec<Option<usize>>,
}

impl JumpTable {
    pub(crate) fn new(instructions: &[HumanReadableInstruction]) -> Self {
        let mut matching_brackets = vec![None; instructions.len()];
        // Track the open brackets with a stack
        let mut open_brackets = Vec::new();

        for (index, hr_instruction) in instructions.iter().enumerate() {
            match hr_instruction.raw_instruction() {
                RawInstruction::ConditionalForward => open_brackets.push(index),
                RawInstruction::ConditionalBackward => {
                    // The closing bracket matches the last open bracket. If we can't pop then it
                    // is unmatched
                    if let Some(open_bracket) = open_brackets.pop() {
                        matching_brackets[open_bracket] = Some(index);
                        matching_brackets[index] = Some(open_bracket);
                    } else {
                        log::debug!("Unmatched closing bracket at {}", hr_instruction);
                    }
                }
                _ => {}
            }
        }

        for open_bracket in open_brackets {
            log::debug!(
                "Unmatched opening bracket at {}",
                instructions[open_bracket]
            );
        }

        JumpTable { matching_brackets }
    }

    pub(crate) fn get(&self, index: usize) -> Option<usize> {
        self.matching_brackets.get(index).copied().flatten()
    }
}

/// Find the `]` closing the `[` at `index` by counting depth forwards.
pub(crate) fn scan_forward(instructions: &[HumanReadableInstruction], index: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (position, hr_instruction) in instructions.iter().enumerate().skip(index) {
        match hr_instruction.raw_instruction() {
            RawInstruction::ConditionalForward => depth += 1,
            RawInstruction::ConditionalBackward => {
                depth -= 1;
                if depth == 0 {
                    return Some(position);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the `[` opening the `]` at `index` by counting depth backwards.
pub(crate) fn scan_backward(
    instructions: &[HumanReadableInstruction],
    index: usize,
) -> Option<usize> {
    let mut depth = 0usize;
    for position in (0..=index).rev() {
        match instructions[position].raw_instruction() {
            RawInstruction::ConditionalBackward => depth += 1,
            RawInstruction::ConditionalForward => {
                depth -= 1;
                if depth == 0 {
                    return Some(position);
                }
            }
            _ => {}
        }
    }
    None
}
