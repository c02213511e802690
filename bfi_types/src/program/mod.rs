use crate::instructions::{
    scan_backward, scan_forward, HumanReadableInstruction, JumpStrategy, JumpTable,
    RawInstruction,
};
use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

/// Name given to programs passed inline rather than loaded from a file.
pub const CONSOLE_INPUT: &str = "console input";

/// A Brainfuck program. Holds the name it was loaded under (used in
/// diagnostics), every operator in the source with its position, and the
/// matching table for its brackets.
#[derive(Debug, Clone)]
pub struct Program {
    name: String,
    instructions: Vec<HumanReadableInstruction>,
    source_len: usize,
    jump_table: JumpTable,
}

impl Program {
    /// Parse `source`. Any character that is not one of the eight operators is a comment.
    ///
    /// ```
    /// use bfi_types::Program;
    ///
    /// let program = Program::new("example.bf", "+ add one\n.");
    /// assert_eq!(program.instructions().len(), 2);
    /// assert_eq!(program.instructions()[1].offset(), 10);
    /// ```
    pub fn new(name: impl Into<String>, source: &str) -> Self {
        let instructions = Self::parse(source);
        let jump_table = JumpTable::new(&instructions);
        Program {
            name: name.into(),
            instructions,
            source_len: source.chars().count(),
            jump_table,
        }
    }

    /// Read the whole of `reader` and parse it. Invalid UTF-8 is replaced, not rejected,
    /// since it can only ever be a comment.
    ///
    /// Offsets count characters of the decoded text, not bytes. A multi-byte character, or
    /// a run of invalid bytes collapsed into one replacement character, moves the offsets of
    /// later instructions by one, so they differ from byte positions in the file.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> io::Result<Self> {
        let mut buffer = Vec::new();
        BufReader::new(reader).read_to_end(&mut buffer)?;
        Ok(Self::new(name, &String::from_utf8_lossy(&buffer)))
    }

    /// Load a program from a file, named after its path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(path.display().to_string(), file)
    }

    fn parse(source: &str) -> Vec<HumanReadableInstruction> {
        let mut instructions = Vec::new();
        let mut line = 0;
        let mut column = 0;

        for (offset, c) in source.chars().enumerate() {
            if let Some(instruction) = RawInstruction::from_char(c) {
                instructions.push(HumanReadableInstruction::new(
                    instruction,
                    offset,
                    line,
                    column,
                ));
            }
            if c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }

        instructions
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[HumanReadableInstruction] {
        &self.instructions
    }

    /// Length of the source text in characters, comments included.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Index of the bracket matching the one at `index`, or `None` if it is unmatched
    /// (or not a bracket at all).
    pub fn matching_bracket(&self, index: usize, strategy: JumpStrategy) -> Option<usize> {
        match strategy {
            JumpStrategy::Table => self.jump_table.get(index),
            JumpStrategy::Scan => match self.instructions.get(index)?.raw_instruction() {
                RawInstruction::ConditionalForward => scan_forward(&self.instructions, index),
                RawInstruction::ConditionalBackward => scan_backward(&self.instructions, index),
                _ => None,
            },
        }
    }
}
