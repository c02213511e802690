//! Provides a builder for creating instances of the BrainfuckVM struct.
use crate::{vm::BrainfuckVM, vm_error::ResourceError, DEFAULT_CELL_COUNT};
use bfi_types::{
    cellkind::{CellKind, EofPolicy, OverflowPolicy},
    instructions::JumpStrategy,
    program::{Program, CONSOLE_INPUT},
};
use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    num::NonZeroUsize,
    path::PathBuf,
};

/// Main builder object. Creates a BrainfuckVM according to various configs.
///
/// Everything that can fail before execution (reading the program, opening an output
/// file) happens in [`VMBuilder::build`], so a built VM only fails on the program itself.
///
/// # Examples
///
/// Program from a string
///
/// ```rust
/// use bfi_interp::{BrainfuckVM, VMBuilder};
///
/// let program_string = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
///
/// let mut output = Vec::new();
/// let mut vm: BrainfuckVM<u8> = VMBuilder::new()
///     .set_program_source(program_string)
///     .set_output(&mut output)
///     .build()
///     .expect("Failed!");
/// vm.interpret().expect("Failed!");
/// drop(vm);
/// assert_eq!(output, b"Hello World!\n");
/// ```
///
/// Setting more interesting parameters
///
/// ```rust
/// use bfi_interp::{BrainfuckVM, VMBuilder};
/// use bfi_types::cellkind::{EofPolicy, OverflowPolicy};
/// use bfi_types::instructions::JumpStrategy;
/// # use core::num::NonZeroUsize;
///
/// let vm: BrainfuckVM<u8> = VMBuilder::new()
///     .set_program_source(",[.,]")
///     .set_cell_count(NonZeroUsize::new(1111))
///     .set_overflow_policy(OverflowPolicy::Wrap)
///     .set_eof_policy(EofPolicy::Sentinel(0))
///     .set_jump_strategy(JumpStrategy::Table)
///     .build()
///     .expect("Failed!");
/// ```
#[derive(Default)]
pub struct VMBuilder<'a> {
    cell_count: Option<NonZeroUsize>,
    overflow_policy: Option<OverflowPolicy>,
    eof_policy: Option<EofPolicy>,
    jump_strategy: Option<JumpStrategy>,
    input_reader: Option<Box<dyn Read + 'a>>,
    output_writer: Option<Box<dyn Write + 'a>>,
    output_file: Option<PathBuf>,
    program: Option<Program>,
    program_file: Option<PathBuf>,
    program_reader: Option<(String, Box<dyn Read + 'a>)>,
}

impl<'a> VMBuilder<'a> {
    /// Creates a new instance of `VMBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the VM to use a custom input stream.
    pub fn set_input<R>(mut self, input: R) -> Self
    where
        R: Read + 'a,
    {
        self.input_reader = Some(Box::new(input));
        self
    }

    /// Sets a custom output stream for the VM. Replaces any output file.
    pub fn set_output<W>(mut self, output: W) -> Self
    where
        W: Write + 'a,
    {
        self.output_writer = Some(Box::new(output));
        self.output_file = None;
        self
    }

    /// Sends output to a file, created (or truncated) by `build`. Replaces any output stream.
    pub fn set_output_file(mut self, path: PathBuf) -> Self {
        self.output_file = Some(path);
        self.output_writer = None;
        self
    }

    /// Uses an already parsed program.
    pub fn set_program(mut self, program: Program) -> Self {
        self.program = Some(program);
        self
    }

    /// Parses a program given inline. It is named `console input` in diagnostics.
    pub fn set_program_source(mut self, source: &str) -> Self {
        self.program = Some(Program::new(CONSOLE_INPUT, source));
        self
    }

    /// Sets a file path to read the BrainFuck program from
    pub fn set_program_file(mut self, filepath: PathBuf) -> Self {
        self.program_file = Some(filepath);
        self
    }

    /// Loads a Brainfuck program from a reader.
    pub fn set_program_reader<R>(mut self, name: impl Into<String>, reader: R) -> Self
    where
        R: Read + 'a,
    {
        self.program_reader = Some((name.into(), Box::new(reader)));
        self
    }

    /// Determines the number of cells (memory size) the VM should initialize with.
    pub fn set_cell_count(mut self, cell_count: Option<NonZeroUsize>) -> Self {
        match cell_count {
            Some(count) => self.cell_count = Some(count),
            None => {
                log::info!("Using default cell_count of {}", DEFAULT_CELL_COUNT);
                self.cell_count = Some(DEFAULT_CELL_COUNT);
            }
        }
        self
    }

    /// Chooses between failing and wrapping when a cell goes past its range.
    pub fn set_overflow_policy(mut self, overflow_policy: OverflowPolicy) -> Self {
        self.overflow_policy = Some(overflow_policy);
        self
    }

    /// Chooses what `,` stores once the input is exhausted.
    pub fn set_eof_policy(mut self, eof_policy: EofPolicy) -> Self {
        self.eof_policy = Some(eof_policy);
        self
    }

    /// Chooses how matching brackets are found when a jump is taken.
    pub fn set_jump_strategy(mut self, jump_strategy: JumpStrategy) -> Self {
        self.jump_strategy = Some(jump_strategy);
        self
    }

    fn load_program(&mut self) -> Result<Program, ResourceError> {
        if let Some(program) = self.program.take() {
            return Ok(program);
        }

        if let Some((name, reader)) = self.program_reader.take() {
            return Program::from_reader(name.clone(), reader)
                .map_err(|source| ResourceError::ReadProgram { name, source });
        }

        match self.program_file.take() {
            Some(program_file) => {
                Program::from_file(&program_file).map_err(|source| ResourceError::ReadProgram {
                    name: program_file.display().to_string(),
                    source,
                })
            }
            None => Err(ResourceError::MissingProgram),
        }
    }

    /// Builds and returns a `BrainfuckVM` instance based on the configured options.
    pub fn build<N>(mut self) -> Result<BrainfuckVM<'a, N>, ResourceError>
    where
        N: CellKind,
    {
        let program = self.load_program()?;
        log::info!(
            "Loaded program `{}` with {} instructions",
            program.name(),
            program.instructions().len()
        );

        let cell_count = self.cell_count.unwrap_or_else(|| {
            log::info!("Using default cell count {}", DEFAULT_CELL_COUNT);
            DEFAULT_CELL_COUNT
        });

        // An oversized tape is a ResourceError, not an abort
        let mut tape = Vec::new();
        tape.try_reserve_exact(cell_count.get())
            .map_err(|source| ResourceError::AllocateTape { cell_count, source })?;
        tape.resize(cell_count.get(), N::default());

        // Default IO to use stdin and stdout
        let input_reader: Box<dyn Read + 'a> = match self.input_reader {
            Some(reader) => reader,
            None => {
                log::info!("Using default stdin");
                Box::new(io::stdin())
            }
        };

        // Opening the output file here means a bad path is reported before anything runs
        let output_writer: Box<dyn Write + 'a> = match (self.output_writer, self.output_file) {
            (Some(writer), _) => writer,
            (None, Some(path)) => {
                let file = File::create(&path)
                    .map_err(|source| ResourceError::OpenOutput { path, source })?;
                Box::new(BufWriter::new(file))
            }
            (None, None) => {
                log::info!("Using default stdout");
                Box::new(io::stdout())
            }
        };

        let overflow_policy = self.overflow_policy.unwrap_or_else(|| {
            log::info!("Using default overflow policy {:?}", OverflowPolicy::default());
            OverflowPolicy::default()
        });

        let eof_policy = self.eof_policy.unwrap_or_else(|| {
            log::info!("Using default end of input value {}", EofPolicy::default());
            EofPolicy::default()
        });

        let jump_strategy = self.jump_strategy.unwrap_or_else(|| {
            log::info!("Using default jump strategy {}", JumpStrategy::default());
            JumpStrategy::default()
        });

        Ok(BrainfuckVM::with_tape(
            program,
            tape,
            overflow_policy,
            eof_policy,
            jump_strategy,
            input_reader,
            output_writer,
        ))
    }
}
