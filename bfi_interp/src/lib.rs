//! A virtual machine for interpreting Brainfuck programs.
//!
//! The tape is a fixed number of `u8` cells, all starting at zero. Moving the
//! head off either end of the tape, or taking a cell past 0 or 255 (unless
//! wrapping is enabled), stops execution with a [`VMError`] naming the
//! character offset of the instruction that failed.

pub mod vm;
pub mod vm_builder;
pub mod vm_error;
pub mod vm_iterator;

use std::{
    io::{self, Read, Write},
    num::NonZeroUsize,
};

use bfi_types::{
    cellkind::{EofPolicy, OverflowPolicy},
    instructions::JumpStrategy,
    program::{Program, CONSOLE_INPUT},
};

pub use vm::{BrainfuckVM, Step};
pub use vm_builder::VMBuilder;
pub use vm_error::{ErrorKind, ResourceError, VMError};
pub use vm_iterator::VMIterator;

/// Traditionally Brainfuck interpreters use a tape of 30,000 cells.
pub const DEFAULT_CELL_COUNT: NonZeroUsize = match NonZeroUsize::new(30000) {
    Some(count) => count,
    None => panic!("cell count must be non-zero"),
};

/// Runs `source` with the default configuration, reading `,` from stdin and writing `.` to
/// `output`.
///
/// ```
/// let mut output = Vec::new();
/// bfi_interp::run("+++.", &mut output).expect("Failed!");
/// assert_eq!(output, vec![3]);
///
/// let error = bfi_interp::run("<", std::io::sink()).unwrap_err();
/// assert_eq!(error.offset(), Some(0));
/// ```
pub fn run<W>(source: &str, output: W) -> Result<(), VMError>
where
    W: Write,
{
    run_with_input(source, io::stdin(), output)
}

/// Like [`run`], with `,` reading from `input` instead of stdin.
pub fn run_with_input<R, W>(source: &str, input: R, output: W) -> Result<(), VMError>
where
    R: Read,
    W: Write,
{
    let mut vm: BrainfuckVM<u8> = BrainfuckVM::new(
        Program::new(CONSOLE_INPUT, source),
        DEFAULT_CELL_COUNT,
        OverflowPolicy::default(),
        EofPolicy::default(),
        JumpStrategy::default(),
        Box::new(input),
        Box::new(output),
    );
    vm.interpret().map(|_| ())
}
