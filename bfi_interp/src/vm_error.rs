use std::{collections::TryReserveError, io, num::NonZeroUsize, path::PathBuf};

use bfi_types::cellkind::Bound;
use bfi_types::instructions::HumanReadableInstruction;
use bfi_types::state::ExecutionStatus;
use thiserror::Error;

/// Which kind of failure stopped the VM, without the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PointerOutOfRange(Bound),
    ByteOverflow(Bound),
    UnmatchedLoopStart,
    UnmatchedLoopEnd,
    Io,
    NotRunning,
}

// Errors raised while executing a program. Everything except `NotRunning` names the
// instruction that failed, so callers can point at the offending character.
#[derive(Debug, Error)]
pub enum VMError {
    #[error("Pointer index out of range ({}) at {instruction}", attempted_index(.bound, .tape_len))]
    PointerOutOfRange {
        instruction: HumanReadableInstruction,
        bound: Bound,
        tape_len: usize,
    },
    #[error("Byte overflow ({bound} bound) at {instruction}")]
    ByteOverflow {
        instruction: HumanReadableInstruction,
        bound: Bound,
    },
    #[error("End of loop not found for {instruction}")]
    UnmatchedLoopStart { instruction: HumanReadableInstruction },
    #[error("Start of loop not found for {instruction}")]
    UnmatchedLoopEnd { instruction: HumanReadableInstruction },
    #[error("IO error at {instruction}: {source}")]
    Io {
        instruction: HumanReadableInstruction,
        #[source]
        source: io::Error,
    },
    #[error("Failed to flush output: {0}")]
    Flush(#[source] io::Error),
    #[error("The VM is not running, it has {status}")]
    NotRunning { status: ExecutionStatus },
}

fn attempted_index(bound: &Bound, tape_len: &usize) -> String {
    match bound {
        Bound::Upper => tape_len.to_string(),
        Bound::Lower => "-1".to_string(),
    }
}

impl VMError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VMError::PointerOutOfRange { bound, .. } => ErrorKind::PointerOutOfRange(*bound),
            VMError::ByteOverflow { bound, .. } => ErrorKind::ByteOverflow(*bound),
            VMError::UnmatchedLoopStart { .. } => ErrorKind::UnmatchedLoopStart,
            VMError::UnmatchedLoopEnd { .. } => ErrorKind::UnmatchedLoopEnd,
            VMError::Io { .. } | VMError::Flush(_) => ErrorKind::Io,
            VMError::NotRunning { .. } => ErrorKind::NotRunning,
        }
    }

    /// The instruction that failed, if the error belongs to one.
    pub fn instruction(&self) -> Option<&HumanReadableInstruction> {
        match self {
            VMError::PointerOutOfRange { instruction, .. }
            | VMError::ByteOverflow { instruction, .. }
            | VMError::UnmatchedLoopStart { instruction }
            | VMError::UnmatchedLoopEnd { instruction }
            | VMError::Io { instruction, .. } => Some(instruction),
            VMError::Flush(_) | VMError::NotRunning { .. } => None,
        }
    }

    /// Character offset of the failing instruction in the source.
    pub fn offset(&self) -> Option<usize> {
        self.instruction().map(HumanReadableInstruction::offset)
    }
}

// Problems getting a VM ready. None of these can happen once execution has started.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("No program was given, use set_program, set_program_source, set_program_reader or set_program_file")]
    MissingProgram,
    #[error("Unable to read the program `{name}`: {source}")]
    ReadProgram {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Unable to open the output file `{}`: {source}", .path.display())]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to allocate a tape of {cell_count} cells: {source}")]
    AllocateTape {
        cell_count: NonZeroUsize,
        #[source]
        source: TryReserveError,
    },
}
