//! # Brainfuck Program Representation and State Management
//!
//! Provides the types shared by the interpreter and its callers: parsed
//! programs with source positions for diagnostics, the two loop-matching
//! strategies, cell arithmetic policies and snapshots of the virtual machine.
//!
//! For more detailed examples and usage instructions, please refer to the documentation
//! of each module.

// Defines the types of cells used in a Brainfuck program's execution tape,
// and the overflow and end-of-input policies applied to them.
pub mod cellkind;

// Handles the parsing and representation of Brainfuck instructions and bracket matching.
pub mod instructions;

// Facilitates reading and parsing Brainfuck programs from files or strings.
pub mod program;

// Manages the state of the Brainfuck virtual machine during execution.
pub mod state;

pub use program::Program;
