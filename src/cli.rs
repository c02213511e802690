use std::{num::NonZeroUsize, path::PathBuf};

use bfi_types::{cellkind::EofPolicy, instructions::JumpStrategy};
use clap::{ArgGroup, Parser};

/// Handle CLI arguments for bfi
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["PROGRAM", "execute"])))]
pub struct Cli {
    /// The Brainfuck program to execute
    #[clap(name = "PROGRAM")]
    pub program: Option<PathBuf>,

    /// Execute CODE given on the command line instead of reading a file
    #[arg(short, long, value_name = "CODE", allow_hyphen_values = true)]
    pub execute: Option<String>,

    /// Write the program's output to FILE instead of stdout (`out.txt` if FILE is left out)
    #[arg(short, long, value_name = "FILE", num_args = 0..=1, default_missing_value = "out.txt")]
    pub output: Option<PathBuf>,

    /// Specifies the number of cells in the tape.
    ///
    /// Traditionally Brainfuck interpreters use a tape of 30,000 cells.
    #[arg(short, long)]
    pub cell_count: Option<NonZeroUsize>,

    /// Wrap cell values around instead of failing on overflow
    #[clap(short = 'w', long)]
    pub wrap: bool,

    /// Byte stored by `,` once input runs out, or `unchanged` to leave the cell alone
    #[arg(long, value_name = "VALUE", default_value_t = EofPolicy::default())]
    pub eof: EofPolicy,

    /// How loops find their matching bracket: `scan` or `table`
    #[arg(short, long, value_name = "STRATEGY", default_value_t = JumpStrategy::default())]
    pub jumps: JumpStrategy,

    /// Print the final state of the VM to stderr
    #[clap(short = 's', long)]
    pub report_state: bool,

    /// Print how long execution took to stderr
    #[clap(short = 't', long)]
    pub time: bool,
}
