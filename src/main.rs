mod cli;

use bfi_interp::{BrainfuckVM, ResourceError, VMBuilder, VMError};
use bfi_types::cellkind::OverflowPolicy;
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use std::time::Instant;

/// Entry point for the Brainfuck interpreter program.
///
/// Loads a Brainfuck program from a file (or takes it inline with `--execute`) and runs it
/// on a Brainfuck virtual machine.
///
/// # Errors
///
/// Problems loading the program or opening the output file are reported as initialization
/// errors and exit with status 2. Errors raised by the program itself name the character
/// offset that failed and exit with status 1.
///
/// # Examples
///
/// Run the program from the command line with:
/// ```bash
/// cargo run -- example.bf
/// cargo run -- --execute '++++++++[>++++++++<-]>+.'
/// ```
/// Set `RUST_LOG=debug` to trace every instruction as it is dispatched.
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Initialization(error)) => {
            eprintln!("Error during initialization:\n{}", error);
            ExitCode::from(2)
        }
        Err(Failure::Execution { program, error }) => {
            eprintln!("{}", describe_execution_error(&program, &error));
            ExitCode::from(1)
        }
    }
}

enum Failure {
    Initialization(ResourceError),
    Execution { program: String, error: VMError },
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let overflow_policy = if cli.wrap {
        OverflowPolicy::Wrap
    } else {
        OverflowPolicy::Error
    };

    let mut builder = VMBuilder::new()
        .set_cell_count(cli.cell_count)
        .set_overflow_policy(overflow_policy)
        .set_eof_policy(cli.eof)
        .set_jump_strategy(cli.jumps);

    // clap guarantees exactly one of these
    if let Some(code) = &cli.execute {
        builder = builder.set_program_source(code);
    } else if let Some(path) = &cli.program {
        builder = builder.set_program_file(path.clone());
    }

    if let Some(path) = &cli.output {
        builder = builder.set_output_file(path.clone());
    }

    let mut vm: BrainfuckVM<u8> = builder.build().map_err(Failure::Initialization)?;
    log::info!(
        "Running `{}` ({} instructions)",
        vm.program().name(),
        vm.program().instructions().len()
    );

    let start = Instant::now();
    match vm.interpret() {
        Ok(final_state) => {
            if cli.time {
                eprintln!(
                    "The program took {:.6} seconds to execute.",
                    start.elapsed().as_secs_f64()
                );
            }
            if cli.report_state {
                eprintln!("{}", final_state);
            }
            Ok(())
        }
        Err(error) => Err(Failure::Execution {
            program: vm.program().name().to_string(),
            error,
        }),
    }
}

fn describe_execution_error(program: &str, error: &VMError) -> String {
    match error.offset() {
        Some(offset) => format!("File \"{}\", char {}\nError: {}", program, offset, error),
        None => format!("File \"{}\"\nError: {}", program, error),
    }
}
