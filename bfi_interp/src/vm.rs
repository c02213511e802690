use crate::vm_error::VMError;
use crate::vm_iterator::VMIterator;
use bfi_types::{
    cellkind::{Bound, CellKind, EofPolicy, OverflowPolicy},
    instructions::{JumpStrategy, RawInstruction},
    program::Program,
    state::{ExecutionStatus, VMState, VMStateFinal},
};
use std::{
    io::{self, Read, Write},
    num::NonZeroUsize,
};

/// What a single call to [`BrainfuckVM::interpret_step`] did.
#[derive(Debug, PartialEq)]
pub enum Step<N>
where
    N: CellKind,
{
    /// An instruction was dispatched and the VM is still running.
    Running(VMState<N>),
    /// The end of the program was reached. The VM will not run again.
    Halted(VMStateFinal<N>),
}

// Represents the VM capable of interpreting Brainfuck programs. It manages the execution environment
// including the tape (memory), the instruction pointer, input/output streams, and execution state.
pub struct BrainfuckVM<'a, N>
where
    N: CellKind,
{
    tape: Vec<N>,
    head: usize,
    instruction_index: usize,
    program: Program,
    input_reader: Box<dyn Read + 'a>,
    output_writer: Box<dyn Write + 'a>,
    instructions_processed: usize,
    overflow_policy: OverflowPolicy,
    eof_policy: EofPolicy,
    jump_strategy: JumpStrategy,
    status: ExecutionStatus,
}

impl<'a, N> BrainfuckVM<'a, N>
where
    N: CellKind,
{
    /// Constructs a new VM instance with specified settings.
    ///
    /// # Panics
    ///
    /// If a tape of `cell_count` cells cannot be allocated. [`VMBuilder::build`] reports that
    /// as an error instead.
    ///
    /// [`VMBuilder::build`]: crate::VMBuilder::build
    pub fn new(
        program: Program,
        cell_count: NonZeroUsize,
        overflow_policy: OverflowPolicy,
        eof_policy: EofPolicy,
        jump_strategy: JumpStrategy,
        input_reader: Box<dyn Read + 'a>,
        output_writer: Box<dyn Write + 'a>,
    ) -> Self {
        Self::with_tape(
            program,
            vec![N::default(); cell_count.get()],
            overflow_policy,
            eof_policy,
            jump_strategy,
            input_reader,
            output_writer,
        )
    }

    pub(crate) fn with_tape(
        program: Program,
        tape: Vec<N>,
        overflow_policy: OverflowPolicy,
        eof_policy: EofPolicy,
        jump_strategy: JumpStrategy,
        input_reader: Box<dyn Read + 'a>,
        output_writer: Box<dyn Write + 'a>,
    ) -> Self {
        BrainfuckVM {
            tape,
            head: 0,
            instruction_index: 0,
            program,
            input_reader,
            output_writer,
            instructions_processed: 0,
            overflow_policy,
            eof_policy,
            jump_strategy,
            status: ExecutionStatus::Running,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn instructions_processed(&self) -> usize {
        self.instructions_processed
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tape(&self) -> &[N] {
        &self.tape
    }

    pub fn current_cell_value(&self) -> N {
        // head is kept inside the tape by move_head_left/move_head_right
        self.tape[self.head]
    }

    fn current_cell(&mut self) -> &mut N {
        &mut self.tape[self.head]
    }

    fn state(&self, last_instruction: Option<RawInstruction>) -> VMState<N> {
        VMState::new(
            self.current_cell_value(),
            self.head,
            self.instruction_index,
            last_instruction,
            self.instructions_processed,
        )
    }

    fn final_state(&self) -> VMStateFinal<N> {
        VMStateFinal::new(self.state(None), self.tape.clone())
    }

    fn process_instruction(&mut self) -> Result<(), VMError> {
        // Most of the time, we just move forward by one. Only when a conditional jump is taken will it be different.
        let mut next_index = self.instruction_index + 1;
        let instruction = self.program.instructions()[self.instruction_index];
        log::debug!("Processing instruction: {}", instruction);
        match instruction.raw_instruction() {
            RawInstruction::IncrementPointer => {
                self.move_head_right()
                    .map_err(|bound| VMError::PointerOutOfRange {
                        instruction,
                        bound,
                        tape_len: self.tape.len(),
                    })?;
            }
            RawInstruction::DecrementPointer => {
                self.move_head_left()
                    .map_err(|bound| VMError::PointerOutOfRange {
                        instruction,
                        bound,
                        tape_len: self.tape.len(),
                    })?;
            }
            RawInstruction::IncrementByte => {
                let policy = self.overflow_policy;
                self.current_cell()
                    .increment(policy)
                    .map_err(|bound| VMError::ByteOverflow { instruction, bound })?;
            }
            RawInstruction::DecrementByte => {
                let policy = self.overflow_policy;
                self.current_cell()
                    .decrement(policy)
                    .map_err(|bound| VMError::ByteOverflow { instruction, bound })?;
            }
            RawInstruction::OutputByte => {
                self.write_value()
                    .map_err(|source| VMError::Io {
                        instruction,
                        source,
                    })?;
            }
            RawInstruction::InputByte => {
                self.read_value()
                    .map_err(|source| VMError::Io {
                        instruction,
                        source,
                    })?;
            }
            RawInstruction::ConditionalForward => {
                if self.current_cell_value().is_zero() {
                    let bracket_position = self
                        .program
                        .matching_bracket(self.instruction_index, self.jump_strategy)
                        .ok_or(VMError::UnmatchedLoopStart { instruction })?;
                    log::trace!("Jumping forward to {}", bracket_position + 1);
                    next_index = bracket_position + 1;
                }
            }
            RawInstruction::ConditionalBackward => {
                if !self.current_cell_value().is_zero() {
                    let bracket_position = self
                        .program
                        .matching_bracket(self.instruction_index, self.jump_strategy)
                        .ok_or(VMError::UnmatchedLoopEnd { instruction })?;
                    log::trace!("Jumping back to {}", bracket_position + 1);
                    next_index = bracket_position + 1;
                }
            }
        }
        // Track number of instructions processed
        self.instructions_processed += 1;

        // Move to the next instruction
        self.instruction_index = next_index;

        Ok(())
    }

    /// Executes a single step (instruction) of the program.
    ///
    /// Once the last instruction has run, the following call flushes the output and returns
    /// [`Step::Halted`]. After that, or after any error, the VM refuses to run again.
    pub fn interpret_step(&mut self) -> Result<Step<N>, VMError> {
        if self.status != ExecutionStatus::Running {
            return Err(VMError::NotRunning {
                status: self.status,
            });
        }

        let Some(instruction) = self.program.instructions().get(self.instruction_index) else {
            // Handle the end of the program
            return match self.output_writer.flush() {
                Ok(()) => {
                    self.status = ExecutionStatus::Finished;
                    log::info!(
                        "Finished after {} instructions",
                        self.instructions_processed
                    );
                    Ok(Step::Halted(self.final_state()))
                }
                Err(source) => {
                    self.status = ExecutionStatus::Failed;
                    Err(VMError::Flush(source))
                }
            };
        };
        let last_instruction = instruction.raw_instruction();

        match self.process_instruction() {
            Ok(()) => Ok(Step::Running(self.state(Some(last_instruction)))),
            Err(e) => {
                self.status = ExecutionStatus::Failed;
                log::warn!("Halting on error: {}", e);
                // Whatever was written before the failure still goes out
                if let Err(flush_error) = self.output_writer.flush() {
                    log::warn!("Failed to flush output after error: {}", flush_error);
                }
                Err(e)
            }
        }
    }

    // Runs the entire Brainfuck program to completion or until an error occurs
    pub fn interpret(&mut self) -> Result<VMStateFinal<N>, VMError> {
        loop {
            if let Step::Halted(final_state) = self.interpret_step()? {
                return Ok(final_state);
            }
        }
    }

    // Returns an iterator that allows stepping through the program execution
    pub fn iter(&mut self) -> VMIterator<'_, 'a, N> {
        VMIterator::new(self)
    }

    fn move_head_left(&mut self) -> Result<(), Bound> {
        if self.head == 0 {
            return Err(Bound::Lower);
        }
        self.head -= 1;
        Ok(())
    }

    fn move_head_right(&mut self) -> Result<(), Bound> {
        if self.head + 1 >= self.tape.len() {
            return Err(Bound::Upper);
        }
        self.head += 1;
        Ok(())
    }

    fn read_value(&mut self) -> io::Result<()> {
        let mut buffer = [0u8; 1];

        match self.input_reader.read_exact(&mut buffer) {
            Ok(()) => *self.current_cell() = N::from_byte(buffer[0]),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!("End of input, applying {:?}", self.eof_policy);
                if let EofPolicy::Sentinel(value) = self.eof_policy {
                    *self.current_cell() = N::from_byte(value);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn write_value(&mut self) -> io::Result<()> {
        let byte = self.current_cell_value().to_byte();
        self.output_writer.write_all(&[byte])
    }
}

#[cfg(test)]
mod vm_tests {
    use super::*;
    use crate::vm_builder::VMBuilder;
    use crate::vm_error::ErrorKind;
    use bfi_test_utils::{FailingWriter, NullWriter, TestFile};
    use log::LevelFilter;
    use rand::Rng;
    use std::io::Cursor;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // Setup logging for any tests that it might be useful for
    pub fn setup_logging() {
        // Just use Debug level for tests
        let test_log_level = LevelFilter::Debug;
        let _ = env_logger::builder()
            .is_test(true)
            .filter(None, test_log_level)
            .try_init();
    }

    // Helper function to setup a test u8 VM with a program from a string, discarding output
    pub fn setup_vm_from_string(
        program_string: &str,
        cell_count: Option<NonZeroUsize>,
    ) -> Result<BrainfuckVM<'static, u8>, Box<dyn std::error::Error>> {
        let vm = VMBuilder::new()
            .set_program_source(program_string)
            .set_cell_count(cell_count)
            .set_input(io::empty())
            .set_output(NullWriter)
            .build()?;
        Ok(vm)
    }

    // Run a program with both jump strategies and check they agree, returning the output and
    // the outcome of the table run
    fn run_both_strategies(
        program_string: &str,
        input: &[u8],
    ) -> (Vec<u8>, Result<VMStateFinal<u8>, VMError>) {
        let mut results = Vec::new();
        for strategy in [JumpStrategy::Scan, JumpStrategy::Table] {
            let mut output = Vec::new();
            let result = {
                let mut vm: BrainfuckVM<u8> = VMBuilder::new()
                    .set_program_source(program_string)
                    .set_jump_strategy(strategy)
                    .set_input(input)
                    .set_output(&mut output)
                    .build()
                    .expect("Failed to build VM");
                vm.interpret()
            };
            results.push((output, result));
        }

        let (table_output, table_result) = results.pop().expect("Table run");
        let (scan_output, scan_result) = results.pop().expect("Scan run");
        assert_eq!(scan_output, table_output, "Output differs for {:?}", program_string);
        match (&scan_result, &table_result) {
            (Ok(scan), Ok(table)) => assert_eq!(scan, table),
            (Err(scan), Err(table)) => {
                assert_eq!(scan.kind(), table.kind());
                assert_eq!(scan.offset(), table.offset());
            }
            _ => panic!(
                "Strategies disagree for {:?}: {:?} vs {:?}",
                program_string, scan_result, table_result
            ),
        }
        (table_output, table_result)
    }

    fn expect_error(result: Result<VMStateFinal<u8>, VMError>) -> VMError {
        match result {
            Ok(state) => panic!("Expected an error, got final state:\n{}", state),
            Err(e) => e,
        }
    }

    #[test]
    fn test_vm_initialization() -> TestResult {
        let vm: BrainfuckVM<u8> = VMBuilder::new()
            .set_input(io::empty())
            .set_program_reader("test.bf", TestFile::new()?)
            .set_cell_count(NonZeroUsize::new(30000))
            .set_output(NullWriter)
            .build()?;
        assert_eq!(vm.tape.len(), 30000);
        assert!(vm.tape.iter().all(|&x| x == 0));
        assert_eq!(vm.head, 0);
        assert_eq!(vm.instruction_index, 0);
        assert_eq!(vm.status(), ExecutionStatus::Running);
        assert_eq!(vm.program().name(), "test.bf");
        Ok(())
    }

    #[test]
    fn test_empty_program() -> TestResult {
        let (output, result) = run_both_strategies("", &[]);
        let final_state = result?;
        assert!(output.is_empty());
        assert_eq!(final_state.state().instructions_processed(), 0);
        Ok(())
    }

    #[test]
    fn test_comments_only_program() -> TestResult {
        let (output, result) = run_both_strategies("Just some words\nand no operators", &[]);
        result?;
        assert!(output.is_empty());
        Ok(())
    }

    #[test]
    fn test_move_head_success() -> TestResult {
        let half_way = 5;
        let program_string = format!("{}{}", ">".repeat(half_way), "<".repeat(half_way));
        let mut vm = setup_vm_from_string(&program_string, NonZeroUsize::new(half_way + 1))?;

        for step in 1..=half_way {
            match vm.interpret_step()? {
                Step::Running(state) => {
                    assert_eq!(state.last_instruction(), Some(RawInstruction::IncrementPointer));
                    assert_eq!(state.head(), step);
                }
                Step::Halted(_) => panic!("Halted early"),
            }
        }
        for step in 1..=half_way {
            match vm.interpret_step()? {
                Step::Running(state) => assert_eq!(state.head(), half_way - step),
                Step::Halted(_) => panic!("Halted early"),
            }
        }

        let expected_final_state = VMState::<u8>::new(0, 0, 2 * half_way, None, 2 * half_way);
        match vm.interpret_step()? {
            Step::Halted(final_state) => assert_eq!(final_state.state(), &expected_final_state),
            Step::Running(_) => panic!("Expected the end of the program"),
        }
        Ok(())
    }

    #[test]
    fn test_move_head_left_error() -> TestResult {
        let mut vm = setup_vm_from_string("<", None)?;

        let error = expect_error(vm.interpret());
        assert_eq!(error.kind(), ErrorKind::PointerOutOfRange(Bound::Lower));
        assert_eq!(error.offset(), Some(0));
        assert_eq!(vm.head(), 0);
        assert_eq!(vm.status(), ExecutionStatus::Failed);
        Ok(())
    }

    #[test]
    fn test_move_head_right_error() -> TestResult {
        let mut vm = setup_vm_from_string(">", NonZeroUsize::new(1))?;

        let error = expect_error(vm.interpret());
        assert_eq!(error.kind(), ErrorKind::PointerOutOfRange(Bound::Upper));
        assert_eq!(error.offset(), Some(0));
        assert_eq!(vm.head(), 0);
        Ok(())
    }

    #[test]
    fn test_right_edge_of_tape() -> TestResult {
        // With N cells, the N-th `>` (offset N - 1) is the first that fails
        for cell_count in [1, 2, 7, 30000] {
            let program_string = ">".repeat(cell_count);
            let mut vm = setup_vm_from_string(&program_string, NonZeroUsize::new(cell_count))?;

            let error = expect_error(vm.interpret());
            assert_eq!(error.kind(), ErrorKind::PointerOutOfRange(Bound::Upper));
            assert_eq!(error.offset(), Some(cell_count - 1));
            assert_eq!(vm.head(), cell_count - 1);
            assert_eq!(vm.instructions_processed(), cell_count - 1);

            // One fewer `>` fits
            let mut vm = setup_vm_from_string(&program_string[1..], NonZeroUsize::new(cell_count))?;
            vm.interpret()?;
            assert_eq!(vm.head(), cell_count - 1);
        }
        Ok(())
    }

    #[test]
    fn test_increment_decrement_success() -> TestResult {
        let max_cell_value = u8::MAX as usize;
        let program_string = format!("{}{}", "+".repeat(max_cell_value), "-".repeat(max_cell_value));
        let mut vm = setup_vm_from_string(&program_string, NonZeroUsize::new(1))?;

        for _ in 0..max_cell_value {
            vm.interpret_step()?;
        }
        assert_eq!(vm.current_cell_value(), u8::MAX);

        let final_state = vm.interpret()?;
        assert_eq!(final_state.state().cell_value(), 0);
        assert_eq!(final_state.state().instructions_processed(), 2 * max_cell_value);
        Ok(())
    }

    #[test]
    fn test_increment_overflow_error() -> TestResult {
        let program_string = "+".repeat(u8::MAX as usize + 1);
        let mut vm = setup_vm_from_string(&program_string, None)?;

        let error = expect_error(vm.interpret());
        assert_eq!(error.kind(), ErrorKind::ByteOverflow(Bound::Upper));
        assert_eq!(error.offset(), Some(u8::MAX as usize));
        // The failing increment leaves the cell alone
        assert_eq!(vm.current_cell_value(), u8::MAX);
        Ok(())
    }

    #[test]
    fn test_decrement_overflow_error() -> TestResult {
        let mut vm = setup_vm_from_string("x-", None)?;

        let error = expect_error(vm.interpret());
        assert_eq!(error.kind(), ErrorKind::ByteOverflow(Bound::Lower));
        assert_eq!(error.offset(), Some(1));
        assert_eq!(vm.current_cell_value(), 0);
        Ok(())
    }

    #[test]
    fn test_wrapping_policy() -> TestResult {
        let mut vm: BrainfuckVM<u8> = VMBuilder::new()
            .set_input(io::empty())
            .set_program_source("-")
            .set_overflow_policy(OverflowPolicy::Wrap)
            .set_output(NullWriter)
            .build()?;
        vm.interpret()?;
        assert_eq!(vm.current_cell_value(), 255);

        let program_string = "+".repeat(u8::MAX as usize + 1);
        let mut vm: BrainfuckVM<u8> = VMBuilder::new()
            .set_input(io::empty())
            .set_program_source(&program_string)
            .set_overflow_policy(OverflowPolicy::Wrap)
            .set_output(NullWriter)
            .build()?;
        vm.interpret()?;
        assert_eq!(vm.current_cell_value(), 0);
        Ok(())
    }

    #[test]
    fn test_output_three() -> TestResult {
        let (output, result) = run_both_strategies("+++.", &[]);
        result?;
        assert_eq!(output, vec![3]);
        Ok(())
    }

    #[test]
    fn test_pointer_round_trip_output() -> TestResult {
        let (output, result) = run_both_strategies(">>>+.<<<", &[]);
        let final_state = result?;
        assert_eq!(output, vec![1]);
        assert_eq!(final_state.state().head(), 0);
        assert_eq!(final_state.non_zero_cells().collect::<Vec<_>>(), vec![(3, 1)]);
        Ok(())
    }

    #[test]
    fn test_clear_loop() -> TestResult {
        let (_, result) = run_both_strategies("+[-]", &[]);
        let final_state = result?;
        assert_eq!(final_state.tape()[0], 0);
        // The closing bracket falls through once the cell is zero, so each instruction runs once
        assert_eq!(final_state.state().instructions_processed(), 4);
        Ok(())
    }

    #[test]
    fn test_unmatched_loop_start() -> TestResult {
        let (_, result) = run_both_strategies("[", &[]);
        let error = expect_error(result);
        assert_eq!(error.kind(), ErrorKind::UnmatchedLoopStart);
        assert_eq!(error.offset(), Some(0));

        // The opening bracket is blamed, not the end of the source
        let (_, result) = run_both_strategies("++>[<-->]][", &[]);
        let error = expect_error(result);
        assert_eq!(error.kind(), ErrorKind::UnmatchedLoopStart);
        assert_eq!(error.offset(), Some(10));
        Ok(())
    }

    #[test]
    fn test_unmatched_loop_start_not_taken() -> TestResult {
        // A non-zero cell never looks for the partner
        let (_, result) = run_both_strategies("+[", &[]);
        result?;
        Ok(())
    }

    #[test]
    fn test_unmatched_loop_end() -> TestResult {
        let (_, result) = run_both_strategies("+ ]", &[]);
        let error = expect_error(result);
        assert_eq!(error.kind(), ErrorKind::UnmatchedLoopEnd);
        assert_eq!(error.offset(), Some(2));

        // A zero cell falls through without looking
        let (_, result) = run_both_strategies("]", &[]);
        result?;
        Ok(())
    }

    #[test]
    fn test_output_before_error_is_kept() -> TestResult {
        let (output, result) = run_both_strategies("+.+.<", &[]);
        let error = expect_error(result);
        assert_eq!(error.kind(), ErrorKind::PointerOutOfRange(Bound::Lower));
        assert_eq!(error.offset(), Some(4));
        assert_eq!(output, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_hello_world() -> TestResult {
        let program_string = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
        let (output, result) = run_both_strategies(program_string, &[]);
        result?;
        assert_eq!(String::from_utf8(output)?, "Hello World!\n");
        Ok(())
    }

    #[test]
    fn test_nested_loops_from_test_file() -> TestResult {
        let mut vm: BrainfuckVM<u8> = VMBuilder::new()
            .set_input(io::empty())
            .set_program_reader("test.bf", TestFile::new()?)
            .set_output(NullWriter)
            .build()?;
        // "+[-[<<[+[--->]-[<<<]]]>>>-]": the second bracket skips to the end of the outer
        // loop body, then `>>>-` decrements an empty cell
        let error = expect_error(vm.interpret());
        assert_eq!(error.kind(), ErrorKind::ByteOverflow(Bound::Lower));
        assert_eq!(error.offset(), Some(25));
        assert_eq!(vm.head(), 3);
        assert_eq!(vm.instructions_processed(), 7);
        Ok(())
    }

    #[test]
    fn test_input_success() -> TestResult {
        setup_logging();

        let number_of_instructions = 10000;
        let program_string = ",".repeat(number_of_instructions);

        // Generate some random u8 values
        let mut rng = rand::thread_rng();
        let mut buffer = vec![0u8; number_of_instructions];
        rng.fill(&mut buffer[..]);

        let mut vm: BrainfuckVM<u8> = VMBuilder::new()
            .set_program_source(&program_string)
            .set_cell_count(NonZeroUsize::new(1))
            .set_input(Cursor::new(buffer.clone()))
            .set_output(NullWriter)
            .build()?;

        for rng_value in buffer.iter() {
            match vm.interpret_step()? {
                Step::Running(state) => {
                    assert_eq!(
                        state.cell_value(),
                        *rng_value,
                        "Cell value should match the read value"
                    );
                }
                Step::Halted(_) => panic!("Halted early"),
            }
        }

        let final_state = vm.interpret()?;
        assert_eq!(final_state.state().cell_value(), buffer[number_of_instructions - 1]);
        Ok(())
    }

    #[test]
    fn test_eof_policies() -> TestResult {
        let cases = [
            (EofPolicy::default(), 255),
            (EofPolicy::Sentinel(0), 0),
            (EofPolicy::Unchanged, 7),
        ];
        for (eof_policy, expected) in cases {
            let mut vm: BrainfuckVM<u8> = VMBuilder::new()
                .set_program_source("+++++++,")
                .set_eof_policy(eof_policy)
                .set_input(io::empty())
                .set_output(NullWriter)
                .build()?;
            vm.interpret()?;
            assert_eq!(vm.current_cell_value(), expected, "With {:?}", eof_policy);
        }
        Ok(())
    }

    #[test]
    fn test_cat_until_zero_sentinel() -> TestResult {
        let mut output = Vec::new();
        {
            let mut vm: BrainfuckVM<u8> = VMBuilder::new()
                .set_program_source(",[.,]")
                .set_eof_policy(EofPolicy::Sentinel(0))
                .set_input(&b"abc"[..])
                .set_output(&mut output)
                .build()?;
            vm.interpret()?;
        }
        assert_eq!(output, b"abc");
        Ok(())
    }

    #[test]
    fn test_output_success() -> TestResult {
        setup_logging();

        // Assign random values to the tape, then output each of them in turn
        let number_of_reads = 10000;
        let mut program_string = ".>".repeat(number_of_reads);
        // Remove the final > so we don't go over the cell count
        program_string.pop();

        let mut rng = rand::thread_rng();
        let mut buffer = vec![0u8; number_of_reads];
        rng.fill(&mut buffer[..]);

        let mut output = Vec::new();
        {
            let mut vm: BrainfuckVM<u8> = VMBuilder::new()
                .set_input(io::empty())
                .set_program_source(&program_string)
                .set_cell_count(NonZeroUsize::new(number_of_reads))
                .set_output(&mut output)
                .build()?;
            vm.tape = buffer.clone();
            let final_state = vm.interpret()?;
            assert_eq!(final_state.state().head(), number_of_reads - 1);
        }
        assert_eq!(output, buffer);
        Ok(())
    }

    #[test]
    fn test_output_io_error() -> TestResult {
        let mut vm: BrainfuckVM<u8> = VMBuilder::new()
            .set_input(io::empty())
            .set_program_source("+.")
            .set_output(FailingWriter)
            .build()?;
        let error = expect_error(vm.interpret());
        assert_eq!(error.kind(), ErrorKind::Io);
        assert_eq!(error.offset(), Some(1));
        Ok(())
    }

    #[test]
    fn test_conditional_forward_backward_success() -> TestResult {
        setup_logging();

        let program_string = "
            ++       // Increment the first cell to 2
            [        // Begin a loop that runs while the current cell's value is not zero
             -       // Decrement the current cell
            ]        // End the loop only after the decrement has happened twice
            ";
        let mut vm = setup_vm_from_string(program_string, None)?;

        let mut expect_step = |instruction: RawInstruction, cell_value: u8, next_index: usize| {
            match vm.interpret_step().expect("Step failed") {
                Step::Running(state) => {
                    assert_eq!(state.last_instruction(), Some(instruction));
                    assert_eq!(state.cell_value(), cell_value);
                    assert_eq!(state.instruction_index(), next_index);
                }
                Step::Halted(_) => panic!("Halted early"),
            }
        };

        expect_step(RawInstruction::IncrementByte, 1, 1);
        expect_step(RawInstruction::IncrementByte, 2, 2);
        // The loop is entered, instruction_index goes up normally
        expect_step(RawInstruction::ConditionalForward, 2, 3);
        expect_step(RawInstruction::DecrementByte, 1, 4);
        // Cell is non-zero, jump back to just after the opening bracket
        expect_step(RawInstruction::ConditionalBackward, 1, 3);
        expect_step(RawInstruction::DecrementByte, 0, 4);
        // Cell is zero, fall through to the end
        expect_step(RawInstruction::ConditionalBackward, 0, 5);

        match vm.interpret_step()? {
            Step::Halted(final_state) => {
                assert_eq!(
                    final_state.state(),
                    &VMState::<u8>::new(0, 0, 5, None, 7)
                );
            }
            Step::Running(_) => panic!("Expected the end of the program"),
        }
        Ok(())
    }

    #[test]
    fn test_skip_loop_with_zero_cell() -> TestResult {
        let mut vm = setup_vm_from_string("[+++]+", None)?;
        match vm.interpret_step()? {
            Step::Running(state) => {
                assert_eq!(state.last_instruction(), Some(RawInstruction::ConditionalForward));
                // Just past the closing bracket
                assert_eq!(state.instruction_index(), 5);
            }
            Step::Halted(_) => panic!("Halted early"),
        }
        let final_state = vm.interpret()?;
        assert_eq!(final_state.state().cell_value(), 1);
        Ok(())
    }

    #[test]
    fn test_no_steps_after_halting() -> TestResult {
        let mut vm = setup_vm_from_string("+", None)?;
        vm.interpret()?;
        assert_eq!(vm.status(), ExecutionStatus::Finished);
        let error = vm.interpret_step().expect_err("Finished VM should not run");
        assert_eq!(error.kind(), ErrorKind::NotRunning);

        let mut vm = setup_vm_from_string("<+", None)?;
        assert!(vm.interpret().is_err());
        let error = vm.interpret_step().expect_err("Failed VM should not run");
        assert_eq!(error.kind(), ErrorKind::NotRunning);
        // The instruction after the failure never ran
        assert_eq!(vm.current_cell_value(), 0);
        Ok(())
    }

    #[test]
    fn test_balanced_brackets_leave_tape_untouched() -> TestResult {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            // Random balanced nesting of brackets with comment characters between them
            let mut program_string = String::new();
            let mut depth = 0;
            for _ in 0..rng.gen_range(0..64) {
                match rng.gen_range(0..3) {
                    0 => {
                        program_string.push('[');
                        depth += 1;
                    }
                    1 if depth > 0 => {
                        program_string.push(']');
                        depth -= 1;
                    }
                    _ => program_string.push('x'),
                }
            }
            program_string.push_str(&"]".repeat(depth));

            let (output, result) = run_both_strategies(&program_string, &[]);
            let final_state = result?;
            assert!(output.is_empty());
            assert_eq!(final_state.state().head(), 0);
            assert!(final_state.non_zero_cells().next().is_none());
        }
        Ok(())
    }

    #[test]
    fn test_strategies_agree_on_random_programs() {
        let mut rng = rand::thread_rng();
        let alphabet = ['>', '<', '+', '-', '.', '[', ']', ' '];
        for _ in 0..200 {
            let length = rng.gen_range(0..40);
            let program_string: String = (0..length)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            // Compare every intermediate state, capped since some of these never terminate
            let mut runs = Vec::new();
            for strategy in [JumpStrategy::Scan, JumpStrategy::Table] {
                let mut vm: BrainfuckVM<u8> = VMBuilder::new()
                    .set_input(io::empty())
                    .set_program_source(&program_string)
                    .set_cell_count(NonZeroUsize::new(16))
                    .set_jump_strategy(strategy)
                    .set_output(NullWriter)
                    .build()
                    .expect("Failed to build VM");
                let steps: Vec<_> = vm
                    .iter()
                    .take(2_000)
                    .map(|step| step.map_err(|e| (e.kind(), e.offset())))
                    .collect();
                runs.push(steps);
            }
            assert_eq!(runs[0], runs[1], "Strategies disagree for {:?}", program_string);
        }
    }
}
