use crate::cellkind::CellKind;
use crate::instructions::RawInstruction;
use core::fmt;

/// Where a VM is in its lifecycle. Every VM starts `Running`; the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStatus {
    #[default]
    Running,
    /// The instruction pointer reached the end of the program.
    Finished,
    /// An instruction failed and execution stopped on it.
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Finished => write!(f, "finished"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

// Extends VMState with a snapshot of the VM's tape at the end of program execution,
// providing a complete picture of the final program state
#[derive(PartialEq, Debug, Clone)]
pub struct VMStateFinal<N>
where
    N: CellKind,
{
    state: VMState<N>,
    tape: Vec<N>,
}

impl<N> VMStateFinal<N>
where
    N: CellKind,
{
    pub fn new(state: VMState<N>, tape: Vec<N>) -> Self {
        VMStateFinal { state, tape }
    }

    pub fn state(&self) -> &VMState<N> {
        &self.state
    }

    pub fn tape(&self) -> &[N] {
        &self.tape
    }

    /// The cells holding something other than zero, with their positions.
    pub fn non_zero_cells(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.tape
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, value)| !value.is_zero())
    }
}

impl<N> fmt::Display for VMStateFinal<N>
where
    N: CellKind,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero_cells_str = self
            .non_zero_cells()
            .map(|(index, value)| format!("[{}, {}]", index, value))
            .collect::<Vec<String>>()
            .join(",");

        write!(f, "{}\nTape:\n{}", self.state, non_zero_cells_str)
    }
}

// Represents the state of the VM at a specific point in execution, useful for debugging or state inspection
#[derive(Debug, PartialEq, Clone)]
pub struct VMState<N>
where
    N: CellKind,
{
    cell_value: N,
    head: usize,
    instruction_index: usize,
    last_instruction: Option<RawInstruction>,
    instructions_processed: usize,
}

impl<N> VMState<N>
where
    N: CellKind,
{
    pub fn new(
        cell_value: N,
        head: usize,
        instruction_index: usize,
        last_instruction: Option<RawInstruction>,
        instructions_processed: usize,
    ) -> Self {
        VMState {
            cell_value,
            head,
            instruction_index,
            last_instruction,
            instructions_processed,
        }
    }

    pub fn cell_value(&self) -> N {
        self.cell_value
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// Index of the next instruction to dispatch.
    pub fn instruction_index(&self) -> usize {
        self.instruction_index
    }

    /// The instruction dispatched by the step that produced this state, if any.
    pub fn last_instruction(&self) -> Option<RawInstruction> {
        self.last_instruction
    }

    pub fn instructions_processed(&self) -> usize {
        self.instructions_processed
    }
}

impl<N> fmt::Display for VMState<N>
where
    N: CellKind,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell value: {}\nHead: {}\nNext instruction index: {}\nInstructions processed: {}",
            self.cell_value, self.head, self.instruction_index, self.instructions_processed
        )
    }
}
