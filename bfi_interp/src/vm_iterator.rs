use crate::{
    vm::{BrainfuckVM, Step},
    vm_error::VMError,
};
use bfi_types::{
    cellkind::CellKind,
    state::{ExecutionStatus, VMState, VMStateFinal},
};

// Facilitates step-by-step execution of a Brainfuck program, yielding the state after each step.
// This is particularly useful for debugging.
pub struct VMIterator<'vm, 'a, N>
where
    N: CellKind,
{
    vm: &'vm mut BrainfuckVM<'a, N>,
    final_state: Option<VMStateFinal<N>>,
}

impl<'vm, 'a, N> VMIterator<'vm, 'a, N>
where
    N: CellKind,
{
    pub fn new(vm: &'vm mut BrainfuckVM<'a, N>) -> Self {
        VMIterator {
            vm,
            final_state: None,
        }
    }

    /// Available once the iterator has run off the end of the program.
    pub fn final_state(&self) -> Option<&VMStateFinal<N>> {
        self.final_state.as_ref()
    }
}

// Iterate one step at a time. The iteration ends at the end of the program, and after the
// first error has been yielded.
impl<'vm, 'a, N> Iterator for VMIterator<'vm, 'a, N>
where
    N: CellKind,
{
    type Item = Result<VMState<N>, VMError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.vm.status() != ExecutionStatus::Running {
            return None;
        }
        match self.vm.interpret_step() {
            Ok(Step::Running(state)) => Some(Ok(state)),
            Ok(Step::Halted(final_state)) => {
                self.final_state = Some(final_state);
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}
