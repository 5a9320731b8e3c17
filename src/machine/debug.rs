//! Single-step debug sessions.
//!
//! A [`DebugSession`] wraps its own engine and the snapshot it took when the
//! session started. Execution pauses after every instruction until the
//! caller asks for the next step; the session owns all machine state until
//! it is stopped or dropped, after which the program image may be edited
//! again.

use crate::machine::errors::{MachineError, RuntimeError};
use crate::machine::program::Program;
use crate::machine::vm::{Mode, Snapshot, StepOutcome, Vm};

/// The instruction the machine is about to execute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingInstruction {
    /// Program line number.
    pub line: u32,
    /// Raw instruction text as the editor holds it.
    pub text: String,
}

/// Result of a single debug step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DebugEvent {
    /// The step completed; execution is paused before `next`.
    Paused {
        /// Value emitted by this step, when it was an IMPR.
        emitted: Option<i64>,
        /// The instruction the next step will execute.
        next: PendingInstruction,
    },
    /// The program reached PARA or ran past its last line.
    Finished {
        /// Value emitted by this step, when it was an IMPR.
        emitted: Option<i64>,
    },
}

/// A paused, stepwise execution of one program snapshot.
#[derive(Debug)]
pub struct DebugSession {
    vm: Vm,
}

impl DebugSession {
    /// Resets a fresh machine from the program and pauses before the first
    /// instruction, reporting it.
    ///
    /// Starting a new session always discards any previous machine state;
    /// there is never more than one execution in progress.
    pub fn start(program: &Program) -> Result<(Self, PendingInstruction), RuntimeError> {
        let mut vm = Vm::new();
        vm.reset(program)?;
        vm.set_mode(Mode::DebugPaused);
        let pending = match vm.pending() {
            Some((line, text)) => PendingInstruction {
                line,
                text: text.to_string(),
            },
            None => return Err(MachineError::EmptyProgram.into()),
        };
        Ok((Self { vm }, pending))
    }

    /// Executes exactly one instruction.
    ///
    /// Reports the next pending instruction while the program continues, or
    /// completion when PARA was executed or the program counter ran past the
    /// last line. Valid only while paused; afterwards the session is either
    /// still paused, halted, or (after an error) dead.
    pub fn step(&mut self) -> Result<DebugEvent, RuntimeError> {
        if self.vm.mode() != Mode::DebugPaused {
            return Err(MachineError::NotPaused.into());
        }
        if self.vm.at_end() {
            self.vm.set_mode(Mode::Halted);
            return Ok(DebugEvent::Finished { emitted: None });
        }

        let emitted_before = self.vm.emitted().len();
        let outcome = match self.vm.step_current() {
            Ok(outcome) => outcome,
            Err(e) => {
                // Aborted state is undefined; the session cannot be resumed.
                self.vm.set_mode(Mode::Idle);
                return Err(e);
            }
        };
        let emitted = self.vm.emitted().get(emitted_before).copied();

        if outcome == StepOutcome::Halted {
            self.vm.set_mode(Mode::Halted);
            return Ok(DebugEvent::Finished { emitted });
        }
        match self.vm.pending() {
            Some((line, text)) => Ok(DebugEvent::Paused {
                emitted,
                next: PendingInstruction {
                    line,
                    text: text.to_string(),
                },
            }),
            None => {
                self.vm.set_mode(Mode::Halted);
                Ok(DebugEvent::Finished { emitted })
            }
        }
    }

    /// Ends the session, discarding all machine state. Equivalent to
    /// dropping it.
    pub fn stop(self) {}

    /// Returns the session's execution mode.
    pub fn mode(&self) -> Mode {
        self.vm.mode()
    }

    /// Returns a copy of the stack and memory for inspection. Valid in any
    /// mode, including after the program halted.
    pub fn snapshot(&self) -> Snapshot {
        self.vm.snapshot()
    }
}
