//! Execution and start-up error types for the MEPA machine.

use mepa_derive::Error;

/// Errors raised while starting or executing a program.
///
/// Every variant is terminal for the current run: execution aborts at the
/// point of failure and the machine state must be reset before the next run
/// or debug session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// An operator needed more operand-stack entries than were present.
    #[error("{opcode}: stack underflow ({needed} operand(s) required, {available} available)")]
    StackUnderflow {
        opcode: &'static str,
        needed: usize,
        available: usize,
    },
    /// CRVL/ARMZ addressed a cell outside the allocated memory.
    #[error("memory address {address} out of bounds (memory size {size})")]
    MemoryOutOfBounds { address: i64, size: usize },
    /// AMEM/DMEM received a negative size, or DMEM exceeded the allocation.
    #[error("{opcode}: invalid allocation size {size} (memory size {available})")]
    InvalidAllocation {
        opcode: &'static str,
        size: i64,
        available: usize,
    },
    /// An opcode received the wrong number of arguments.
    #[error("{opcode} requires {expected} argument(s), got {actual}")]
    ArityMismatch {
        opcode: &'static str,
        expected: usize,
        actual: usize,
    },
    /// An argument failed to parse as the required integer.
    #[error("{opcode}: argument '{token}' is not an integer")]
    InvalidArgument { opcode: &'static str, token: String },
    /// DSVS/DSVF referenced a line number or label absent from the program.
    #[error("jump target '{target}' not found")]
    UnresolvedTarget { target: String },
    /// The decoded mnemonic is not part of the instruction set.
    #[error("unknown instruction: {name}")]
    UnknownOpcode { name: String },
    /// DIVI with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
    /// A run or debug start was requested with no executable lines.
    #[error("no code to execute")]
    EmptyProgram,
    /// A debug step was requested without a paused session.
    #[error("no debug session in progress")]
    NotPaused,
}

/// A terminal run failure, tagged with the failing line when one was reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Failure while executing the instruction on a specific program line.
    #[error("error at line {line}: {source}")]
    AtLine { line: u32, source: MachineError },
    /// Failure before any instruction ran (empty program, misused debug API).
    #[error("{source}")]
    BeforeRun { source: MachineError },
}

impl RuntimeError {
    /// Returns the underlying machine error.
    pub fn source(&self) -> &MachineError {
        match self {
            RuntimeError::AtLine { source, .. } | RuntimeError::BeforeRun { source } => source,
        }
    }

    /// Returns the failing line number, when execution reached one.
    pub fn line(&self) -> Option<u32> {
        match self {
            RuntimeError::AtLine { line, .. } => Some(*line),
            RuntimeError::BeforeRun { .. } => None,
        }
    }
}

impl From<MachineError> for RuntimeError {
    fn from(source: MachineError) -> Self {
        RuntimeError::BeforeRun { source }
    }
}
