//! The MEPA execution engine.
//!
//! Owns the machine state (operand stack, memory, program counter) plus a
//! snapshot of the program taken at reset time, and implements the semantics
//! of every opcode. Add, subtract, multiply, and negate use wrapping
//! arithmetic to prevent overflow panics; DIVI is floor division.
//!
//! Control flow is expressed through [`StepOutcome`] values returned by each
//! step rather than signals thrown from deep inside opcode handlers.

use crate::machine::errors::{MachineError, RuntimeError};
use crate::machine::isa::Opcode;
use crate::machine::parser::{self, Instruction, Mnemonic};
use crate::machine::program::Program;
use std::collections::HashMap;

/// Execution mode of the machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// No execution in progress.
    Idle,
    /// A run-to-completion is in progress.
    Running,
    /// A debug session is waiting for the next step.
    DebugPaused,
    /// The last run reached PARA or ran past the end of the program.
    Halted,
}

/// Result of executing a single instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    /// The instruction completed; the program counter advanced by one.
    Continue,
    /// A jump was taken; the program counter was redirected.
    Jumped,
    /// PARA was reached; execution is over.
    Halted,
}

/// One snapshotted program line with its parsed instruction.
#[derive(Clone, Debug)]
struct Line {
    number: u32,
    raw: String,
    instruction: Instruction,
}

/// Copy of the machine's observable state, for inspection.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    /// The operand stack, bottom first.
    pub stack: Vec<i64>,
    /// The memory cells, address 0 first.
    pub memory: Vec<i64>,
}

/// Report of a completed run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunReport {
    /// Values emitted by IMPR, in execution order.
    pub emitted: Vec<i64>,
    /// Number of instructions executed, the halting one included.
    pub steps: u64,
}

/// The MEPA stack machine.
///
/// All state is exclusively owned by one engine instance and fully
/// reconstructed (never incrementally patched) at the start of each run or
/// debug session. The program image may be edited freely between runs; the
/// line index and label table used by a run are a snapshot taken at reset.
#[derive(Debug)]
pub struct Vm {
    /// Program snapshot, ascending by line number.
    lines: Vec<Line>,
    /// Line number to snapshot index.
    line_index: HashMap<u32, usize>,
    /// Label to line number. On duplicates the greater line number wins.
    labels: HashMap<String, u32>,
    /// Operand stack.
    stack: Vec<i64>,
    /// Flat addressable memory, grown and shrunk only by AMEM/DMEM.
    memory: Vec<i64>,
    /// Index into `lines` of the next instruction to execute.
    pc: usize,
    mode: Mode,
    /// Values emitted by IMPR since the last reset.
    emitted: Vec<i64>,
}

impl Vm {
    /// Creates an idle machine with no program snapshot.
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            line_index: HashMap::new(),
            labels: HashMap::new(),
            stack: Vec::new(),
            memory: Vec::new(),
            pc: 0,
            mode: Mode::Idle,
            emitted: Vec::new(),
        }
    }

    /// Returns the current execution mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Returns a copy of the observable machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            stack: self.stack.clone(),
            memory: self.memory.clone(),
        }
    }

    /// Values emitted by IMPR since the last reset, in execution order.
    pub fn emitted(&self) -> &[i64] {
        &self.emitted
    }

    /// The line number and raw text of the next instruction to execute.
    pub fn pending(&self) -> Option<(u32, &str)> {
        self.lines
            .get(self.pc)
            .map(|line| (line.number, line.raw.as_str()))
    }

    /// Whether the program counter has run past the last line.
    pub fn at_end(&self) -> bool {
        self.pc >= self.lines.len()
    }

    /// Runs the program to completion.
    ///
    /// Performs a full reset (snapshot, empty stack and memory, program
    /// counter at the start instruction), then steps until PARA, program
    /// exhaustion, or an error. A non-terminating program runs indefinitely.
    pub fn run(&mut self, program: &Program) -> Result<RunReport, RuntimeError> {
        self.reset(program)?;
        self.mode = Mode::Running;

        let mut steps = 0u64;
        while !self.at_end() {
            match self.step_current() {
                Ok(outcome) => {
                    steps += 1;
                    if outcome == StepOutcome::Halted {
                        break;
                    }
                }
                Err(e) => {
                    // Aborted state is undefined; force a reset before reuse.
                    self.mode = Mode::Idle;
                    return Err(e);
                }
            }
        }

        self.mode = Mode::Halted;
        Ok(RunReport {
            emitted: std::mem::take(&mut self.emitted),
            steps,
        })
    }

    /// Resets all machine state from a fresh snapshot of the program and
    /// positions the program counter at the start instruction: the line
    /// bearing INPP when one exists, else the first line.
    pub(crate) fn reset(&mut self, program: &Program) -> Result<(), MachineError> {
        self.rebuild(program);
        self.stack.clear();
        self.memory.clear();
        self.emitted.clear();
        self.mode = Mode::Idle;
        if self.lines.is_empty() {
            return Err(MachineError::EmptyProgram);
        }
        self.pc = self
            .lines
            .iter()
            .position(|line| line.instruction.mnemonic == Mnemonic::Known(Opcode::Inpp))
            .unwrap_or(0);
        Ok(())
    }

    /// Rebuilds the program snapshot: parsed lines in ascending order, the
    /// line-number index, and the label table.
    ///
    /// When two lines declare the same label, the greater line number wins;
    /// earlier definitions are overridden silently.
    fn rebuild(&mut self, program: &Program) {
        self.lines = program
            .iter()
            .map(|(number, raw)| Line {
                number,
                raw: raw.to_string(),
                instruction: parser::parse_line(raw),
            })
            .collect();
        self.line_index = self
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| (line.number, index))
            .collect();
        self.labels.clear();
        for line in &self.lines {
            if let Some(label) = &line.instruction.label {
                self.labels.insert(label.clone(), line.number);
            }
        }
    }

    /// Executes the instruction at the current program counter, wrapping any
    /// failure with the originating line number.
    pub(crate) fn step_current(&mut self) -> Result<StepOutcome, RuntimeError> {
        let Some(line) = self.lines.get(self.pc) else {
            return Err(MachineError::EmptyProgram.into());
        };
        let number = line.number;
        let instruction = line.instruction.clone();
        self.exec(&instruction)
            .map_err(|source| RuntimeError::AtLine { line: number, source })
    }

    /// Opcode dispatch. On `Continue` the program counter has advanced by
    /// one; on `Jumped` it was redirected; on `Halted` it is left in place.
    fn exec(&mut self, instruction: &Instruction) -> Result<StepOutcome, MachineError> {
        let op = match &instruction.mnemonic {
            // Blank and label-only lines execute as no-ops.
            Mnemonic::None => {
                self.pc += 1;
                return Ok(StepOutcome::Continue);
            }
            Mnemonic::Unknown(name) => {
                return Err(MachineError::UnknownOpcode { name: name.clone() });
            }
            Mnemonic::Known(op) => *op,
        };

        // Opcodes without arguments ignore stray tokens on the line.
        if op.arity() > 0 && instruction.args.len() != op.arity() {
            return Err(MachineError::ArityMismatch {
                opcode: op.mnemonic(),
                expected: op.arity(),
                actual: instruction.args.len(),
            });
        }

        match op {
            Opcode::Inpp | Opcode::Nada => {}
            Opcode::Para => return Ok(StepOutcome::Halted),
            Opcode::Amem => {
                let n = int_arg(op, &instruction.args[0])?;
                if n < 0 {
                    return Err(MachineError::InvalidAllocation {
                        opcode: op.mnemonic(),
                        size: n,
                        available: self.memory.len(),
                    });
                }
                self.memory.resize(self.memory.len() + n as usize, 0);
            }
            Opcode::Dmem => {
                let n = int_arg(op, &instruction.args[0])?;
                if n < 0 || n as usize > self.memory.len() {
                    return Err(MachineError::InvalidAllocation {
                        opcode: op.mnemonic(),
                        size: n,
                        available: self.memory.len(),
                    });
                }
                let keep = self.memory.len() - n as usize;
                self.memory.truncate(keep);
            }
            Opcode::Crct => {
                let value = int_arg(op, &instruction.args[0])?;
                self.stack.push(value);
            }
            Opcode::Crvl => {
                let address = int_arg(op, &instruction.args[0])?;
                let index = self.memory_index(address)?;
                self.stack.push(self.memory[index]);
            }
            Opcode::Armz => {
                // Argument is decoded before the pop, so a malformed address
                // is reported even when the stack is empty.
                let address = int_arg(op, &instruction.args[0])?;
                let value = self.pop(op)?;
                let index = self.memory_index(address)?;
                self.memory[index] = value;
            }
            Opcode::Soma => self.binary(op, |a, b| a.wrapping_add(b))?,
            Opcode::Subt => self.binary(op, |a, b| a.wrapping_sub(b))?,
            Opcode::Mult => self.binary(op, |a, b| a.wrapping_mul(b))?,
            Opcode::Divi => {
                let (a, b) = self.pop2(op)?;
                if b == 0 {
                    return Err(MachineError::DivisionByZero);
                }
                self.stack.push(floor_div(a, b));
            }
            Opcode::Invr => {
                let a = self.pop(op)?;
                self.stack.push(a.wrapping_neg());
            }
            Opcode::Conj => self.binary(op, |a, b| i64::from(a != 0 && b != 0))?,
            Opcode::Disj => self.binary(op, |a, b| i64::from(a != 0 || b != 0))?,
            Opcode::Cmme => self.binary(op, |a, b| i64::from(a < b))?,
            Opcode::Cmma => self.binary(op, |a, b| i64::from(a > b))?,
            Opcode::Cmig => self.binary(op, |a, b| i64::from(a == b))?,
            Opcode::Cmdg => self.binary(op, |a, b| i64::from(a != b))?,
            Opcode::Cmeg => self.binary(op, |a, b| i64::from(a <= b))?,
            Opcode::Cmag => self.binary(op, |a, b| i64::from(a >= b))?,
            Opcode::Dsvs => {
                self.jump(&instruction.args[0])?;
                return Ok(StepOutcome::Jumped);
            }
            Opcode::Dsvf => {
                let condition = self.pop(op)?;
                if condition == 0 {
                    self.jump(&instruction.args[0])?;
                    return Ok(StepOutcome::Jumped);
                }
                // Non-zero condition falls through; the target is never
                // resolved, so a bogus target is not an error here.
            }
            Opcode::Impr => {
                let value = self.peek(op)?;
                self.emitted.push(value);
            }
        }

        self.pc += 1;
        Ok(StepOutcome::Continue)
    }

    /// Resolves a jump target and redirects the program counter.
    ///
    /// A target that parses as an integer is resolved as a line number only;
    /// a missing line is an error even when a label with the same spelling
    /// exists. Non-numeric targets are resolved through the label table.
    fn jump(&mut self, target: &str) -> Result<(), MachineError> {
        let unresolved = || MachineError::UnresolvedTarget {
            target: target.to_string(),
        };

        if let Ok(number) = target.parse::<i64>() {
            let index = u32::try_from(number)
                .ok()
                .and_then(|n| self.line_index.get(&n).copied());
            return match index {
                Some(index) => {
                    self.pc = index;
                    Ok(())
                }
                None => Err(unresolved()),
            };
        }

        if let Some(number) = self.labels.get(target)
            && let Some(&index) = self.line_index.get(number)
        {
            self.pc = index;
            return Ok(());
        }
        Err(unresolved())
    }

    // ---------- stack helpers ----------

    fn pop(&mut self, op: Opcode) -> Result<i64, MachineError> {
        self.stack.pop().ok_or(MachineError::StackUnderflow {
            opcode: op.mnemonic(),
            needed: 1,
            available: 0,
        })
    }

    /// Pops the right operand, then the left: `b` first, `a` second.
    fn pop2(&mut self, op: Opcode) -> Result<(i64, i64), MachineError> {
        let available = self.stack.len();
        if available < 2 {
            return Err(MachineError::StackUnderflow {
                opcode: op.mnemonic(),
                needed: 2,
                available,
            });
        }
        let b = self.stack[available - 1];
        let a = self.stack[available - 2];
        self.stack.truncate(available - 2);
        Ok((a, b))
    }

    fn peek(&self, op: Opcode) -> Result<i64, MachineError> {
        self.stack.last().copied().ok_or(MachineError::StackUnderflow {
            opcode: op.mnemonic(),
            needed: 1,
            available: 0,
        })
    }

    fn binary(&mut self, op: Opcode, apply: impl Fn(i64, i64) -> i64) -> Result<(), MachineError> {
        let (a, b) = self.pop2(op)?;
        self.stack.push(apply(a, b));
        Ok(())
    }

    /// Bounds-checks an address against the current memory length.
    fn memory_index(&self, address: i64) -> Result<usize, MachineError> {
        if address < 0 || address as usize >= self.memory.len() {
            return Err(MachineError::MemoryOutOfBounds {
                address,
                size: self.memory.len(),
            });
        }
        Ok(address as usize)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a required integer argument.
fn int_arg(op: Opcode, token: &str) -> Result<i64, MachineError> {
    token
        .parse::<i64>()
        .map_err(|_| MachineError::InvalidArgument {
            opcode: op.mnemonic(),
            token: token.to_string(),
        })
}

/// Floor division: truncation toward negative infinity, e.g. -7 / 2 = -4.
fn floor_div(a: i64, b: i64) -> i64 {
    let quotient = a.wrapping_div(b);
    let remainder = a.wrapping_rem(b);
    if remainder != 0 && (remainder < 0) != (b < 0) {
        quotient - 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests;
