//! Stack-machine interpreter for the MEPA instruction set.
//!
//! A MEPA program is a sparse sequence of numbered lines, each holding one
//! instruction, optionally tagged with a label. The machine executes the
//! lines in ascending line-number order against a LIFO operand stack and a
//! flat, dynamically sized integer memory.
//!
//! # Architecture
//!
//! - **Program image**: an ordered map from line number to raw instruction
//!   text, mutated only by the editor between runs
//! - **Snapshot**: at the start of every run or debug session the engine
//!   parses the image and derives the line index and label table
//! - **Execution model**: one instruction per step; a step either continues,
//!   jumps, halts, or fails with a terminal error carrying the line number
//!
//! # Modules
//!
//! - [`debug`]: single-step debug sessions on top of the engine
//! - [`errors`]: execution and start-up error types
//! - [`isa`]: opcode definitions and mnemonic mappings
//! - [`parser`]: raw line text to structured instructions
//! - [`program`]: the editable, line-numbered program image
//! - [`vm`]: the execution engine (stack, memory, program counter)

pub mod debug;
pub mod errors;
pub mod isa;
pub mod parser;
pub mod program;
pub mod vm;
