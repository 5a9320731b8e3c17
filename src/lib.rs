//! Interpreter for the MEPA teaching instruction set.
//!
//! Provides the stack/memory execution engine, the line-numbered program
//! image, and the interactive REPL used to edit, run, and debug MEPA
//! programs.

pub mod machine;
pub mod repl;
pub mod utils;
