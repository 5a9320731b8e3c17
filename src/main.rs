//! A MEPA interpreter in Rust.
//!
//! Starts the interactive shell, optionally preloading a program file and
//! running startup commands first.
//!
//! # Usage
//! ```text
//! mepa [file.mepa] [OPTIONS]
//! ```
//!
//! # Arguments
//! - `file.mepa`: Program file to load before the first prompt
//!
//! # Options
//! - `-c, --command <cmd>`: Shell command to run at startup (repeatable)

use mepa::repl::{Flow, Repl};
use mepa::{error, info};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut file: Option<&str> = None;
    let mut startup: Vec<&str> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            "-c" | "--command" => {
                i += 1;
                if i >= args.len() {
                    error!("{} requires an argument", args[i - 1]);
                    process::exit(1);
                }
                startup.push(&args[i]);
                i += 1;
            }
            other if other.starts_with('-') => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
            other => {
                if file.is_some() {
                    eprintln!("Unexpected argument: {}\n", other);
                    print_usage(&args[0]);
                    process::exit(1);
                }
                file = Some(other);
                i += 1;
            }
        }
    }

    let mut repl = Repl::new();

    if let Some(path) = file {
        info!("Loading '{path}'");
        if repl.dispatch(&format!("LOAD {path}")) == Flow::Exit {
            return;
        }
    }
    for command in startup {
        if repl.dispatch(command) == Flow::Exit {
            return;
        }
    }

    repl.run_loop();
}

const USAGE: &str = "\
MEPA Interpreter

USAGE:
    {program} [file.mepa] [OPTIONS]

ARGS:
    <file.mepa>    Program file to load before the first prompt

OPTIONS:
    -c, --command <cmd>    Shell command to run at startup (repeatable)
    -h, --help             Print this help message

EXAMPLES:
    # Start an empty interactive session
    {program}

    # Load a program and inspect it
    {program} fib.mepa -c LIST

    # Load and run a program, then stay in the shell
    {program} fib.mepa -c RUN
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
