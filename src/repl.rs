//! Interactive command loop for editing, running, and debugging programs.
//!
//! Commands are case-insensitive. The loop owns the program image, the run
//! engine, and at most one debug session at a time; editing commands end any
//! session in progress before touching the image.
//!
//! User-facing output goes to stdout. Operational diagnostics use the logging
//! macros and go to stderr, so piped program output stays clean.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::machine::debug::{DebugEvent, DebugSession};
use crate::machine::program::Program;
use crate::machine::vm::Vm;

/// Lines shown per LIST page before pausing for input.
const PAGE_SIZE: usize = 20;

/// Whether the loop should keep reading commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The interactive interpreter shell.
pub struct Repl {
    program: Program,
    vm: Vm,
    session: Option<DebugSession>,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            vm: Vm::new(),
            session: None,
        }
    }

    /// The program image under edit.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Whether a debug session is in progress.
    pub fn in_debug(&self) -> bool {
        self.session.is_some()
    }

    /// Reads and dispatches commands until EXIT or end of input.
    pub fn run_loop(&mut self) {
        println!("MEPA interpreter - type 'EXIT' to quit");
        let stdin = io::stdin();
        loop {
            print!("> ");
            let _ = io::stdout().flush();

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // End of input behaves like EXIT, minus the save prompt.
                    println!();
                    println!("Exiting...");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    crate::error!("failed to read command: {e}");
                    break;
                }
            }

            if self.dispatch(&input) == Flow::Exit {
                break;
            }
        }
    }

    /// Executes one command line.
    pub fn dispatch(&mut self, input: &str) -> Flow {
        let input = input.trim();
        if input.is_empty() {
            return Flow::Continue;
        }
        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };
        let cmd = head.to_ascii_uppercase();

        // Commands that change or rerun the program end the debug session.
        if self.session.is_some()
            && matches!(cmd.as_str(), "LOAD" | "RUN" | "INS" | "DEL" | "EXIT")
        {
            self.end_session();
        }

        match cmd.as_str() {
            "EXIT" => {
                self.cmd_exit();
                return Flow::Exit;
            }
            "LOAD" => self.cmd_load(rest),
            "LIST" => self.cmd_list(),
            "INS" => self.cmd_ins(rest),
            "DEL" => self.cmd_del(rest),
            "SAVE" => self.cmd_save(rest),
            "RUN" => self.cmd_run(),
            "DEBUG" => self.cmd_debug(),
            "NEXT" => self.cmd_next(),
            "STOP" => self.cmd_stop(),
            "STACK" => self.cmd_stack(),
            _ => println!("Error: unknown command"),
        }
        Flow::Continue
    }

    fn cmd_exit(&mut self) {
        if self.program.is_modified()
            && confirm("Unsaved changes. Save before exiting? (y/n): ")
        {
            self.save_current(None);
        }
        println!("Exiting...");
    }

    fn cmd_load(&mut self, args: &str) {
        if args.is_empty() {
            println!("Error: specify a file name");
            return;
        }
        if self.program.is_modified()
            && confirm("Unsaved changes. Save before loading another file? (y/n): ")
        {
            self.save_current(None);
        }

        let path = Path::new(args);
        match self.program.load_from_file(path) {
            Ok(()) => println!("File '{args}' loaded."),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                println!("Error: file '{args}' not found");
            }
            Err(e) => println!("Error loading file: {e}"),
        }
    }

    fn cmd_list(&self) {
        if self.program.is_empty() {
            println!("No code in memory");
            return;
        }
        for (index, (number, text)) in self.program.iter().enumerate() {
            if index > 0 && index % PAGE_SIZE == 0 {
                wait_for_enter();
            }
            println!("{number} {text}");
        }
    }

    fn cmd_ins(&mut self, args: &str) {
        let Some((head, text)) = args.split_once(char::is_whitespace) else {
            println!("Error: INS requires <LINE> <INSTRUCTION>");
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            println!("Error: INS requires <LINE> <INSTRUCTION>");
            return;
        }
        // Distinguish a negative number from plain garbage in the message.
        let number = match head.parse::<i64>() {
            Ok(n) if n < 0 => {
                println!("Error: line number cannot be negative");
                return;
            }
            Ok(n) => match u32::try_from(n) {
                Ok(n) => n,
                Err(_) => {
                    println!("Error: invalid line number");
                    return;
                }
            },
            Err(_) => {
                println!("Error: invalid line number");
                return;
            }
        };

        let replaced = self.program.set_line(number, text);
        if replaced {
            println!("Line updated:");
        } else {
            println!("Line inserted:");
        }
        println!("{number} {text}");
    }

    fn cmd_del(&mut self, args: &str) {
        let parts: Vec<&str> = args.split_whitespace().collect();
        match parts.as_slice() {
            [one] => {
                let Ok(number) = one.parse::<u32>() else {
                    println!("Error: invalid line number");
                    return;
                };
                if self.program.remove_line(number).is_some() {
                    println!("Line removed:");
                    println!("{number}");
                } else {
                    println!("Error: line {number} does not exist");
                }
            }
            [from, to] => {
                let (Ok(from), Ok(to)) = (from.parse::<u32>(), to.parse::<u32>()) else {
                    println!("Error: invalid line numbers");
                    return;
                };
                if from > to {
                    println!("Error: invalid range (start line > end line)");
                    return;
                }
                let removed = self.program.remove_range(from, to);
                if removed.is_empty() {
                    println!("No lines found in range {from}-{to}");
                } else {
                    println!("Lines removed:");
                    for (number, text) in removed {
                        println!("{number} {text}");
                    }
                }
            }
            _ => println!("Error: DEL requires <LINE> or <START> <END>"),
        }
    }

    fn cmd_save(&mut self, args: &str) {
        if self.program.is_empty() {
            println!("Error: no code in memory to save");
            return;
        }
        let path = (!args.is_empty()).then(|| Path::new(args).to_path_buf());
        self.save_current(path.as_deref());
    }

    fn cmd_run(&mut self) {
        if self.program.is_empty() {
            println!("Error: no code in memory");
            return;
        }
        match self.vm.run(&self.program) {
            Ok(report) => {
                for value in report.emitted {
                    println!("{value}");
                }
            }
            Err(e) => println!("Execution error: {e}"),
        }
    }

    fn cmd_debug(&mut self) {
        if self.program.is_empty() {
            println!("Error: no code in memory");
            return;
        }
        println!("Entering debug mode:");
        match DebugSession::start(&self.program) {
            Ok((session, pending)) => {
                println!("{} {}", pending.line, pending.text);
                self.session = Some(session);
            }
            Err(e) => println!("Error: {e}"),
        }
    }

    fn cmd_next(&mut self) {
        let Some(session) = self.session.as_mut() else {
            println!("Error: not in debug mode. Use DEBUG first");
            return;
        };
        match session.step() {
            Ok(DebugEvent::Paused { emitted, next }) => {
                if let Some(value) = emitted {
                    println!("{value}");
                }
                println!("{} {}", next.line, next.text);
            }
            Ok(DebugEvent::Finished { emitted }) => {
                if let Some(value) = emitted {
                    println!("{value}");
                }
                println!("Program finished");
                self.session = None;
            }
            Err(e) => {
                println!("Error: {e}");
                self.session = None;
            }
        }
    }

    fn cmd_stop(&mut self) {
        if self.session.is_none() {
            println!("Not in debug mode");
            return;
        }
        self.end_session();
    }

    fn cmd_stack(&self) {
        let Some(session) = self.session.as_ref() else {
            println!("STACK is only available in debug mode");
            return;
        };
        let snapshot = session.snapshot();
        if snapshot.memory.is_empty() && snapshot.stack.is_empty() {
            println!("Stack empty");
            return;
        }
        // Memory cells first, then the operand stack at continuing indices.
        println!("Stack contents");
        for (index, value) in snapshot.memory.iter().enumerate() {
            println!("{index}: {value}");
        }
        let base = snapshot.memory.len();
        for (index, value) in snapshot.stack.iter().enumerate() {
            println!("{}: {value}", base + index);
        }
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
            println!("Debug mode ended");
        }
    }

    /// Saves to `path`, or the backing file when `path` is `None`.
    fn save_current(&mut self, path: Option<&Path>) {
        match self.program.save_to_file(path) {
            Ok(()) => {
                let name = self
                    .program
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("File '{name}' saved");
            }
            Err(e) => println!("Error saving file: {e}"),
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

/// Asks a yes/no question on stdout. End of input counts as no.
fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

fn wait_for_enter() {
    print!("Press Enter to continue.");
    let _ = io::stdout().flush();
    let mut ignored = String::new();
    let _ = io::stdin().lock().read_line(&mut ignored);
}
