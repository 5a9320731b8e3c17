//! The editable, line-numbered program image.
//!
//! [`Program`] is the single source of truth the engine snapshots from at
//! the start of every run or debug session. The editor mutates it freely
//! between runs, never during one.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A MEPA program held in memory as an ordered map from line number to raw
/// instruction text.
///
/// Line numbers are unique and define execution order: always ascending,
/// regardless of the order the editor inserted them in.
#[derive(Debug, Default)]
pub struct Program {
    lines: BTreeMap<u32, String>,
    /// Set whenever the image diverges from the backing file.
    modified: bool,
    path: Option<PathBuf>,
}

impl Program {
    /// Creates an empty program with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one line. Returns `true` when the line existed.
    pub fn set_line(&mut self, number: u32, text: &str) -> bool {
        let replaced = self.lines.insert(number, text.trim().to_string()).is_some();
        self.modified = true;
        replaced
    }

    /// Removes one line, returning its text when it existed.
    pub fn remove_line(&mut self, number: u32) -> Option<String> {
        let removed = self.lines.remove(&number);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Removes every line in the inclusive range, returning the removed
    /// pairs in ascending order. An empty range removes nothing.
    pub fn remove_range(&mut self, from: u32, to: u32) -> Vec<(u32, String)> {
        if from > to {
            return Vec::new();
        }
        let numbers: Vec<u32> = self.lines.range(from..=to).map(|(n, _)| *n).collect();
        let mut removed = Vec::with_capacity(numbers.len());
        for number in numbers {
            if let Some(text) = self.lines.remove(&number) {
                removed.push((number, text));
            }
        }
        if !removed.is_empty() {
            self.modified = true;
        }
        removed
    }

    /// Returns the text of one line.
    pub fn line(&self, number: u32) -> Option<&str> {
        self.lines.get(&number).map(String::as_str)
    }

    /// Iterates the lines in ascending line-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.lines.iter().map(|(n, text)| (*n, text.as_str()))
    }

    /// Returns the number of lines in the image.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` when the image has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns `true` when the image has unsaved edits.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns the backing file path, when one is associated.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads an image from a `<lineno> <text>` file, replacing the current
    /// contents and associating the file as the backing path.
    ///
    /// Blank lines and lines whose first token does not parse as a
    /// non-negative integer are skipped silently; they never reach the
    /// engine.
    pub fn load_from_file(&mut self, path: &Path) -> io::Result<()> {
        let source = fs::read_to_string(path)?;
        self.lines.clear();
        for raw in source.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (head, rest) = match trimmed.split_once(char::is_whitespace) {
                Some((head, rest)) => (head, rest.trim()),
                None => (trimmed, ""),
            };
            let Ok(number) = head.parse::<u32>() else {
                continue;
            };
            self.lines.insert(number, rest.to_string());
        }
        self.path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Writes the image as one `<lineno> <text>` line per instruction.
    ///
    /// With no explicit path, saves to the backing file; with neither, fails
    /// with `InvalidInput`.
    pub fn save_to_file(&mut self, path: Option<&Path>) -> io::Result<()> {
        let target = match path.or(self.path.as_deref()) {
            Some(p) => p.to_path_buf(),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no file name associated with the program",
                ));
            }
        };
        let mut out = String::new();
        for (number, text) in self.iter() {
            let _ = writeln!(out, "{number} {text}");
        }
        fs::write(&target, out)?;
        self.path = Some(target);
        self.modified = false;
        Ok(())
    }

    /// Clears the image and forgets the backing file.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.modified = false;
        self.path = None;
    }
}
