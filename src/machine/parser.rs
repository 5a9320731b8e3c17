//! Instruction line parser.
//!
//! Converts one raw line of program text into a structured [`Instruction`].
//! Parsing never fails: unknown mnemonics and malformed text are carried
//! through and only surface as errors when the engine executes the line.
//!
//! # Syntax
//!
//! ```text
//! [label:] OPCODE [arg1 [arg2 ...]]
//! ```
//!
//! - A leading `name:` prefix is a label when `name` is non-empty and made of
//!   alphanumeric characters and underscores; otherwise the colon is ordinary
//!   text
//! - Mnemonics are case-insensitive
//! - Arguments are whitespace-separated; quoted tokens may contain whitespace

use crate::machine::isa::Opcode;

/// The mnemonic position of a parsed line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mnemonic {
    /// A recognized opcode.
    Known(Opcode),
    /// Text in opcode position matching no opcode, stored uppercased.
    /// Reported as an error only when the line is executed.
    Unknown(String),
    /// A blank or label-only line; executes as a no-op.
    None,
}

/// One parsed instruction line. Never mutated after creation; the engine
/// reparses the image whenever line text changes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    /// Optional label naming this line as a jump target.
    pub label: Option<String>,
    /// The decoded opcode position.
    pub mnemonic: Mnemonic,
    /// Raw argument tokens, order preserved. Not evaluated until execution.
    pub args: Vec<String>,
}

/// Parses one raw line of program text. Never fails.
pub fn parse_line(raw: &str) -> Instruction {
    let text = raw.trim();
    let (label, body) = split_label(text);
    let mut tokens = tokenize(body).into_iter();

    let Some(head) = tokens.next() else {
        return Instruction {
            label,
            mnemonic: Mnemonic::None,
            args: Vec::new(),
        };
    };

    let upper = head.to_ascii_uppercase();
    let mnemonic = match Opcode::from_mnemonic(&upper) {
        Some(op) => Mnemonic::Known(op),
        None => Mnemonic::Unknown(upper),
    };

    Instruction {
        label,
        mnemonic,
        args: tokens.collect(),
    }
}

/// Splits a leading `name:` label off the line, when `name` is a valid label.
fn split_label(text: &str) -> (Option<String>, &str) {
    if let Some((before, after)) = text.split_once(':') {
        let name = before.trim();
        if !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return (Some(name.to_string()), after.trim_start());
        }
    }
    (None, text)
}

/// Splits a line body into whitespace-separated tokens, honoring quotes.
///
/// On an unterminated quote the line degrades to plain whitespace splitting
/// rather than failing, so the parser contract stays total.
fn tokenize(text: &str) -> Vec<String> {
    match quoted_split(text) {
        Some(tokens) => tokens,
        None => text.split_whitespace().map(str::to_string).collect(),
    }
}

/// Quote-aware tokenizer. Returns `None` on an unterminated quote.
///
/// Both `"` and `'` delimit quoted tokens; the quotes themselves are not part
/// of the token text.
fn quoted_split(text: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    out.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_word {
        out.push(current);
    }
    Some(out)
}
