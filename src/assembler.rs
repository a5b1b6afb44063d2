//! Converts streaming assembly source into an executable program in a
//! two-pass manner
//!
//! The first pass resolves labels into a label table, while the second
//! pass lexes every instruction line and builds the instruction vector.
//! Label *references* are left as names and looked up at branch time, so
//! a jump may target a label defined anywhere in the program.
//!
//! Decoding is deliberately lenient: an unrecognized mnemonic or a
//! malformed operand still assembles, and only fails if the interpreter
//! actually reaches it. The only load-time errors are empty and
//! duplicate label definitions.
//!
//! Comments start with a semicolon (`;`) or a hash (`#`) and continue to
//! the end of the line, both on their own line and after an instruction.
//! A line ending in a colon defines a label. Labels are case-sensitive,
//! while opcodes and register names are not. Commas between operands are
//! optional and treated as whitespace. String operands are double-quoted
//! and keep their inner whitespace and commas:
//!
//! ```ignore
//! OPEN "Demo Video"
//! PLAY 2
//! loop:
//!     WAIT 1          ; advance 1s * SPEED
//!     GET_POS
//!     PUSH 30
//!     LT
//!     JUMPI loop
//! PRINTS "done, finally"
//! HALT
//! ```
//!
//! The assembler supports the following instructions:
//! - stack: `PUSH x`, `POP R`, `LOAD addr`, `STORE addr`
//! - arithmetic: `ADD`, `SUB`, `MUL`, `DIV`, `NEG`
//! - comparisons (push 1 or 0): `EQ`, `NE`, `LT`, `LE`, `GT`, `GE`
//! - control flow: `GOTO l`, `JUMPZ l`, `JUMPI l`, `DECJZ R l`, `HALT`
//! - streaming: `OPEN "t"`, `PLAY [s]`, `PAUSE`, `STOP`, `SEEK x`,
//!   `FORWARD x`, `REWIND x`, `WAIT x`
//! - sensors: `GET_POS`, `GET_DUR`, `GET_ENDED`, `GET_PLAYING`
//! - output: `PRINT`, `PRINTS "t"`
//!
//! Operands written as `x` accept either a signed decimal literal or a
//! register name; the value of a register operand is read when the
//! instruction executes.

pub mod instructions;
pub mod statement;

use std::collections::HashMap;
use std::fmt;

use instructions::decode;
use statement::Statement;

/// A label table is a mapping of labels to their instruction indices
pub type LabelTable = HashMap<String, usize>;

/// A decoded instruction. Produced by the assembler, never mutated.
///
/// Operand lexemes are carried raw: the interpreter resolves registers,
/// literals, addresses, and label names when the instruction executes.
/// An unrecognized mnemonic decodes to [`Instr::Unknown`] and traps when
/// dispatched, so a bad instruction the program never reaches is
/// harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    // stack
    Push(String),
    Pop(String),
    Load(String),
    Store(String),
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    // comparisons
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // control flow
    Goto(String),
    Jumpz(String),
    Jumpi(String),
    Decjz(String, String),
    // streaming
    Open(String),
    Play(Option<String>),
    Pause,
    Stop,
    Seek(String),
    Forward(String),
    Rewind(String),
    Wait(String),
    // sensors
    GetPos,
    GetDur,
    GetEnded,
    GetPlaying,
    // output
    Print,
    Prints(String),
    Halt,
    /// An unrecognized mnemonic, kept uppercased for the error message
    Unknown(String),
}

/// Assemble source code into an instruction vector and a label table
pub fn assemble(source: &str) -> Result<(Vec<Instr>, LabelTable), Error> {
    let labels = first_pass(source)?;
    Ok((second_pass(source), labels))
}

/// Strip a trailing `;` or `#` comment and surrounding whitespace
fn clean(line: &str) -> &str {
    let line = line.splitn(2, ';').next().unwrap_or("");
    let line = line.splitn(2, '#').next().unwrap_or("");
    line.trim()
}

fn first_pass(source: &str) -> Result<LabelTable, Error> {
    let mut labels = LabelTable::new();
    let mut idx = 0;

    for (line_index, raw) in source.lines().enumerate() {
        let line = clean(raw);
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_suffix(':') {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::EmptyLabel {
                    line_number: line_index + 1,
                    line: line.to_string(),
                });
            }
            if labels.insert(name.to_string(), idx).is_some() {
                return Err(Error::DuplicateLabel {
                    label: name.to_string(),
                    line_number: line_index + 1,
                    line: line.to_string(),
                });
            }
        } else {
            // label lines do not consume an instruction index
            idx += 1;
        }
    }

    Ok(labels)
}

fn second_pass(source: &str) -> Vec<Instr> {
    let mut program = Vec::new();

    for raw in source.lines() {
        let line = clean(raw);
        if line.is_empty() || line.ends_with(':') {
            continue;
        }
        program.push(decode(&Statement::lex(line)));
    }

    program
}

/// An error that can occur while loading a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A label definition with no name before the colon
    EmptyLabel {
        line_number: usize,
        line: String,
    },
    /// The same label was defined twice
    DuplicateLabel {
        label: String,
        line_number: usize,
        line: String,
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (message, line_number, line) = match self {
            Error::EmptyLabel { line_number, line } => (
                format!("empty label definition at line {}", line_number),
                line_number,
                line,
            ),
            Error::DuplicateLabel { label, line_number, line } => (
                format!("duplicate label \"{}\" at line {}", label, line_number),
                line_number,
                line,
            ),
        };
        writeln!(f, "{}", message)?;
        write!(f, "{}\t{}", line_number, line)
    }
}
