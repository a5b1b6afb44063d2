//! [Statement] struct and its utilities

use std::sync::LazyLock;

use regex::Regex;

/// Matches one operand token; commas count as whitespace
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^,\s]+").unwrap());

/// An instruction line lexed into an opcode and its argument lexemes.
/// Lexemes are not interpreted here; the interpreter resolves them when
/// the instruction executes.
#[derive(Debug, Clone)]
pub struct Statement<'a> {
    opcode: &'a str,
    arguments: Vec<&'a str>,
}

impl<'a> Statement<'a> {
    /// Lex one comment-stripped, trimmed, non-label source line.
    ///
    /// A double quote anywhere switches to string handling: the line is
    /// split once on whitespace, and a remainder enclosed in quotes
    /// becomes a single argument with the quotes removed. Every other
    /// line is tokenized with commas treated as whitespace.
    pub fn lex(line: &'a str) -> Statement<'a> {
        if line.contains('"') {
            let mut parts = line.splitn(2, char::is_whitespace);
            let opcode = parts.next().unwrap_or("");
            let rest = parts.next().unwrap_or("").trim();
            let arguments = if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') {
                vec![&rest[1..rest.len() - 1]]
            } else {
                tokenize(rest)
            };
            Statement { opcode, arguments }
        } else {
            let mut tokens = tokenize(line);
            let opcode = if tokens.is_empty() { "" } else { tokens.remove(0) };
            Statement { opcode, arguments: tokens }
        }
    }

    /// Get the opcode lexeme of the statement
    pub fn opcode(&self) -> &str {
        self.opcode
    }

    /// Get the argument lexeme at the given index, or an empty lexeme
    /// when the line did not provide one. An empty lexeme resolves to
    /// nothing at execution time, so the missing operand surfaces as a
    /// runtime error only if the instruction is reached.
    pub fn argument(&self, argument_index: usize) -> String {
        self.arguments
            .get(argument_index)
            .copied()
            .unwrap_or_default()
            .to_string()
    }

    /// Get the argument lexeme at the given index, when present
    pub fn opt_argument(&self, argument_index: usize) -> Option<String> {
        self.arguments.get(argument_index).map(|lexeme| lexeme.to_string())
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}
