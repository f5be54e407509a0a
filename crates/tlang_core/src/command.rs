//! Parse a statement into a verb and its arguments.
use indexmap::IndexMap;
use tlang_error::{Result, TlangError};

use crate::tokens::unquoted_char_indices;

/// Words that can never be used as column names.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "True", "False", "None", "args",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Positional(String),
    Keyword(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    /// Text between the outermost parentheses.
    pub args_raw: String,
    pub positional: Vec<String>,
    pub keyword: IndexMap<String, String>,
}

impl Command {
    pub fn parse(statement: &str) -> Result<Self> {
        let (verb, args_raw) = split_verb_and_args(statement)?;

        let mut positional = Vec::new();
        let mut keyword = IndexMap::new();
        for arg in split_args_string(args_raw)? {
            match classify_arg(&arg) {
                Argument::Positional(arg) => {
                    if !keyword.is_empty() {
                        return Err(TlangError::syntax(format!(
                            "Positional argument follows keyword argument: {arg}"
                        )));
                    }
                    positional.push(arg);
                }
                Argument::Keyword(key, value) => {
                    if keyword.insert(key.clone(), value).is_some() {
                        return Err(TlangError::syntax(format!(
                            "Duplicate keyword argument: {key}"
                        )));
                    }
                }
            }
        }

        Ok(Command {
            verb: verb.to_string(),
            args_raw: args_raw.to_string(),
            positional,
            keyword,
        })
    }

    pub fn num_args(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }
}

/// Split `verb(args)` into the verb and the raw argument string.
///
/// The argument string is everything between the first `(` and the last `)`.
pub fn split_verb_and_args(statement: &str) -> Result<(&str, &str)> {
    let statement = statement.trim();
    let (left, right) = match (statement.find('('), statement.rfind(')')) {
        (Some(left), Some(right)) if left < right => (left, right),
        _ => return Err(TlangError::syntax("Verbs must have matching parentheses.")),
    };

    let verb = statement[..left].trim();
    if verb.is_empty() {
        return Err(TlangError::syntax(
            "No verb found. Commands must have a verb and zero or more arguments.",
        ));
    }

    let trailing = statement[right + 1..].trim();
    if !trailing.is_empty() {
        return Err(TlangError::syntax(format!(
            "Unexpected text after command: {trailing}"
        )));
    }

    let mut depth: i64 = 0;
    for (_, c) in unquoted_char_indices(statement) {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => (),
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 {
        return Err(TlangError::syntax("Verbs must have matching parentheses."));
    }

    Ok((verb, &statement[left + 1..right]))
}

/// Split an argument string on top-level commas.
///
/// Commas nested in any bracket type or inside quotes don't split. A single
/// trailing comma is allowed.
pub fn split_args_string(args: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (idx, c) in unquoted_char_indices(args) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(args[start..idx].trim().to_string());
                start = idx + 1;
            }
            _ => (),
        }
    }

    let last = args[start..].trim();
    if !last.is_empty() || !out.is_empty() {
        out.push(last.to_string());
    }
    if out.last().is_some_and(|s| s.is_empty()) {
        out.pop();
    }

    if out.iter().any(|arg| arg.is_empty()) {
        return Err(TlangError::syntax(format!("Empty argument in '{args}'")));
    }

    Ok(out)
}

/// An argument is a keyword argument if it contains exactly one top-level
/// `=` (not part of a comparison operator) with text on both sides.
pub fn classify_arg(arg: &str) -> Argument {
    let chars: Vec<(usize, char)> = unquoted_char_indices(arg).collect();
    let mut depth: usize = 0;
    let mut equals = Vec::new();

    for (pos, &(idx, c)) in chars.iter().enumerate() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => {
                let prev = pos.checked_sub(1).map(|p| chars[p].1);
                let next = chars.get(pos + 1).map(|(_, c)| *c);
                let is_operator = matches!(prev, Some('=' | '<' | '>' | '!')) || next == Some('=');
                if !is_operator {
                    equals.push(idx);
                }
            }
            _ => (),
        }
    }

    if let [idx] = equals.as_slice() {
        let key = arg[..*idx].trim();
        let value = arg[idx + 1..].trim();
        if !key.is_empty() && !value.is_empty() {
            return Argument::Keyword(key.to_string(), value.to_string());
        }
    }

    Argument::Positional(arg.to_string())
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => (),
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Check that a name can be used as a column name.
pub fn validate_identifier(name: &str) -> Result<()> {
    if !is_identifier(name) {
        return Err(TlangError::syntax(format!("Invalid name: {name}")));
    }
    if RESERVED_WORDS.contains(&name) {
        return Err(TlangError::syntax(format!("Reserved word used as a name: {name}")));
    }
    Ok(())
}
