//! Assemble raw input lines into complete statements.
//!
//! A single line may hold several statements (`;` compound lines) and a single
//! statement may span several lines, either through an explicit trailing
//! backslash or through an unclosed `(`, `[` or `{`. Block comments delimited
//! by `"""` are discarded.
use tlang_error::{Result, TlangError};
use tracing::trace;

use crate::tokens::{quoted_ranges, unquoted_char_indices};

const HASH_COMMENT: char = '#';
const BLOCK_COMMENT: &str = "\"\"\"";
const BACKSLASH: char = '\\';
const ENCLOSING_PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Nothing to do for this line.
    Blank,
    /// The line was buffered, more input is needed.
    Continued,
    /// One or more statements are ready.
    Commands,
}

#[derive(Debug, Default)]
pub struct Reader {
    /// Set while inside a multi-line statement. Either a backslash or the
    /// innermost unmatched opening bracket.
    continuation_char: Option<char>,
    in_block: bool,
    pending: Vec<String>,
    commands: Vec<String>,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements completed by the most recent call to `next_line`.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<String> {
        std::mem::take(&mut self.commands)
    }

    /// If the reader is in the middle of a statement or block comment.
    pub fn is_pending(&self) -> bool {
        self.continuation_char.is_some() || self.in_block
    }

    /// Drop any partially read statement.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check that input ended on a statement boundary.
    pub fn finish(&self) -> Result<()> {
        if self.is_pending() {
            return Err(TlangError::syntax("Unexpected end of script."));
        }
        Ok(())
    }

    pub fn next_line(&mut self, line: &str) -> Result<ReadState> {
        self.commands.clear();

        let line = rewrite_input_line(line);
        if line.is_empty() {
            return Ok(ReadState::Blank);
        }

        if self.in_block {
            return Ok(self.continue_block(&line));
        }

        if let Some(c) = self.continuation_char {
            let result = self.continue_statement(c, line);
            if result.is_err() {
                self.reset();
            }
            return result;
        }

        if let Some(fragment) = opens_block_comment(&line) {
            trace!(%line, "block comment started");
            self.in_block = true;
            self.pending.push(fragment.to_string());
            return Ok(ReadState::Continued);
        }

        if let Some(stripped) = line.strip_suffix(BACKSLASH) {
            trace!(%line, "explicit continuation started");
            self.continuation_char = Some(BACKSLASH);
            self.pending.push(stripped.trim_end().to_string());
            return Ok(ReadState::Continued);
        }

        let brackets = BracketState::scan(&line);
        if brackets.mismatch.is_none() {
            if let Some(&open) = brackets.open.last() {
                trace!(%line, %open, "bracket continuation started");
                self.continuation_char = Some(open);
                self.pending.push(line);
                return Ok(ReadState::Continued);
            }
        }

        self.commands = split_compound_commands(&line);
        Ok(self.commands_state())
    }

    fn continue_statement(&mut self, continuation: char, line: String) -> Result<ReadState> {
        if continuation == BACKSLASH {
            if let Some(stripped) = line.strip_suffix(BACKSLASH) {
                self.pending.push(stripped.trim_end().to_string());
                return Ok(ReadState::Continued);
            }
        }

        match line.strip_suffix(BACKSLASH) {
            Some(stripped) => self.pending.push(stripped.trim_end().to_string()),
            None => self.pending.push(line),
        }

        let joined = self.pending.join(" ");
        let brackets = BracketState::scan(&joined);
        if let Some((open, close)) = brackets.mismatch {
            return Err(TlangError::syntax(format!(
                "Continuation mismatch: {open} {close}"
            )));
        }

        if let Some(&open) = brackets.open.last() {
            // Either still inside the brackets, or an explicit continuation
            // ended with brackets left open.
            self.continuation_char = Some(open);
            return Ok(ReadState::Continued);
        }

        trace!(statement = %joined, "continuation closed");
        self.pending.clear();
        self.continuation_char = None;
        self.commands = split_compound_commands(&concatenate_string_literals(&joined));
        Ok(self.commands_state())
    }

    fn continue_block(&mut self, line: &str) -> ReadState {
        match closes_block_comment(line) {
            Some(rest) => {
                trace!("block comment closed");
                self.pending.push(rest.to_string());
                let fragment = self.pending.join(" ");
                self.pending.clear();
                self.in_block = false;
                self.commands = split_compound_commands(fragment.trim());
                self.commands_state()
            }
            None => ReadState::Continued,
        }
    }

    fn commands_state(&self) -> ReadState {
        if self.commands.is_empty() {
            ReadState::Blank
        } else {
            ReadState::Commands
        }
    }
}

/// Remove comments and surrounding whitespace.
pub fn rewrite_input_line(line: &str) -> String {
    let line = remove_hash_comments(line);
    let line = remove_inline_block_comments(line);
    line.trim().to_string()
}

pub fn remove_hash_comments(line: &str) -> &str {
    match unquoted_char_indices(line).find(|(_, c)| *c == HASH_COMMENT) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Byte offsets of `"""` markers outside of string literals.
fn block_comment_markers(line: &str) -> Vec<usize> {
    let mut markers = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = line.char_indices();
    while let Some((idx, c)) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => (),
            None if line[idx..].starts_with(BLOCK_COMMENT) => {
                markers.push(idx);
                chars.nth(BLOCK_COMMENT.len() - 2);
            }
            None if c == '\'' || c == '"' => quote = Some(c),
            None => (),
        }
    }
    markers
}

/// Remove a block comment fully contained on one line.
pub fn remove_inline_block_comments(line: &str) -> String {
    let markers = block_comment_markers(line);
    match (markers.first(), markers.last()) {
        (Some(&first), Some(&last)) if first != last => {
            let joined = format!("{} {}", &line[..first], &line[last + BLOCK_COMMENT.len()..]);
            joined.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        _ => line.to_string(),
    }
}

/// Returns the text before the comment marker if the line opens a block
/// comment.
fn opens_block_comment(line: &str) -> Option<&str> {
    block_comment_markers(line)
        .first()
        .map(|&idx| line[..idx].trim())
}

/// Returns the text after the comment marker if the line closes a block
/// comment.
fn closes_block_comment(line: &str) -> Option<&str> {
    line.rfind(BLOCK_COMMENT)
        .map(|idx| line[idx + BLOCK_COMMENT.len()..].trim())
}

/// Split on `;` outside of quotes and brackets. Empty statements are dropped.
pub fn split_compound_commands(line: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    for (idx, c) in unquoted_char_indices(line) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                commands.push(line[start..idx].trim().to_string());
                start = idx + 1;
            }
            _ => (),
        }
    }
    commands.push(line[start..].trim().to_string());
    commands.retain(|c| !c.is_empty());
    commands
}

/// Merge adjacent string literals separated only by whitespace:
/// `'abc' 'def'` becomes `'abcdef'`.
pub fn concatenate_string_literals(line: &str) -> String {
    let ranges = quoted_ranges(line);
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    let mut idx = 0;

    while idx < ranges.len() {
        let range = &ranges[idx];
        let quote = &line[range.start..range.start + 1];
        out.push_str(&line[cursor..range.start]);
        out.push_str(&line[range.start..range.end - 1]);

        let mut end = range.end;
        while let Some(next) = ranges.get(idx + 1) {
            let gap = &line[end..next.start];
            if !gap.trim().is_empty() || !line[next.start..].starts_with(quote) {
                break;
            }
            out.push_str(&line[next.start + 1..next.end - 1]);
            end = next.end;
            idx += 1;
        }

        out.push_str(quote);
        cursor = end;
        idx += 1;
    }

    out.push_str(&line[cursor..]);
    out
}

/// Unmatched brackets in a piece of text, ignoring quoted strings.
#[derive(Debug, Default, PartialEq, Eq)]
struct BracketState {
    /// Openers without a closer, outermost first.
    open: Vec<char>,
    /// First closer that didn't match the innermost opener.
    mismatch: Option<(char, char)>,
}

impl BracketState {
    fn scan(text: &str) -> Self {
        let mut state = BracketState::default();
        for (_, c) in unquoted_char_indices(text) {
            if ENCLOSING_PAIRS.iter().any(|(open, _)| *open == c) {
                state.open.push(c);
                continue;
            }
            let Some((open, _)) = ENCLOSING_PAIRS.iter().find(|(_, close)| *close == c) else {
                continue;
            };
            match state.open.last() {
                Some(last) if last == open => {
                    state.open.pop();
                }
                Some(last) => {
                    state.mismatch = Some((*last, c));
                    return state;
                }
                // Stray closer, left for the command parser to report.
                None => (),
            }
        }
        state
    }
}
