//! Token level rewrites applied before parsing an expression.
//!
//! Slices (`[2:5]`) are grouped into a single `slice[2:5]` token, and calls
//! to registered functions are collapsed into a `NAME(ref)` marker token
//! whose arguments are kept on the side in a [`UdfCall`].
use std::sync::Arc;

use tlang_error::{Result, TlangError};
use tracing::trace;

use crate::udf::{ScalarFunction, UdfRegistry};

pub const SLICE_PREFIX: &str = "slice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SliceState {
    Open,
    Start,
    Colon,
    Stop,
    Close,
}

fn is_int(tok: &str) -> bool {
    !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit())
}

/// Try to read a slice starting at `tokens[0] == "["`. Returns the grouped
/// text and the number of tokens consumed.
fn slice_tokens(tokens: &[String]) -> Option<(String, usize)> {
    let mut state = SliceState::Open;
    let mut grouped = String::from("[");

    for (idx, tok) in tokens.iter().enumerate().skip(1) {
        state = match (state, tok.as_str()) {
            (SliceState::Open, t) if is_int(t) => SliceState::Start,
            (SliceState::Open | SliceState::Start, ":") => SliceState::Colon,
            (SliceState::Colon, t) if is_int(t) => SliceState::Stop,
            (SliceState::Colon | SliceState::Stop, "]") => SliceState::Close,
            _ => return None,
        };
        grouped.push_str(tok);
        if state == SliceState::Close {
            return Some((grouped, idx + 1));
        }
    }

    None
}

/// Group `[ INT? : INT? ]` token runs into single slice tokens. Brackets
/// that don't start a slice are left alone.
pub fn mark_slices(tokens: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut idx = 0;
    while idx < tokens.len() {
        if tokens[idx] == "[" {
            if let Some((grouped, consumed)) = slice_tokens(&tokens[idx..]) {
                out.push(format!("{SLICE_PREFIX}{grouped}"));
                idx += consumed;
                continue;
            }
        }
        out.push(tokens[idx].clone());
        idx += 1;
    }
    out
}

/// Bounds of a slice token, e.g. `slice[2:]` -> `(Some(2), None)`.
pub fn parse_slice(tok: &str) -> Option<(Option<usize>, Option<usize>)> {
    let inner = tok
        .strip_prefix(SLICE_PREFIX)?
        .strip_prefix('[')?
        .strip_suffix(']')?;
    let (start, stop) = inner.split_once(':')?;
    let bound = |s: &str| -> Option<Option<usize>> {
        if s.is_empty() {
            Some(None)
        } else {
            s.parse().ok().map(Some)
        }
    };
    Some((bound(start)?, bound(stop)?))
}

/// One function call site inside an expression.
#[derive(Debug, Clone)]
pub struct UdfCall {
    pub name: String,
    /// Occurrence number of this function within the expression, from 1.
    pub reference: usize,
    pub alias: String,
    pub function: Arc<ScalarFunction>,
    /// Parameter name and the argument tokens bound to it.
    pub bindings: Vec<(String, Vec<String>)>,
}

impl UdfCall {
    /// The token that stands in for this call in the rewritten expression.
    pub fn marker(&self) -> String {
        format!("{}({})", self.name, self.reference)
    }
}

/// Collapse calls to registered functions into marker tokens.
///
/// Arguments are a flat, comma separated token list; parentheses inside a
/// call aren't supported. A function name not followed by `(` is left as is.
pub fn mark_udf_calls(
    tokens: &[String],
    registry: &mut UdfRegistry,
) -> Result<(Vec<String>, Vec<UdfCall>)> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut calls = Vec::new();
    let mut idx = 0;

    while idx < tokens.len() {
        let tok = &tokens[idx];
        let function = match registry.get(tok) {
            Some(function) if tokens.get(idx + 1).is_some_and(|t| t == "(") => function.clone(),
            _ => {
                out.push(tok.clone());
                idx += 1;
                continue;
            }
        };

        let open = idx + 1;
        let close = tokens[open + 1..]
            .iter()
            .position(|t| t == ")")
            .map(|pos| open + 1 + pos)
            .ok_or_else(|| {
                TlangError::syntax(format!(
                    "UDF call not completed: {}",
                    tokens[idx..].concat()
                ))
            })?;

        let inner = &tokens[open + 1..close];
        if inner.iter().any(|t| t == "(") {
            return Err(TlangError::syntax(format!(
                "Nested parentheses are not supported in UDF calls: {}",
                tokens[idx..=close].concat()
            )));
        }

        let args = split_call_args(inner)?;
        if args.len() < function.min_args() || args.len() > function.params().len() {
            return Err(TlangError::arity(format!(
                "'{}' takes {} arguments but {} were given",
                tok,
                function.params().len(),
                args.len()
            )));
        }

        let reference = registry.count(tok);
        let call = UdfCall {
            name: tok.clone(),
            reference,
            alias: UdfRegistry::alias(tok, reference),
            bindings: function.params().iter().cloned().zip(args).collect(),
            function,
        };
        trace!(alias = %call.alias, "marked function call");

        out.push(call.marker());
        calls.push(call);
        idx = close + 1;
    }

    Ok((out, calls))
}

fn split_call_args(tokens: &[String]) -> Result<Vec<Vec<String>>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let args: Vec<Vec<String>> = tokens
        .split(|t| t == ",")
        .map(|arg| arg.to_vec())
        .collect();
    if args.iter().any(|arg| arg.is_empty()) {
        return Err(TlangError::syntax(format!(
            "Empty argument in function call: {}",
            tokens.concat()
        )));
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::tokenize;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn slices() {
        // (input, expected)
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec!["[", "2", ":", "5", "]", "+", "foo"], vec!["slice[2:5]", "+", "foo"]),
            (vec!["[", "foo", "]"], vec!["[", "foo", "]"]),
            (vec!["a", "[", ":", "3", "]"], vec!["a", "slice[:3]"]),
            (vec!["a", "[", "1", ":", "]"], vec!["a", "slice[1:]"]),
            (vec!["a", "[", ":", "]"], vec!["a", "slice[:]"]),
            (vec!["a", "[", "1", ":", "2"], vec!["a", "[", "1", ":", "2"]),
            (vec!["[", "1", "]"], vec!["[", "1", "]"]),
        ];

        for (input, expected) in cases {
            assert_eq!(strings(&expected), mark_slices(&strings(&input)), "input: {input:?}");
        }
    }

    #[test]
    fn slice_bounds() {
        assert_eq!(Some((Some(2), Some(5))), parse_slice("slice[2:5]"));
        assert_eq!(Some((None, Some(3))), parse_slice("slice[:3]"));
        assert_eq!(Some((None, None)), parse_slice("slice[:]"));
        assert_eq!(None, parse_slice("[2:5]"));
    }

    fn registry() -> UdfRegistry {
        let mut registry = UdfRegistry::new();
        registry
            .define("f", &["x", "y"], "x + y")
            .unwrap();
        registry
    }

    #[test]
    fn distinct_aliases_per_call() {
        let mut registry = registry();
        let tokens = tokenize("f(a,b) + f(c,d)");
        let (out, calls) = mark_udf_calls(&tokens, &mut registry).unwrap();

        assert_eq!(strings(&["f(1)", "+", "f(2)"]), out);
        assert_eq!("_re_f_1", calls[0].alias);
        assert_eq!("_re_f_2", calls[1].alias);
        assert_eq!(
            vec![("x".to_string(), strings(&["a"])), ("y".to_string(), strings(&["b"]))],
            calls[0].bindings
        );
        assert_eq!(
            vec![("x".to_string(), strings(&["c"])), ("y".to_string(), strings(&["d"]))],
            calls[1].bindings
        );
    }

    #[test]
    fn call_errors() {
        let mut registry = registry();

        let err = mark_udf_calls(&tokenize("f(a, b"), &mut registry).unwrap_err();
        assert!(err.message().starts_with("UDF call not completed: "));

        let err = mark_udf_calls(&tokenize("f(a)"), &mut registry).unwrap_err();
        assert_eq!(tlang_error::ErrorKind::Arity, err.kind());

        assert!(mark_udf_calls(&tokenize("f(a, (b))"), &mut registry).is_err());
        assert!(mark_udf_calls(&tokenize("f(a,,b)"), &mut registry).is_err());
    }

    #[test]
    fn name_without_call_is_untouched() {
        let mut registry = registry();
        let tokens = tokenize("f + 1");
        let (out, calls) = mark_udf_calls(&tokens, &mut registry).unwrap();
        assert_eq!(tokens, out);
        assert!(calls.is_empty());
    }
}
