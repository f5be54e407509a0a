//! Script parameters: `args.NAME` and `args.NAME or DEFAULT`.
use std::collections::HashSet;

use indexmap::IndexMap;
use tlang_error::{Result, TlangError};
use tracing::trace;

use crate::command::{Command, RESERVED_WORDS};
use crate::stack::Stack;
use crate::tokens::{Token, is_word, tokenize_spanned};

const ARGS_PREFIX: &str = "args.";
const OR: &str = "or";

/// Script arguments for one invocation level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    bindings: IndexMap<String, String>,
}

impl Namespace {
    pub fn new<I, K, V>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Namespace {
            bindings: bindings
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Stack of namespaces, one per nested script invocation.
///
/// The root namespace is always present.
#[derive(Debug, Clone)]
pub struct CallStack {
    scopes: Stack<Namespace>,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(Namespace::default())
    }
}

impl CallStack {
    pub fn new(root: Namespace) -> Self {
        let mut scopes = Stack::new();
        scopes.push(root);
        CallStack { scopes }
    }

    pub fn push(&mut self, namespace: Namespace) {
        self.scopes.push(namespace);
    }

    /// Pop the innermost namespace. The root namespace is never popped.
    pub fn pop(&mut self) -> Option<Namespace> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Number of namespaces, 1 at the top level.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Look up a script argument, innermost namespace first.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.scopes.iter().find_map(|ns| ns.get(name))
    }
}

/// Bind script arguments in a statement and parse the result.
pub fn bind_command(statement: &str, calls: &CallStack) -> Result<Command> {
    let bound = bind_text(statement, calls)?;
    if bound != statement {
        trace!(%statement, %bound, "bound script arguments");
    }
    Command::parse(&bound)
}

/// Bind a token sequence, returning the substituted text.
pub fn bind_args<S: AsRef<str>>(tokens: &[S], calls: &CallStack) -> Result<String> {
    let source = tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    bind_text(&source, calls)
}

/// Replace every script argument reference in `source` with its bound value.
///
/// Text outside of argument references keeps its original spacing, except
/// that a bound value is glued to a directly following word so that names
/// can be built from arguments (`args.demo _pct`).
pub fn bind_text(source: &str, calls: &CallStack) -> Result<String> {
    let tokens = tokenize_spanned(source);
    if !tokens.iter().any(|t| t.text.starts_with(ARGS_PREFIX)) {
        return Ok(source.to_string());
    }

    let dropped = wrapping_parens(&tokens);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    let mut idx = 0;

    while idx < tokens.len() {
        let tok = &tokens[idx];

        if dropped.contains(&idx) {
            out.push_str(&source[cursor..tok.span.start]);
            cursor = tok.span.end;
            idx += 1;
            continue;
        }

        let Some(name) = tok.text.strip_prefix(ARGS_PREFIX) else {
            idx += 1;
            continue;
        };
        if name.is_empty() {
            return Err(TlangError::syntax(format!(
                "Invalid script argument reference: {}",
                tok.text
            )));
        }

        let (default, last) = match (tokens.get(idx + 1), tokens.get(idx + 2)) {
            (Some(or), Some(default)) if or.text == OR => (Some(default.text.as_str()), idx + 2),
            _ => (None, idx),
        };

        let value = match (calls.lookup(name), default) {
            (Some(value), _) => value,
            (None, Some(default)) => default,
            (None, None) => {
                return Err(TlangError::binding(format!(
                    "No value for script argument '{name}' and no default given"
                )));
            }
        };

        out.push_str(&source[cursor..tok.span.start]);
        out.push_str(value);
        cursor = tokens[last].span.end;
        idx = last + 1;

        if let Some(next) = tokens.get(idx) {
            let reserved = RESERVED_WORDS.contains(&next.text.as_str());
            if is_word(&next.text) && !dropped.contains(&idx) && !reserved {
                cursor = next.span.start;
            }
        }
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Indices of parentheses that only wrap a single argument declaration, e.g.
/// `(args.foo)` or `(args.foo or 'x')`. Call parentheses (preceded by a word)
/// are never considered wrapping.
fn wrapping_parens(tokens: &[Token]) -> HashSet<usize> {
    let mut dropped = HashSet::new();
    let text = |idx: usize| tokens.get(idx).map(|t| t.text.as_str());

    for idx in 0..tokens.len() {
        if text(idx) != Some("(") {
            continue;
        }
        if idx > 0 && is_word(&tokens[idx - 1].text) {
            continue;
        }
        if !text(idx + 1).is_some_and(|t| t.starts_with(ARGS_PREFIX)) {
            continue;
        }

        if text(idx + 2) == Some(")") {
            dropped.insert(idx);
            dropped.insert(idx + 2);
        } else if text(idx + 2) == Some(OR) && text(idx + 4) == Some(")") {
            dropped.insert(idx);
            dropped.insert(idx + 4);
        }
    }

    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls(bindings: &[(&str, &str)]) -> CallStack {
        CallStack::new(Namespace::new(bindings.iter().copied()))
    }

    #[test]
    fn bind_token_list() {
        let tokens = ["args.foo", "or", "'x'"];
        assert_eq!("'x'", bind_args(&tokens, &calls(&[])).unwrap());
        assert_eq!("'y'", bind_args(&tokens, &calls(&[("foo", "'y'")])).unwrap());

        let err = bind_args(&["args.foo"], &calls(&[])).unwrap_err();
        assert_eq!(tlang_error::ErrorKind::Binding, err.kind());
    }

    #[test]
    fn bind_statements() {
        let scope = calls(&[("bar", "'A'"), ("bas", "mumble"), ("demo", "Black"), ("f", "True")]);

        // (input, expected)
        let cases = [
            ("read(args.bar or 'x', args.bas)", "read('A', mumble)"),
            ("read(args.missing or 'x')", "read('x')"),
            ("read((args.bar))", "read('A')"),
            ("read((args.missing or 'x'))", "read('x')"),
            ("keep(a, (args.bas))", "keep(a, mumble)"),
            ("derive(args.demo _pct, args.demo / Total)", "derive(Black_pct, Black / Total)"),
            ("select((foo + args.missing or 1) > 2)", "select((foo + 1) > 2)"),
            ("derive(y, f(args.bas))", "derive(y, f(mumble))"),
            ("select(args.f and Pop > 1)", "select(True and Pop > 1)"),
            ("select(args.bas in xs)", "select(mumble in xs)"),
            ("select(args.bas is None)", "select(mumble is None)"),
            ("show()", "show()"),
        ];

        for (input, expected) in cases {
            assert_eq!(expected, bind_text(input, &scope).unwrap(), "input: {input}");
        }
    }

    #[test]
    fn innermost_scope_wins() {
        let mut scope = calls(&[("a", "outer"), ("b", "root")]);
        scope.push(Namespace::new([("a", "inner")]));
        assert_eq!(2, scope.depth());
        assert_eq!("keep(inner, root)", bind_text("keep(args.a, args.b)", &scope).unwrap());

        scope.pop();
        assert_eq!("keep(outer)", bind_text("keep(args.a)", &scope).unwrap());

        // Root is never popped.
        assert!(scope.pop().is_none());
        assert_eq!(1, scope.depth());
    }

    #[test]
    fn bind_and_parse() {
        let scope = calls(&[("how", "left")]);
        let cmd = bind_command("join(how=args.how or inner)", &scope).unwrap();
        assert_eq!(Some(&"left".to_string()), cmd.keyword.get("how"));
    }
}
