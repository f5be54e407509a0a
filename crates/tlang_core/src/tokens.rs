//! Flat tokenization shared by argument binding and expression rewriting.
use std::ops::Range;

/// Characters that always end the current word. Every delimiter except space
/// is emitted as its own token.
pub const EXPR_DELIMS: &str = " \t,|()[]{}<>=+-*/:%!";

/// Two character operators collapsed from adjacent single character tokens.
const COMPOUND_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "**", "//"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Byte range in the source string. For collapsed operators this covers
    /// both source characters and anything between them.
    pub span: Range<usize>,
}

impl Token {
    pub fn is_delimiter(&self) -> bool {
        is_delimiter(&self.text)
    }
}

/// Split a string into tokens.
///
/// Quoted strings ('...' or "...") starting at a token boundary are kept
/// whole, including any spaces or delimiters inside them.
pub fn tokenize(s: &str) -> Vec<String> {
    tokenize_spanned(s).into_iter().map(|t| t.text).collect()
}

pub fn tokenize_spanned(s: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut quote: Option<char> = None;

    for (idx, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                let start = word_start.take().unwrap_or(idx);
                let end = idx + c.len_utf8();
                tokens.push(Token {
                    text: s[start..end].to_string(),
                    span: start..end,
                });
                quote = None;
            }
            continue;
        }

        if EXPR_DELIMS.contains(c) {
            if let Some(start) = word_start.take() {
                tokens.push(Token {
                    text: s[start..idx].to_string(),
                    span: start..idx,
                });
            }
            if !c.is_whitespace() {
                let end = idx + c.len_utf8();
                tokens.push(Token {
                    text: c.to_string(),
                    span: idx..end,
                });
            }
            continue;
        }

        if word_start.is_none() {
            word_start = Some(idx);
            if c == '\'' || c == '"' {
                quote = Some(c);
            }
        }
    }

    // Trailing word, or an unterminated quote.
    if let Some(start) = word_start {
        tokens.push(Token {
            text: s[start..].to_string(),
            span: start..s.len(),
        });
    }

    collapse_operators(tokens)
}

fn collapse_operators(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for tok in tokens {
        if let Some(prev) = out.last_mut() {
            if prev.text.len() == 1 && tok.text.len() == 1 {
                let combined = format!("{}{}", prev.text, tok.text);
                if COMPOUND_OPERATORS.contains(&combined.as_str()) {
                    prev.text = combined;
                    prev.span = prev.span.start..tok.span.end;
                    continue;
                }
            }
        }
        out.push(tok);
    }
    out
}

/// Is the token a delimiter or operator produced by the tokenizer?
pub fn is_delimiter(tok: &str) -> bool {
    let mut chars = tok.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !c.is_whitespace() && EXPR_DELIMS.contains(c),
        _ => COMPOUND_OPERATORS.contains(&tok),
    }
}

/// Is the token a word (identifier, number, literal), i.e. not a delimiter?
pub fn is_word(tok: &str) -> bool {
    !tok.is_empty() && !is_delimiter(tok)
}

pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}

/// Strip one layer of matching quotes if present.
pub fn unquote(s: &str) -> &str {
    let s = s.trim();
    if is_quoted(s) { &s[1..s.len() - 1] } else { s }
}

/// Find the quoted substrings of a line as byte ranges (quotes included).
///
/// Quotes match by kind; an unterminated quote is ignored.
pub fn quoted_ranges(line: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(char, usize)> = None;
    for (idx, c) in line.char_indices() {
        match open {
            None if c == '\'' || c == '"' => open = Some((c, idx)),
            Some((q, start)) if c == q => {
                ranges.push(start..idx + 1);
                open = None;
            }
            _ => (),
        }
    }
    ranges
}

/// Byte offsets of characters that sit outside any quoted string.
pub fn unquoted_char_indices(line: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let ranges = quoted_ranges(line);
    line.char_indices()
        .filter(move |(idx, _)| !ranges.iter().any(|r| r.contains(idx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_basic() {
        // (input, expected)
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("a + b", vec!["a", "+", "b"]),
            ("a==b", vec!["a", "==", "b"]),
            ("a = = b", vec!["a", "==", "b"]),
            ("x >= 10", vec!["x", ">=", "10"]),
            ("x != 'a b'", vec!["x", "!=", "'a b'"]),
            ("foo[2:5]", vec!["foo", "[", "2", ":", "5", "]"]),
            (
                "read(args.bar or 'x', args.bas)",
                vec!["read", "(", "args.bar", "or", "'x'", ",", "args.bas", ")"],
            ),
            ("f(a,b)", vec!["f", "(", "a", ",", "b", ")"]),
            ("  ", vec![]),
            ("'open", vec!["'open"]),
        ];

        for (input, expected) in cases {
            assert_eq!(expected, tokenize(input), "input: {input}");
        }
    }

    #[test]
    fn tokenize_is_idempotent() {
        let inputs = [
            "a + b * (c - 1)",
            "x===y",
            "derive(total, a+b)",
            "select(name == 'New York' and pop > 1000)",
            "sort((Total, DESC), name)",
            "join(on=[[a,b],[c,d]], suffixes=(None, '_z'))",
            "x // 2 ** 3 % 4",
            "first(5%)",
        ];

        for input in inputs {
            let once = tokenize(input);
            let twice = tokenize(&once.join(" "));
            assert_eq!(once, twice, "input: {input}");
        }
    }

    #[test]
    fn spans_cover_source() {
        let s = "derive(x, a + 'b c')";
        for tok in tokenize_spanned(s) {
            assert_eq!(tok.text, &s[tok.span.clone()]);
        }
    }

    #[test]
    fn delimiter_checks() {
        assert!(is_delimiter("("));
        assert!(is_delimiter("=="));
        assert!(!is_delimiter("foo"));
        assert!(is_word("args.foo"));
        assert!(!is_word(","));
    }

    #[test]
    fn unquote_strings() {
        assert_eq!("data.csv", unquote("'data.csv'"));
        assert_eq!("data.csv", unquote("\"data.csv\""));
        assert_eq!("data.csv", unquote("data.csv"));
        assert_eq!("'", unquote("'"));
    }

    #[test]
    fn quoted_ranges_skip_unterminated() {
        assert_eq!(vec![2..5], quoted_ranges("a 'b' 'c"));
    }
}
