//! Precedence climbing parser over rewritten expression tokens.
use tlang_error::{Result, TlangError};

use super::Expr;
use super::eval::{BinaryOperator, UnaryOperator};
use super::rewrite::{SLICE_PREFIX, UdfCall, parse_slice};
use crate::table::scalar::ScalarValue;
use crate::tokens::{is_quoted, unquote};

/// Binding power of `not`.
const NOT_PRECEDENCE: u8 = 3;
/// Binding power of unary minus. Lower than `**` so `-2 ** 2` is `-(2 ** 2)`.
const NEGATE_PRECEDENCE: u8 = 7;

pub struct Parser<'a> {
    tokens: &'a [String],
    idx: usize,
    columns: &'a [&'a str],
    calls: &'a [UdfCall],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [String], columns: &'a [&'a str], calls: &'a [UdfCall]) -> Self {
        Parser {
            tokens,
            idx: 0,
            columns,
            calls,
        }
    }

    /// Parse the full token list as a single expression.
    pub fn parse(mut self) -> Result<Expr> {
        if self.tokens.is_empty() {
            return Err(TlangError::syntax("Empty expression"));
        }
        if self.tokens.iter().any(|t| t == "=") {
            return Err(TlangError::syntax("Use '==' for equality comparison."));
        }

        let expr = self.parse_expr(0)?;
        if let Some(tok) = self.peek() {
            return Err(TlangError::syntax(format!(
                "Unexpected token in expression: {tok}"
            )));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.idx).map(|s| s.as_str())
    }

    fn next(&mut self) -> Option<&'a str> {
        let tok = self.peek();
        self.idx += 1;
        tok
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_prefix()?;

        while let Some(tok) = self.peek() {
            if tok.starts_with(SLICE_PREFIX) {
                if let Some((start, stop)) = parse_slice(tok) {
                    self.idx += 1;
                    left = Expr::Slice {
                        expr: Box::new(left),
                        start,
                        stop,
                    };
                    continue;
                }
            }

            let Some(op) = BinaryOperator::from_token(tok) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.idx += 1;

            // '**' is right associative and allows a unary minus on its right.
            let right = if op == BinaryOperator::Power {
                self.parse_expr(NEGATE_PRECEDENCE)?
            } else {
                self.parse_expr(prec + 1)?
            };

            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        let tok = self
            .next()
            .ok_or_else(|| TlangError::syntax("Unexpected end of expression"))?;

        match tok {
            "not" => Ok(Expr::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(self.parse_expr(NOT_PRECEDENCE)?),
            }),
            "-" => Ok(Expr::Unary {
                op: UnaryOperator::Negate,
                expr: Box::new(self.parse_expr(NEGATE_PRECEDENCE)?),
            }),
            "+" => self.parse_expr(NEGATE_PRECEDENCE),
            "(" => {
                let expr = self.parse_expr(0)?;
                match self.next() {
                    Some(")") => Ok(expr),
                    _ => Err(TlangError::syntax("Expected ')' in expression")),
                }
            }
            tok => self.parse_atom(tok),
        }
    }

    fn parse_atom(&mut self, tok: &str) -> Result<Expr> {
        if let Some(index) = self.columns.iter().position(|c| *c == tok) {
            return Ok(Expr::Column {
                index,
                name: tok.to_string(),
            });
        }

        if let Some(call) = self.calls.iter().find(|c| c.marker() == tok) {
            let args = call
                .bindings
                .iter()
                .map(|(_, arg)| Parser::new(arg, self.columns, self.calls).parse())
                .collect::<Result<Vec<_>>>()?;
            return Ok(Expr::UdfCall {
                alias: call.alias.clone(),
                function: call.function.clone(),
                args,
            });
        }

        if let Some(value) = parse_literal(tok) {
            return Ok(Expr::Literal(value));
        }

        if tok.starts_with(SLICE_PREFIX) && parse_slice(tok).is_some() {
            return Err(TlangError::reference(format!(
                "Slice has nothing to apply to: {tok}"
            )));
        }

        Err(TlangError::reference(format!("Invalid column reference: {tok}")))
    }
}

fn parse_literal(tok: &str) -> Option<ScalarValue> {
    match tok {
        "True" => return Some(ScalarValue::Boolean(true)),
        "False" => return Some(ScalarValue::Boolean(false)),
        "None" => return Some(ScalarValue::Null),
        _ => (),
    }

    if is_quoted(tok) {
        return Some(ScalarValue::Utf8(unquote(tok).to_string()));
    }
    if tok.chars().all(|c| c.is_ascii_digit()) {
        return tok.parse::<i64>().ok().map(ScalarValue::Int64);
    }
    if tok.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && tok.chars().any(|c| c.is_ascii_digit())
    {
        return tok.parse::<f64>().ok().map(ScalarValue::Float64);
    }
    None
}

#[cfg(test)]
mod tests {
    use tlang_error::ErrorKind;

    use super::*;
    use crate::expr::rewrite::mark_slices;
    use crate::tokens::tokenize;

    fn parse(source: &str, columns: &[&str]) -> Result<Expr> {
        let tokens = mark_slices(&tokenize(source));
        Parser::new(&tokens, columns, &[]).parse()
    }

    #[test]
    fn literals() {
        // (input, expected)
        let cases = [
            ("1", ScalarValue::Int64(1)),
            ("2.5", ScalarValue::Float64(2.5)),
            (".5", ScalarValue::Float64(0.5)),
            ("'a b'", ScalarValue::from("a b")),
            ("\"x\"", ScalarValue::from("x")),
            ("True", ScalarValue::Boolean(true)),
            ("None", ScalarValue::Null),
        ];

        for (input, expected) in cases {
            assert_eq!(Some(expected), parse_literal(input), "input: {input}");
        }

        assert_eq!(None, parse_literal("abc"));
        assert_eq!(None, parse_literal("inf"));
    }

    #[test]
    fn precedence() {
        let row = [ScalarValue::Int64(2), ScalarValue::Int64(3)];
        let cols = ["a", "b"];

        // (input, expected)
        let cases = [
            ("a + b * 2", ScalarValue::Int64(8)),
            ("(a + b) * 2", ScalarValue::Int64(10)),
            ("-a ** 2", ScalarValue::Int64(-4)),
            ("a ** -1", ScalarValue::Float64(0.5)),
            ("2 ** 3 ** 2", ScalarValue::Int64(512)),
            ("a - b - 1", ScalarValue::Int64(-2)),
            ("a < b and b < 4", ScalarValue::Boolean(true)),
            ("not a > b or False", ScalarValue::Boolean(true)),
            ("a + 1 == b", ScalarValue::Boolean(true)),
            ("b // a % 2", ScalarValue::Int64(1)),
        ];

        for (input, expected) in cases {
            let expr = parse(input, &cols).unwrap();
            assert_eq!(expected, expr.eval(&row).unwrap(), "input: {input}");
        }
    }

    #[test]
    fn slice_postfix() {
        let expr = parse("GEOID[0:2] + 'x'", &["GEOID"]).unwrap();
        let row = [ScalarValue::from("04013")];
        assert_eq!(ScalarValue::from("04x"), expr.eval(&row).unwrap());
    }

    #[test]
    fn errors() {
        let err = parse("a = 1", &["a"]).unwrap_err();
        assert_eq!("Use '==' for equality comparison.", err.message());

        let err = parse("a + nope", &["a"]).unwrap_err();
        assert_eq!(ErrorKind::Reference, err.kind());
        assert_eq!("Invalid column reference: nope", err.message());

        assert!(parse("(a + 1", &["a"]).is_err());
        assert!(parse("a 1", &["a"]).is_err());
        assert!(parse("a +", &["a"]).is_err());
    }
}
