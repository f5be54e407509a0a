//! Row expressions used by `select` and `derive`.
//!
//! An expression string goes through `tokenize -> mark_slices ->
//! mark_udf_calls -> parse` and ends up as an [`Expr`] tree that is
//! evaluated once per row.
pub mod eval;
pub mod parser;
pub mod rewrite;

use std::sync::Arc;

use tlang_error::{Result, TlangError};
use tracing::debug;

use crate::table::scalar::ScalarValue;
use crate::tokens::tokenize;
use crate::udf::{ScalarFunction, UdfRegistry};
use eval::{BinaryOperator, UnaryOperator, eval_binary, eval_unary};
use parser::Parser;
use rewrite::{UdfCall, mark_slices, mark_udf_calls};

#[derive(Debug, Clone)]
pub enum Expr {
    Column {
        index: usize,
        name: String,
    },
    Literal(ScalarValue),
    /// Character slice of a string value.
    Slice {
        expr: Box<Expr>,
        start: Option<usize>,
        stop: Option<usize>,
    },
    UdfCall {
        alias: String,
        function: Arc<ScalarFunction>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn eval(&self, row: &[ScalarValue]) -> Result<ScalarValue> {
        match self {
            Self::Column { index, name } => row.get(*index).cloned().ok_or_else(|| {
                TlangError::reference(format!("Invalid column reference: {name}"))
            }),
            Self::Literal(v) => Ok(v.clone()),
            Self::Slice { expr, start, stop } => match expr.eval(row)? {
                ScalarValue::Null => Ok(ScalarValue::Null),
                ScalarValue::Utf8(s) => {
                    let len = s.chars().count();
                    let start = start.unwrap_or(0).min(len);
                    let stop = stop.unwrap_or(len).min(len);
                    Ok(ScalarValue::Utf8(
                        s.chars().skip(start).take(stop.saturating_sub(start)).collect(),
                    ))
                }
                other => Err(TlangError::reference(format!(
                    "Cannot slice a non-string value: {other}"
                ))),
            },
            Self::UdfCall {
                alias,
                function,
                args,
            } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(row))
                    .collect::<Result<Vec<_>>>()?;
                function
                    .call(&values)
                    .map_err(|e| e.with_field("call", alias))
            }
            Self::Binary { op, left, right } => eval_binary(*op, left.eval(row)?, right.eval(row)?),
            Self::Unary { op, expr } => eval_unary(*op, expr.eval(row)?),
        }
    }

    /// Names of the columns referenced by this expression.
    pub fn column_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Self::Column { name, .. } => {
                if !refs.contains(&name.as_str()) {
                    refs.push(name)
                }
            }
            Self::Literal(_) => (),
            Self::Slice { expr, .. } | Self::Unary { expr, .. } => expr.collect_refs(refs),
            Self::UdfCall { args, .. } => args.iter().for_each(|a| a.collect_refs(refs)),
            Self::Binary { left, right, .. } => {
                left.collect_refs(refs);
                right.collect_refs(refs);
            }
        }
    }
}

/// An expression compiled against a set of column names.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    expr: Expr,
    calls: Vec<UdfCall>,
}

impl CompiledExpr {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Function call sites, in the order they appear.
    pub fn calls(&self) -> &[UdfCall] {
        &self.calls
    }

    pub fn eval(&self, row: &[ScalarValue]) -> Result<ScalarValue> {
        self.expr.eval(row)
    }
}

/// Compile an expression. Column references resolve to positions in
/// `columns`, which is the row layout `eval` will receive.
pub fn compile(source: &str, columns: &[&str], registry: &mut UdfRegistry) -> Result<CompiledExpr> {
    registry.reset_counts();

    let tokens = mark_slices(&tokenize(source));
    let (tokens, calls) = mark_udf_calls(&tokens, registry)?;
    let expr = Parser::new(&tokens, columns, &calls).parse()?;

    debug!(%source, calls = calls.len(), "compiled expression");

    Ok(CompiledExpr {
        source: source.to_string(),
        expr,
        calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_with_calls() {
        let mut registry = UdfRegistry::with_builtins();
        registry.define("share", &["part", "whole"], "part / whole").unwrap();

        let compiled = compile(
            "round(share(Black, Total), 2) + share(White, Total)",
            &["Black", "White", "Total"],
            &mut registry,
        );
        // Nested calls aren't supported.
        assert!(compiled.is_err());

        let compiled = compile(
            "share(Black, Total) + share(White, Total)",
            &["Black", "White", "Total"],
            &mut registry,
        )
        .unwrap();
        assert_eq!(2, compiled.calls().len());
        assert_eq!("_re_share_1", compiled.calls()[0].alias);
        assert_eq!("_re_share_2", compiled.calls()[1].alias);

        let row = [
            ScalarValue::Int64(25),
            ScalarValue::Int64(50),
            ScalarValue::Int64(100),
        ];
        assert_eq!(ScalarValue::Float64(0.75), compiled.eval(&row).unwrap());
        assert_eq!(vec!["Black", "Total", "White"], compiled.expr().column_refs());
    }

    #[test]
    fn counts_reset_per_expression() {
        let mut registry = UdfRegistry::with_builtins();
        let first = compile("abs(a)", &["a"], &mut registry).unwrap();
        let second = compile("abs(a)", &["a"], &mut registry).unwrap();
        assert_eq!(first.calls()[0].alias, second.calls()[0].alias);
    }

    #[test]
    fn slices_on_values() {
        let mut registry = UdfRegistry::new();
        let compiled = compile("name[1:3]", &["name"], &mut registry).unwrap();
        assert_eq!(ScalarValue::from("bc"), compiled.eval(&[ScalarValue::from("abcd")]).unwrap());
        assert_eq!(ScalarValue::from(""), compiled.eval(&[ScalarValue::from("a")]).unwrap());
        assert_eq!(ScalarValue::Null, compiled.eval(&[ScalarValue::Null]).unwrap());
        assert!(compiled.eval(&[ScalarValue::Int64(1)]).is_err());
    }
}
