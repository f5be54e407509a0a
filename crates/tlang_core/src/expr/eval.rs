//! Operator semantics on scalar values.
use std::cmp::Ordering;
use std::fmt;

use tlang_error::{Result, TlangError};

use crate::table::scalar::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
}

impl BinaryOperator {
    pub fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "or" => Self::Or,
            "and" => Self::And,
            "==" => Self::Eq,
            "!=" => Self::NotEq,
            "<" => Self::Lt,
            "<=" => Self::LtEq,
            ">" => Self::Gt,
            ">=" => Self::GtEq,
            "+" => Self::Plus,
            "-" => Self::Minus,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            "//" => Self::FloorDivide,
            "%" => Self::Modulo,
            "**" => Self::Power,
            _ => return None,
        })
    }

    /// Binding power, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => 4,
            Self::Plus | Self::Minus => 5,
            Self::Multiply | Self::Divide | Self::FloorDivide | Self::Modulo => 6,
            Self::Power => 8,
        }
    }

    fn is_comparison(&self) -> bool {
        self.precedence() == 4
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::FloorDivide => "//",
            Self::Modulo => "%",
            Self::Power => "**",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

pub fn eval_unary(op: UnaryOperator, value: ScalarValue) -> Result<ScalarValue> {
    match (op, value) {
        (_, ScalarValue::Null) => Ok(ScalarValue::Null),
        (UnaryOperator::Not, v) => Ok(ScalarValue::Boolean(!truthy(&v)?)),
        (UnaryOperator::Negate, ScalarValue::Int64(v)) => v
            .checked_neg()
            .map(ScalarValue::Int64)
            .ok_or_else(|| TlangError::new("Integer overflow")),
        (UnaryOperator::Negate, ScalarValue::Float64(v)) => Ok(ScalarValue::Float64(-v)),
        (UnaryOperator::Negate, v) => Err(TlangError::new(format!(
            "Bad operand type for unary -: {}",
            type_name(&v)
        ))),
    }
}

pub fn eval_binary(op: BinaryOperator, left: ScalarValue, right: ScalarValue) -> Result<ScalarValue> {
    match op {
        BinaryOperator::And => Ok(ScalarValue::Boolean(
            truthy_or_null(&left)? && truthy_or_null(&right)?,
        )),
        BinaryOperator::Or => Ok(ScalarValue::Boolean(
            truthy_or_null(&left)? || truthy_or_null(&right)?,
        )),
        op if op.is_comparison() => compare(op, &left, &right).map(ScalarValue::Boolean),
        op => arithmetic(op, left, right),
    }
}

fn type_name(v: &ScalarValue) -> String {
    match v.datatype() {
        Some(dt) => dt.to_string(),
        None => "null".to_string(),
    }
}

fn truthy(v: &ScalarValue) -> Result<bool> {
    match v {
        ScalarValue::Boolean(b) => Ok(*b),
        other => Err(TlangError::new(format!(
            "Expected True or False, got '{other}'"
        ))),
    }
}

fn truthy_or_null(v: &ScalarValue) -> Result<bool> {
    match v {
        ScalarValue::Null => Ok(false),
        v => truthy(v),
    }
}

fn compare(op: BinaryOperator, left: &ScalarValue, right: &ScalarValue) -> Result<bool> {
    if left.is_null() || right.is_null() {
        return Ok(op == BinaryOperator::NotEq);
    }

    let ord = match (left, right) {
        (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => a.cmp(b),
        (ScalarValue::Int64(a), ScalarValue::Int64(b)) => a.cmp(b),
        (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => a.cmp(b),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => match a.partial_cmp(&b) {
                Some(ord) => ord,
                // NaN compares unequal to everything.
                None => return Ok(op == BinaryOperator::NotEq),
            },
            _ => match op {
                BinaryOperator::Eq => return Ok(false),
                BinaryOperator::NotEq => return Ok(true),
                _ => {
                    return Err(TlangError::new(format!(
                        "Cannot compare {} and {}",
                        type_name(a),
                        type_name(b)
                    )));
                }
            },
        },
    };

    Ok(match op {
        BinaryOperator::Eq => ord == Ordering::Equal,
        BinaryOperator::NotEq => ord != Ordering::Equal,
        BinaryOperator::Lt => ord == Ordering::Less,
        BinaryOperator::LtEq => ord != Ordering::Greater,
        BinaryOperator::Gt => ord == Ordering::Greater,
        BinaryOperator::GtEq => ord != Ordering::Less,
        _ => false,
    })
}

/// Booleans take part in arithmetic as 0 and 1.
fn numeric(v: ScalarValue) -> ScalarValue {
    match v {
        ScalarValue::Boolean(b) => ScalarValue::Int64(b as i64),
        v => v,
    }
}

fn arithmetic(op: BinaryOperator, left: ScalarValue, right: ScalarValue) -> Result<ScalarValue> {
    let overflow = || TlangError::new("Integer overflow");

    match (numeric(left), numeric(right)) {
        (ScalarValue::Null, _) | (_, ScalarValue::Null) => Ok(ScalarValue::Null),

        (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) if op == BinaryOperator::Plus => {
            Ok(ScalarValue::Utf8(a + &b))
        }

        (ScalarValue::Int64(a), ScalarValue::Int64(b)) => Ok(match op {
            BinaryOperator::Plus => ScalarValue::Int64(a.checked_add(b).ok_or_else(overflow)?),
            BinaryOperator::Minus => ScalarValue::Int64(a.checked_sub(b).ok_or_else(overflow)?),
            BinaryOperator::Multiply => {
                ScalarValue::Int64(a.checked_mul(b).ok_or_else(overflow)?)
            }
            BinaryOperator::Divide => ScalarValue::Float64(a as f64 / b as f64),
            BinaryOperator::FloorDivide => {
                if b == 0 {
                    return Err(TlangError::new("Integer division by zero"));
                }
                let q = a.checked_div(b).ok_or_else(overflow)?;
                ScalarValue::Int64(if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q })
            }
            BinaryOperator::Modulo => {
                if b == 0 {
                    return Err(TlangError::new("Integer modulo by zero"));
                }
                let r = a.checked_rem(b).ok_or_else(overflow)?;
                ScalarValue::Int64(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
            }
            BinaryOperator::Power => match u32::try_from(b) {
                Ok(exp) => ScalarValue::Int64(a.checked_pow(exp).ok_or_else(overflow)?),
                Err(_) => ScalarValue::Float64((a as f64).powf(b as f64)),
            },
            _ => return Err(unsupported(op, "int64", "int64")),
        }),

        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(ScalarValue::Float64(match op {
                BinaryOperator::Plus => x + y,
                BinaryOperator::Minus => x - y,
                BinaryOperator::Multiply => x * y,
                BinaryOperator::Divide => x / y,
                BinaryOperator::FloorDivide => (x / y).floor(),
                BinaryOperator::Modulo => x - y * (x / y).floor(),
                BinaryOperator::Power => x.powf(y),
                _ => return Err(unsupported(op, &type_name(&a), &type_name(&b))),
            })),
            _ => Err(unsupported(op, &type_name(&a), &type_name(&b))),
        },
    }
}

fn unsupported(op: BinaryOperator, left: &str, right: &str) -> TlangError {
    TlangError::new(format!(
        "Unsupported operand types for {op}: {left} and {right}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> ScalarValue {
        ScalarValue::Int64(v)
    }

    fn float(v: f64) -> ScalarValue {
        ScalarValue::Float64(v)
    }

    #[test]
    fn arithmetic_results() {
        use BinaryOperator::*;

        // (op, left, right, expected)
        let cases = [
            (Plus, int(2), int(3), int(5)),
            (Minus, int(2), float(0.5), float(1.5)),
            (Divide, int(7), int(2), float(3.5)),
            (FloorDivide, int(7), int(2), int(3)),
            (FloorDivide, int(-7), int(2), int(-4)),
            (Modulo, int(-7), int(3), int(2)),
            (Modulo, float(7.5), float(2.0), float(1.5)),
            (Power, int(2), int(10), int(1024)),
            (Power, int(2), int(-1), float(0.5)),
            (Multiply, ScalarValue::Null, int(3), ScalarValue::Null),
            (Plus, ScalarValue::from("a"), ScalarValue::from("b"), ScalarValue::from("ab")),
            (Plus, ScalarValue::Boolean(true), int(1), int(2)),
        ];

        for (op, left, right, expected) in cases {
            assert_eq!(expected, eval_binary(op, left, right).unwrap(), "op: {op}");
        }
    }

    #[test]
    fn division_by_zero() {
        assert!(eval_binary(BinaryOperator::FloorDivide, int(1), int(0)).is_err());
        assert!(eval_binary(BinaryOperator::Modulo, int(1), int(0)).is_err());
        assert_eq!(
            float(f64::INFINITY),
            eval_binary(BinaryOperator::Divide, int(1), int(0)).unwrap()
        );
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(eval_binary(BinaryOperator::Plus, int(i64::MAX), int(1)).is_err());
        assert!(eval_unary(UnaryOperator::Negate, int(i64::MIN)).is_err());
    }

    #[test]
    fn comparisons() {
        use BinaryOperator::*;

        // (op, left, right, expected)
        let cases = [
            (Eq, int(1), float(1.0), true),
            (Lt, int(1), float(1.5), true),
            (GtEq, ScalarValue::from("b"), ScalarValue::from("a"), true),
            (Eq, ScalarValue::Null, ScalarValue::Null, false),
            (NotEq, ScalarValue::Null, int(1), true),
            (Eq, ScalarValue::from("1"), int(1), false),
            (NotEq, ScalarValue::from("1"), int(1), true),
        ];

        for (op, left, right, expected) in cases {
            assert_eq!(
                ScalarValue::Boolean(expected),
                eval_binary(op, left, right).unwrap(),
                "op: {op}"
            );
        }

        assert!(eval_binary(Lt, ScalarValue::from("a"), int(1)).is_err());
    }

    #[test]
    fn boolean_logic() {
        let t = ScalarValue::Boolean(true);
        let f = ScalarValue::Boolean(false);
        assert_eq!(f, eval_binary(BinaryOperator::And, t.clone(), f.clone()).unwrap());
        assert_eq!(t, eval_binary(BinaryOperator::Or, f.clone(), t.clone()).unwrap());
        assert_eq!(f, eval_binary(BinaryOperator::And, t.clone(), ScalarValue::Null).unwrap());
        assert_eq!(f, eval_unary(UnaryOperator::Not, t).unwrap());
        assert!(eval_binary(BinaryOperator::And, int(1), f).is_err());
    }
}
