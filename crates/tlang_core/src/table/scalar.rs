use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};
use tlang_error::{Result, TlangError};

use super::datatype::DataType;

/// A single value in a table.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl ScalarValue {
    /// Data type of the value, None for null.
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Int64(_) => Some(DataType::Int64),
            Self::Float64(_) => Some(DataType::Float64),
            Self::Utf8(_) => Some(DataType::Utf8),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Cast to another type. Nulls stay null.
    pub fn try_cast(&self, datatype: DataType) -> Result<ScalarValue> {
        let invalid = || TlangError::new(format!("Cannot cast '{self}' to {datatype}"));

        Ok(match (self, datatype) {
            (Self::Null, _) => Self::Null,

            (Self::Boolean(v), DataType::Boolean) => Self::Boolean(*v),
            (Self::Boolean(v), DataType::Int64) => Self::Int64(*v as i64),
            (Self::Boolean(v), DataType::Float64) => Self::Float64(if *v { 1.0 } else { 0.0 }),

            (Self::Int64(v), DataType::Boolean) => Self::Boolean(*v != 0),
            (Self::Int64(v), DataType::Int64) => Self::Int64(*v),
            (Self::Int64(v), DataType::Float64) => Self::Float64(*v as f64),

            (Self::Float64(v), DataType::Boolean) => Self::Boolean(*v != 0.0),
            (Self::Float64(v), DataType::Int64) => {
                Self::Int64(f64_to_i64(v.trunc()).ok_or_else(invalid)?)
            }
            (Self::Float64(v), DataType::Float64) => Self::Float64(*v),

            (Self::Utf8(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Self::Boolean(true),
                "false" | "0" => Self::Boolean(false),
                _ => return Err(invalid()),
            },
            (Self::Utf8(s), DataType::Int64) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(v) => Self::Int64(v),
                    Err(_) => match s.parse::<f64>() {
                        Ok(v) => Self::Int64(f64_to_i64(v.trunc()).ok_or_else(invalid)?),
                        Err(_) => return Err(invalid()),
                    },
                }
            }
            (Self::Utf8(s), DataType::Float64) => {
                Self::Float64(s.trim().parse::<f64>().map_err(|_| invalid())?)
            }

            (v, DataType::Utf8) => Self::Utf8(v.to_string()),
        })
    }

    /// Total ordering used for sorting and grouping.
    ///
    /// Nulls sort first, numbers compare by value across int and float, and
    /// values of otherwise different types compare by type.
    pub fn total_cmp(&self, other: &ScalarValue) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Int64(_) | Self::Float64(_) => 2,
            Self::Utf8(_) => 3,
        }
    }
}

/// Floats compare by value with all NaNs equal so values can be used as
/// hash keys.
impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => (),
            Self::Boolean(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => {
                let bits = if v.is_nan() {
                    f64::NAN.to_bits()
                } else if *v == 0.0 {
                    0.0f64.to_bits()
                } else {
                    v.to_bits()
                };
                bits.hash(state)
            }
            Self::Utf8(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => {
                // Keep a trailing '.0' on whole numbers so floats read as floats.
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Boolean(v) => serializer.serialize_bool(*v),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::Float64(v) if v.is_finite() => serializer.serialize_f64(*v),
            Self::Float64(_) => serializer.serialize_none(),
            Self::Utf8(v) => serializer.serialize_str(v),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

/// Convert a whole float to an integer, `None` if it's out of range or not
/// finite.
pub fn f64_to_i64(v: f64) -> Option<i64> {
    // i64::MAX isn't representable, the bound rounds up to 2^63.
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
