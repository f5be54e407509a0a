use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use tlang_error::{Result, TlangError};

use super::datatype::DataType;
use super::field::Field;
use super::scalar::ScalarValue;
use super::{Table, mean, median, sample_std};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Mean,
    Std,
    Min,
    Max,
    Sum,
    Median,
}

impl AggregateFunction {
    /// Functions applied when none are named.
    pub const DEFAULTS: &[AggregateFunction] = &[
        AggregateFunction::Count,
        AggregateFunction::Mean,
        AggregateFunction::Std,
        AggregateFunction::Min,
        AggregateFunction::Max,
    ];

    fn output_type(&self, input: DataType) -> DataType {
        match self {
            Self::Count => DataType::Int64,
            Self::Mean | Self::Std | Self::Median => DataType::Float64,
            Self::Min | Self::Max | Self::Sum => input,
        }
    }

    fn apply(&self, values: &[&ScalarValue], input: DataType) -> Result<ScalarValue> {
        let non_null: Vec<&ScalarValue> = values.iter().copied().filter(|v| !v.is_null()).collect();
        let floats: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();

        Ok(match self {
            Self::Count => ScalarValue::Int64(non_null.len() as i64),
            Self::Mean => mean(&floats).into(),
            Self::Std => sample_std(&floats).into(),
            Self::Median => median(&floats).into(),
            Self::Min => non_null
                .iter()
                .min_by(|a, b| a.total_cmp(b))
                .map(|v| (*v).clone())
                .unwrap_or(ScalarValue::Null),
            Self::Max => non_null
                .iter()
                .max_by(|a, b| a.total_cmp(b))
                .map(|v| (*v).clone())
                .unwrap_or(ScalarValue::Null),
            Self::Sum => match input {
                DataType::Int64 => {
                    let mut sum: i64 = 0;
                    for v in &non_null {
                        if let ScalarValue::Int64(v) = v {
                            sum = sum
                                .checked_add(*v)
                                .ok_or_else(|| TlangError::new("Integer overflow in sum"))?;
                        }
                    }
                    ScalarValue::Int64(sum)
                }
                _ => ScalarValue::Float64(floats.iter().sum()),
            },
        })
    }
}

impl FromStr for AggregateFunction {
    type Err = TlangError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "count" => Self::Count,
            "mean" => Self::Mean,
            "std" => Self::Std,
            "min" => Self::Min,
            "max" => Self::Max,
            "sum" => Self::Sum,
            "median" => Self::Median,
            other => {
                return Err(TlangError::syntax(format!(
                    "Invalid aggregate function: {other}"
                )));
            }
        })
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Count => "count",
            Self::Mean => "mean",
            Self::Std => "std",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Median => "median",
        };
        write!(f, "{s}")
    }
}

impl Table {
    /// Group rows by the `by` columns and aggregate numeric columns.
    ///
    /// Rows with a null in any group column are dropped. With no group
    /// columns the whole table is a single group. Output groups are sorted by
    /// key.
    pub fn group_by(
        &self,
        by: &[String],
        only: Option<&[String]>,
        aggs: &[AggregateFunction],
    ) -> Result<Table> {
        let keys = by
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>>>()?;

        let agg_cols: Vec<usize> = match only {
            Some(names) => names
                .iter()
                .map(|name| {
                    let idx = self.require_column(name)?;
                    if keys.contains(&idx) {
                        return Err(TlangError::reference(format!(
                            "Cannot aggregate a group by column: {name}"
                        )));
                    }
                    if !self.fields()[idx].datatype.is_numeric() {
                        return Err(TlangError::new(format!(
                            "Cannot aggregate a non-numeric column: {name}"
                        )));
                    }
                    Ok(idx)
                })
                .collect::<Result<_>>()?,
            None => (0..self.num_columns())
                .filter(|idx| !keys.contains(idx) && self.fields()[*idx].datatype.is_numeric())
                .collect(),
        };

        let aggs = if aggs.is_empty() {
            AggregateFunction::DEFAULTS
        } else {
            aggs
        };

        let mut groups: HashMap<Vec<ScalarValue>, Vec<usize>> = HashMap::new();
        for row in 0..self.num_rows() {
            let key: Vec<ScalarValue> = keys.iter().map(|&k| self.columns()[k][row].clone()).collect();
            if key.iter().any(|v| v.is_null()) {
                continue;
            }
            groups.entry(key).or_default().push(row);
        }
        if keys.is_empty() {
            groups.entry(Vec::new()).or_default();
        }

        let mut groups: Vec<(Vec<ScalarValue>, Vec<usize>)> = groups.into_iter().collect();
        groups.sort_by(|(a, _), (b, _)| {
            a.iter()
                .zip(b)
                .map(|(a, b)| a.total_cmp(b))
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut fields: Vec<Field> = keys.iter().map(|&k| self.fields()[k].clone()).collect();
        let mut columns: Vec<Vec<ScalarValue>> = (0..keys.len())
            .map(|pos| groups.iter().map(|(key, _)| key[pos].clone()).collect())
            .collect();

        for &col in &agg_cols {
            let field = &self.fields()[col];
            for agg in aggs {
                let mut out = Field::new(
                    format!("{}_{agg}", field.name),
                    agg.output_type(field.datatype),
                );
                out.alias = field.alias.as_ref().map(|alias| format!("{alias}_{agg}"));
                fields.push(out);
                let values = groups
                    .iter()
                    .map(|(_, rows)| {
                        let values: Vec<&ScalarValue> =
                            rows.iter().map(|&r| &self.columns()[col][r]).collect();
                        agg.apply(&values, field.datatype)
                    })
                    .collect::<Result<Vec<_>>>()?;
                columns.push(values);
            }
        }

        Table::try_new(fields, columns)
    }
}
