//! Hash joins between two tables.
use std::fmt;
use std::str::FromStr;

use hashbrown::{HashMap, HashSet};
use tlang_error::{Result, TlangError};
use tracing::debug;

use super::Table;
use super::field::Field;
use super::scalar::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
    Cross,
}

impl FromStr for JoinType {
    type Err = TlangError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "inner" => JoinType::Inner,
            "left" => JoinType::Left,
            "right" => JoinType::Right,
            "outer" => JoinType::Outer,
            "cross" => JoinType::Cross,
            other => return Err(TlangError::syntax(format!("Invalid join type: {other}"))),
        })
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
            Self::Cross => "cross",
        };
        write!(f, "{s}")
    }
}

/// Expected key cardinality between the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinValidate {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl FromStr for JoinValidate {
    type Err = TlangError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "1:1" | "one_to_one" => JoinValidate::OneToOne,
            "1:m" | "one_to_many" => JoinValidate::OneToMany,
            "m:1" | "many_to_one" => JoinValidate::ManyToOne,
            "m:m" | "many_to_many" => JoinValidate::ManyToMany,
            other => {
                return Err(TlangError::syntax(format!(
                    "Invalid join validation: {other}"
                )));
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    pub how: JoinType,
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
    /// Suffixes applied to colliding column names from the left and right
    /// tables.
    pub suffixes: (Option<String>, Option<String>),
    pub validate: Option<JoinValidate>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            how: JoinType::Inner,
            left_on: Vec::new(),
            right_on: Vec::new(),
            suffixes: (Some("_y".to_string()), Some("_x".to_string())),
            validate: None,
        }
    }
}

/// Shared column names to join on, in left table order.
pub fn infer_join_keys(left: &Table, right: &Table) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for field in left.fields() {
        let Some(other) = right.field(&field.name) else {
            continue;
        };
        if other.datatype != field.datatype {
            return Err(key_type_mismatch(&field.name, &other.name));
        }
        keys.push(field.name.clone());
    }

    if keys.is_empty() {
        return Err(TlangError::reference("There are no shared columns to JOIN on."));
    }
    Ok(keys)
}

fn key_type_mismatch(left: &str, right: &str) -> TlangError {
    TlangError::reference(format!(
        "JOIN columns ({left}, {right}) have different types in the two tables."
    ))
}

/// A matched output row. Either side may be missing for outer joins.
type RowPair = (Option<usize>, Option<usize>);

impl Table {
    /// Join `self` (the left table) with `right`.
    pub fn join(&self, right: &Table, opts: &JoinOptions) -> Result<Table> {
        let (left_keys, right_keys) = if opts.how == JoinType::Cross {
            (Vec::new(), Vec::new())
        } else {
            self.resolve_keys(right, opts)?
        };

        let pairs = match opts.how {
            JoinType::Cross => (0..self.num_rows())
                .flat_map(|l| (0..right.num_rows()).map(move |r| (Some(l), Some(r))))
                .collect(),
            how => {
                let left_index = key_index(self, &left_keys);
                let right_index = key_index(right, &right_keys);
                if let Some(validate) = opts.validate {
                    check_cardinality(validate, &left_index, &right_index)?;
                }
                match_rows(how, self, &left_keys, right, &right_keys, &right_index)
            }
        };

        debug!(how = %opts.how, rows = pairs.len(), "joined tables");

        // Right key columns are dropped when both sides join on the same names.
        let same_keys = opts.how != JoinType::Cross && opts.left_on == opts.right_on;
        let right_cols: Vec<usize> = (0..right.num_columns())
            .filter(|idx| !(same_keys && right_keys.contains(idx)))
            .collect();

        let left_names: HashSet<&str> = self.fields().iter().map(|f| f.name.as_str()).collect();
        let right_names: HashSet<&str> = right_cols
            .iter()
            .map(|&idx| right.fields()[idx].name.as_str())
            .collect();

        let (left_suffix, right_suffix) = &opts.suffixes;
        let has_collision = left_names.iter().any(|n| right_names.contains(n));
        if has_collision && left_suffix.is_none() && right_suffix.is_none() {
            return Err(TlangError::new(
                "Columns overlap but no suffix specified for the JOIN",
            ));
        }

        let mut fields = Vec::with_capacity(self.num_columns() + right_cols.len());
        let mut columns = Vec::with_capacity(fields.capacity());

        for (idx, field) in self.fields().iter().enumerate() {
            let mut field = field.clone();
            if right_names.contains(field.name.as_str()) {
                apply_suffix(&mut field, left_suffix.as_deref());
            }
            // An unmatched right row fills a shared key from the right table.
            let fallback = if same_keys {
                left_keys
                    .iter()
                    .position(|&k| k == idx)
                    .map(|pos| right_keys[pos])
            } else {
                None
            };
            let values = pairs
                .iter()
                .map(|&(l, r)| match (l, r, fallback) {
                    (Some(l), _, _) => self.columns()[idx][l].clone(),
                    (None, Some(r), Some(rk)) => right.columns()[rk][r].clone(),
                    _ => ScalarValue::Null,
                })
                .collect();
            fields.push(field);
            columns.push(values);
        }

        for &idx in &right_cols {
            let mut field = right.fields()[idx].clone();
            if left_names.contains(field.name.as_str()) {
                apply_suffix(&mut field, right_suffix.as_deref());
            }
            let values = pairs
                .iter()
                .map(|&(_, r)| match r {
                    Some(r) => right.columns()[idx][r].clone(),
                    None => ScalarValue::Null,
                })
                .collect();
            fields.push(field);
            columns.push(values);
        }

        Table::try_new(fields, columns)
    }

    fn resolve_keys(&self, right: &Table, opts: &JoinOptions) -> Result<(Vec<usize>, Vec<usize>)> {
        if opts.left_on.len() != opts.right_on.len() {
            return Err(TlangError::arity(
                "JOIN must have the same number of columns on both sides.",
            ));
        }

        let (left_on, right_on) = if opts.left_on.is_empty() {
            let keys = infer_join_keys(self, right)?;
            (keys.clone(), keys)
        } else {
            (opts.left_on.clone(), opts.right_on.clone())
        };

        let mut left_keys = Vec::with_capacity(left_on.len());
        let mut right_keys = Vec::with_capacity(right_on.len());
        for (l, r) in left_on.iter().zip(&right_on) {
            let li = self.require_column(l)?;
            let ri = right.require_column(r)?;
            if self.fields()[li].datatype != right.fields()[ri].datatype {
                return Err(key_type_mismatch(l, r));
            }
            left_keys.push(li);
            right_keys.push(ri);
        }

        Ok((left_keys, right_keys))
    }
}

fn apply_suffix(field: &mut Field, suffix: Option<&str>) {
    if let Some(suffix) = suffix {
        field.name = format!("{}{suffix}", field.name);
        if let Some(alias) = &mut field.alias {
            alias.push_str(suffix);
        }
    }
}

fn key_of(table: &Table, keys: &[usize], row: usize) -> Vec<ScalarValue> {
    keys.iter().map(|&k| table.columns()[k][row].clone()).collect()
}

/// Row indices for every distinct key, in first-seen order within a key.
fn key_index(table: &Table, keys: &[usize]) -> HashMap<Vec<ScalarValue>, Vec<usize>> {
    let mut index: HashMap<Vec<ScalarValue>, Vec<usize>> = HashMap::new();
    for row in 0..table.num_rows() {
        index.entry(key_of(table, keys, row)).or_default().push(row);
    }
    index
}

fn check_cardinality(
    validate: JoinValidate,
    left: &HashMap<Vec<ScalarValue>, Vec<usize>>,
    right: &HashMap<Vec<ScalarValue>, Vec<usize>>,
) -> Result<()> {
    let unique = |index: &HashMap<Vec<ScalarValue>, Vec<usize>>| index.values().all(|rows| rows.len() == 1);

    let (check_left, check_right, name) = match validate {
        JoinValidate::OneToOne => (true, true, "one-to-one"),
        JoinValidate::OneToMany => (true, false, "one-to-many"),
        JoinValidate::ManyToOne => (false, true, "many-to-one"),
        JoinValidate::ManyToMany => return Ok(()),
    };

    if check_left && !unique(left) {
        return Err(TlangError::new(format!(
            "JOIN keys are not unique in left table; not a {name} join"
        )));
    }
    if check_right && !unique(right) {
        return Err(TlangError::new(format!(
            "JOIN keys are not unique in right table; not a {name} join"
        )));
    }
    Ok(())
}

fn match_rows(
    how: JoinType,
    left: &Table,
    left_keys: &[usize],
    right: &Table,
    right_keys: &[usize],
    right_index: &HashMap<Vec<ScalarValue>, Vec<usize>>,
) -> Vec<RowPair> {
    let mut pairs = Vec::new();

    if how == JoinType::Right {
        let left_index = key_index(left, left_keys);
        for r in 0..right.num_rows() {
            match left_index.get(&key_of(right, right_keys, r)) {
                Some(rows) => pairs.extend(rows.iter().map(|&l| (Some(l), Some(r)))),
                None => pairs.push((None, Some(r))),
            }
        }
        return pairs;
    }

    let mut matched_right = vec![false; right.num_rows()];
    for l in 0..left.num_rows() {
        match right_index.get(&key_of(left, left_keys, l)) {
            Some(rows) => {
                for &r in rows {
                    matched_right[r] = true;
                    pairs.push((Some(l), Some(r)));
                }
            }
            None if how != JoinType::Inner => pairs.push((Some(l), None)),
            None => (),
        }
    }

    if how == JoinType::Outer {
        pairs.extend(
            matched_right
                .iter()
                .enumerate()
                .filter(|(_, matched)| !**matched)
                .map(|(r, _)| (None, Some(r))),
        );
    }

    pairs
}
