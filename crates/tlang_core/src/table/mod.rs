//! In-memory tables and the operations verbs are built on.
//!
//! Tables are immutable from the point of view of the program: every
//! operation returns a new table. Column metadata (name, alias, type) is
//! carried through every operation.
pub mod datatype;
pub mod field;
pub mod format;
pub mod groupby;
pub mod io;
pub mod join;
pub mod scalar;

use std::cmp::Ordering;

use hashbrown::HashSet;
use rand::Rng;
use tlang_error::{Result, TlangError};

use crate::command::validate_identifier;
use datatype::DataType;
use field::Field;
use scalar::ScalarValue;

/// Function evaluated once per row, receiving the row's values in column
/// order.
pub type RowFn<'a> = dyn Fn(&[ScalarValue]) -> Result<ScalarValue> + 'a;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub ascending: bool,
}

/// Summary statistics for a numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    fields: Vec<Field>,
    columns: Vec<Vec<ScalarValue>>,
    num_rows: usize,
}

impl Table {
    /// Create a new table, checking that the columns line up with the fields.
    pub fn try_new(fields: Vec<Field>, columns: Vec<Vec<ScalarValue>>) -> Result<Self> {
        if fields.len() != columns.len() {
            return Err(TlangError::new(format!(
                "Expected {} columns, got {}",
                fields.len(),
                columns.len()
            )));
        }

        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        Self::validate_columns(&fields, &columns, num_rows)?;

        Ok(Table {
            fields,
            columns,
            num_rows,
        })
    }

    fn validate_columns(fields: &[Field], columns: &[Vec<ScalarValue>], num_rows: usize) -> Result<()> {
        let mut seen = HashSet::new();
        for (field, col) in fields.iter().zip(columns) {
            if col.len() != num_rows {
                return Err(TlangError::new(format!(
                    "Expected column length to be {num_rows}, got {}",
                    col.len()
                ))
                .with_field("column", &field.name));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(TlangError::new(format!(
                    "Duplicate column name: {}",
                    field.name
                )));
            }
            if let Some(bad) = col
                .iter()
                .find(|v| v.datatype().is_some_and(|dt| dt != field.datatype))
            {
                return Err(TlangError::new(format!(
                    "Value '{bad}' doesn't match column type {}",
                    field.datatype
                ))
                .with_field("column", &field.name));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn columns(&self) -> &[Vec<ScalarValue>] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&[ScalarValue]> {
        self.columns.get(idx).map(|c| c.as_slice())
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.fields.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Index of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.field_index(name)
            .ok_or_else(|| TlangError::reference(format!("Invalid column reference: {name}")))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    /// Values of a single row, in column order.
    pub fn row(&self, idx: usize) -> Vec<ScalarValue> {
        self.columns.iter().map(|c| c[idx].clone()).collect()
    }

    /// Build a new table from a subset of rows, in the given order.
    pub fn take(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&idx| col[idx].clone()).collect())
            .collect();

        Table {
            fields: self.fields.clone(),
            columns,
            num_rows: indices.len(),
        }
    }

    /// Keep only the named columns, in the given order.
    pub fn project(&self, names: &[String]) -> Result<Table> {
        if names.is_empty() {
            return Err(TlangError::syntax("No columns named."));
        }

        let indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(TlangError::reference(format!("Column named more than once: {dup}")));
        }

        Ok(Table {
            fields: indices.iter().map(|&idx| self.fields[idx].clone()).collect(),
            columns: indices.iter().map(|&idx| self.columns[idx].clone()).collect(),
            num_rows: self.num_rows,
        })
    }

    /// Drop the named columns.
    pub fn exclude(&self, names: &[String]) -> Result<Table> {
        for name in names {
            self.require_column(name)?;
        }

        let keep: Vec<String> = self
            .fields
            .iter()
            .filter(|f| !names.contains(&f.name))
            .map(|f| f.name.clone())
            .collect();

        if keep.is_empty() {
            return Err(TlangError::new("Cannot drop every column of a table."));
        }

        self.project(&keep)
    }

    /// Rename columns. Aliases are kept.
    pub fn rename(&self, renames: &[(String, String)]) -> Result<Table> {
        let mut fields = self.fields.clone();
        for (from, to) in renames {
            let idx = self.require_column(from)?;
            self.check_new_name(to)?;
            fields[idx].name = to.clone();
        }

        Table::try_new(fields, self.columns.clone())
    }

    /// Give columns a short name to use in statements while keeping the
    /// current output name for display and writing.
    pub fn alias(&self, aliases: &[(String, String)]) -> Result<Table> {
        let mut fields = self.fields.clone();
        for (from, to) in aliases {
            let idx = self.require_column(from)?;
            self.check_new_name(to)?;
            let field = &mut fields[idx];
            field.alias = Some(field.output_name().to_string());
            field.name = to.clone();
        }

        Table::try_new(fields, self.columns.clone())
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        if self.has_column(name) {
            return Err(TlangError::reference(format!("Column already exists: {name}")));
        }
        Ok(())
    }

    /// Keep rows for which the predicate is true.
    pub fn filter(&self, predicate: &RowFn) -> Result<Table> {
        let mut indices = Vec::new();
        for idx in 0..self.num_rows {
            match predicate(&self.row(idx))? {
                ScalarValue::Boolean(true) => indices.push(idx),
                ScalarValue::Boolean(false) | ScalarValue::Null => (),
                other => {
                    return Err(TlangError::new(format!(
                        "Selection expression must produce True or False, got '{other}'"
                    )));
                }
            }
        }
        Ok(self.take(&indices))
    }

    /// Add a computed column, or replace an existing one in place.
    pub fn derive(&self, name: &str, func: &RowFn) -> Result<Table> {
        let mut values = Vec::with_capacity(self.num_rows);
        for idx in 0..self.num_rows {
            values.push(func(&self.row(idx))?);
        }
        let (datatype, values) = unify_values(values)?;

        let mut fields = self.fields.clone();
        let mut columns = self.columns.clone();
        match self.field_index(name) {
            Some(idx) => {
                fields[idx].datatype = datatype;
                columns[idx] = values;
            }
            None => {
                validate_identifier(name)?;
                fields.push(Field::new(name, datatype));
                columns.push(values);
            }
        }

        Table::try_new(fields, columns)
    }

    /// Stable multi-key sort. Nulls sort last regardless of direction.
    pub fn sort(&self, keys: &[SortKey]) -> Result<Table> {
        if keys.is_empty() {
            return Err(TlangError::syntax("No sort columns given."));
        }

        let cols = keys
            .iter()
            .map(|k| Ok((self.require_column(&k.column)?, k.ascending)))
            .collect::<Result<Vec<_>>>()?;

        let mut indices: Vec<usize> = (0..self.num_rows).collect();
        indices.sort_by(|&a, &b| {
            for &(col, ascending) in &cols {
                let (va, vb) = (&self.columns[col][a], &self.columns[col][b]);
                let ord = match (va.is_null(), vb.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) if ascending => va.total_cmp(vb),
                    (false, false) => vb.total_cmp(va),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        Ok(self.take(&indices))
    }

    pub fn head(&self, n: usize) -> Table {
        let n = n.min(self.num_rows);
        self.take(&(0..n).collect::<Vec<_>>())
    }

    pub fn tail(&self, n: usize) -> Table {
        let n = n.min(self.num_rows);
        self.take(&((self.num_rows - n)..self.num_rows).collect::<Vec<_>>())
    }

    /// Random sample of `n` rows without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Table {
        let n = n.min(self.num_rows);
        let indices = rand::seq::index::sample(rng, self.num_rows, n).into_vec();
        self.take(&indices)
    }

    /// Cast columns to a new type.
    pub fn cast(&self, names: &[String], datatype: DataType) -> Result<Table> {
        let mut fields = self.fields.clone();
        let mut columns = self.columns.clone();
        for name in names {
            let idx = self.require_column(name)?;
            columns[idx] = self.columns[idx]
                .iter()
                .map(|v| v.try_cast(datatype))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| e.with_field("column", name))?;
            fields[idx].datatype = datatype;
        }

        Table::try_new(fields, columns)
    }

    /// Stack the rows of `other` on top of this table's rows.
    ///
    /// Both tables must have identical column names and types. The result
    /// keeps this table's column metadata.
    pub fn union(&self, other: &Table) -> Result<Table> {
        let matches = self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.datatype == b.datatype);
        if !matches {
            return Err(TlangError::new("Tables must have identical columns"));
        }

        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(a, b)| b.iter().chain(a).cloned().collect())
            .collect();

        Ok(Table {
            fields: self.fields.clone(),
            columns,
            num_rows: self.num_rows + other.num_rows,
        })
    }

    /// Statistics for every numeric column.
    pub fn stats(&self) -> Vec<ColumnStats> {
        self.fields
            .iter()
            .zip(&self.columns)
            .filter(|(f, _)| f.datatype.is_numeric())
            .map(|(f, col)| {
                let values: Vec<f64> = col.iter().filter_map(|v| v.as_f64()).collect();
                ColumnStats {
                    name: f.name.clone(),
                    count: values.len(),
                    mean: mean(&values),
                    std: sample_std(&values),
                    min: values.iter().copied().reduce(f64::min),
                    max: values.iter().copied().reduce(f64::max),
                }
            })
            .collect()
    }
}

/// Determine the type of a computed column, widening ints to floats when
/// both appear.
pub fn unify_values(values: Vec<ScalarValue>) -> Result<(DataType, Vec<ScalarValue>)> {
    let mut datatype: Option<DataType> = None;
    for dt in values.iter().filter_map(|v| v.datatype()) {
        datatype = match datatype {
            None => Some(dt),
            Some(current) => Some(current.unify(dt).ok_or_else(|| {
                TlangError::new(format!("Expression produced mixed types: {current} and {dt}"))
            })?),
        };
    }

    match datatype {
        Some(DataType::Float64) => {
            let values = values
                .into_iter()
                .map(|v| match v {
                    ScalarValue::Int64(i) => ScalarValue::Float64(i as f64),
                    other => other,
                })
                .collect();
            Ok((DataType::Float64, values))
        }
        Some(dt) => Ok((dt, values)),
        // All nulls.
        None => Ok((DataType::Utf8, values)),
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Build a table from (header, type, values) triples.
    pub fn table(cols: Vec<(&str, DataType, Vec<ScalarValue>)>) -> Table {
        let (fields, columns) = cols
            .into_iter()
            .map(|(name, dt, values)| (Field::new(name, dt), values))
            .unzip();
        Table::try_new(fields, columns).unwrap()
    }

    pub fn ints(values: &[i64]) -> Vec<ScalarValue> {
        values.iter().map(|&v| ScalarValue::Int64(v)).collect()
    }

    pub fn floats(values: &[f64]) -> Vec<ScalarValue> {
        values.iter().map(|&v| ScalarValue::Float64(v)).collect()
    }

    pub fn strs(values: &[&str]) -> Vec<ScalarValue> {
        values.iter().map(|&v| ScalarValue::from(v)).collect()
    }

    /// The census-like table used across tests.
    pub fn census() -> Table {
        table(vec![
            ("GEOID", DataType::Utf8, strs(&["01", "02", "03", "04"])),
            ("Total", DataType::Int64, ints(&[100, 250, 50, 250])),
            ("Pop", DataType::Float64, floats(&[1.5, 2.5, 0.5, 3.0])),
        ])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tlang_error::ErrorKind;

    use super::groupby::AggregateFunction;
    use super::join::JoinOptions;
    use super::testutil::*;
    use super::*;

    fn names(table: &Table) -> Vec<&str> {
        table.column_names()
    }

    #[test]
    fn try_new_checks_lengths() {
        let err = Table::try_new(
            vec![Field::new("a", DataType::Int64), Field::new("b", DataType::Int64)],
            vec![ints(&[1, 2]), ints(&[1])],
        )
        .unwrap_err();
        assert_eq!("Expected column length to be 2, got 1", err.message());
    }

    #[test]
    fn try_new_checks_types() {
        let res = Table::try_new(vec![Field::new("a", DataType::Int64)], vec![strs(&["x"])]);
        assert!(res.is_err());
    }

    #[test]
    fn project_keeps_order_and_rows() {
        let t = census();
        let out = t.project(&["GEOID".to_string(), "Total".to_string()]).unwrap();
        assert_eq!(vec!["GEOID", "Total"], names(&out));
        assert_eq!(4, out.num_rows());

        let out = t.project(&["Pop".to_string(), "GEOID".to_string()]).unwrap();
        assert_eq!(vec!["Pop", "GEOID"], names(&out));

        let err = t.project(&["Nope".to_string()]).unwrap_err();
        assert_eq!(ErrorKind::Reference, err.kind());
    }

    #[test]
    fn exclude_columns() {
        let out = census().exclude(&["Total".to_string()]).unwrap();
        assert_eq!(vec!["GEOID", "Pop"], names(&out));
        assert!(census().exclude(&["GEOID".to_string(), "Total".to_string(), "Pop".to_string()]).is_err());
    }

    #[test]
    fn rename_and_alias() {
        let t = census();
        let out = t.rename(&[("Total".to_string(), "T".to_string())]).unwrap();
        assert_eq!(vec!["GEOID", "T", "Pop"], names(&out));
        assert_eq!(None, out.fields()[1].alias);

        let out = t.alias(&[("Total".to_string(), "t".to_string())]).unwrap();
        assert_eq!("t", out.fields()[1].name);
        assert_eq!("Total", out.fields()[1].output_name());

        // Renaming onto an existing column fails.
        assert!(t.rename(&[("Total".to_string(), "Pop".to_string())]).is_err());
        assert!(t.rename(&[("Total".to_string(), "not".to_string())]).is_err());
    }

    #[test]
    fn alias_keeps_original_output_name() {
        let t = Table::try_new(
            vec![Field::from_header("Total Pop", DataType::Int64)],
            vec![ints(&[1])],
        )
        .unwrap();
        let out = t.alias(&[("Total_Pop".to_string(), "tp".to_string())]).unwrap();
        assert_eq!("tp", out.fields()[0].name);
        assert_eq!("Total Pop", out.fields()[0].output_name());
    }

    /// Table whose headers needed canonicalizing, so every field has an alias.
    fn headed() -> Table {
        Table::try_new(
            vec![
                Field::from_header("GEO ID", DataType::Utf8),
                Field::from_header("Total Pop", DataType::Int64),
            ],
            vec![strs(&["01", "02", "03"]), ints(&[30, 10, 20])],
        )
        .unwrap()
    }

    fn output_names(table: &Table) -> Vec<&str> {
        table.fields().iter().map(|f| f.output_name()).collect()
    }

    #[test]
    fn aliases_survive_transforms() {
        let t = headed();
        assert_eq!(vec!["GEO_ID", "Total_Pop"], names(&t));

        let derived = t
            .derive("Total_Pop", &|row: &[ScalarValue]| match &row[1] {
                ScalarValue::Int64(v) => Ok(ScalarValue::Int64(v * 2)),
                other => Ok(other.clone()),
            })
            .unwrap();
        assert_eq!(vec!["GEO ID", "Total Pop"], output_names(&derived));
        assert_eq!(ints(&[60, 20, 40]), derived.columns()[1]);

        let sorted = t
            .sort(&[SortKey {
                column: "Total_Pop".to_string(),
                ascending: true,
            }])
            .unwrap();
        assert_eq!(vec!["GEO ID", "Total Pop"], output_names(&sorted));

        let unioned = t.union(&t).unwrap();
        assert_eq!(vec!["GEO ID", "Total Pop"], output_names(&unioned));

        let cast = t.cast(&["Total_Pop".to_string()], DataType::Float64).unwrap();
        assert_eq!(vec!["GEO ID", "Total Pop"], output_names(&cast));

        let regions = Table::try_new(
            vec![
                Field::from_header("GEO ID", DataType::Utf8),
                Field::from_header("Region Name", DataType::Utf8),
            ],
            vec![strs(&["01", "03"]), strs(&["North", "South"])],
        )
        .unwrap();
        let joined = t.join(&regions, &JoinOptions::default()).unwrap();
        assert_eq!(vec!["GEO ID", "Total Pop", "Region Name"], output_names(&joined));

        let grouped = joined
            .group_by(
                &["Region_Name".to_string()],
                None,
                &[AggregateFunction::Sum],
            )
            .unwrap();
        assert_eq!(vec!["Region Name", "Total Pop_sum"], output_names(&grouped));
        assert_eq!(vec!["Region_Name", "Total_Pop_sum"], names(&grouped));
    }

    #[test]
    fn filter_rows() {
        let t = census();
        let out = t
            .filter(&|row: &[ScalarValue]| Ok(ScalarValue::Boolean(row[1] == ScalarValue::Int64(250))))
            .unwrap();
        assert_eq!(2, out.num_rows());
        assert_eq!(strs(&["02", "04"]), out.columns()[0]);

        let err = t.filter(&|_: &[ScalarValue]| Ok(ScalarValue::Int64(1))).unwrap_err();
        assert_eq!(ErrorKind::Engine, err.kind());
    }

    #[test]
    fn derive_new_and_replace() {
        let t = census();
        let out = t
            .derive("Double", &|row: &[ScalarValue]| match &row[1] {
                ScalarValue::Int64(v) => Ok(ScalarValue::Int64(v * 2)),
                _ => Ok(ScalarValue::Null),
            })
            .unwrap();
        assert_eq!(vec!["GEOID", "Total", "Pop", "Double"], names(&out));
        assert_eq!(ints(&[200, 500, 100, 500]), out.columns()[3]);

        let out = t.derive("Total", &|_: &[ScalarValue]| Ok(ScalarValue::Float64(1.0))).unwrap();
        assert_eq!(3, out.num_columns());
        assert_eq!(DataType::Float64, out.fields()[1].datatype);
    }

    #[test]
    fn unify_widens_ints() {
        let (dt, values) = unify_values(vec![
            ScalarValue::Int64(1),
            ScalarValue::Null,
            ScalarValue::Float64(0.5),
        ])
        .unwrap();
        assert_eq!(DataType::Float64, dt);
        assert_eq!(
            vec![ScalarValue::Float64(1.0), ScalarValue::Null, ScalarValue::Float64(0.5)],
            values
        );

        assert!(unify_values(vec![ScalarValue::Int64(1), ScalarValue::from("a")]).is_err());
    }

    #[test]
    fn sort_multi_key() {
        let t = census();
        let out = t
            .sort(&[
                SortKey {
                    column: "Total".to_string(),
                    ascending: false,
                },
                SortKey {
                    column: "GEOID".to_string(),
                    ascending: true,
                },
            ])
            .unwrap();
        assert_eq!(strs(&["02", "04", "01", "03"]), out.columns()[0]);
    }

    #[test]
    fn sort_nulls_last() {
        let t = table(vec![(
            "a",
            DataType::Int64,
            vec![ScalarValue::Null, ScalarValue::Int64(2), ScalarValue::Int64(1)],
        )]);
        for ascending in [true, false] {
            let out = t
                .sort(&[SortKey {
                    column: "a".to_string(),
                    ascending,
                }])
                .unwrap();
            assert_eq!(ScalarValue::Null, out.columns()[0][2]);
        }
    }

    #[test]
    fn head_tail_sample() {
        let t = census();
        assert_eq!(strs(&["01", "02"]), t.head(2).columns()[0]);
        assert_eq!(strs(&["03", "04"]), t.tail(2).columns()[0]);
        assert_eq!(4, t.head(10).num_rows());

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let out = t.sample(3, &mut rng);
        assert_eq!(3, out.num_rows());
        assert_eq!(4, t.sample(100, &mut rng).num_rows());
    }

    #[test]
    fn cast_columns() {
        let out = census().cast(&["Total".to_string()], DataType::Float64).unwrap();
        assert_eq!(DataType::Float64, out.fields()[1].datatype);
        assert_eq!(ScalarValue::Float64(100.0), out.columns()[1][0]);

        let out = census().cast(&["GEOID".to_string()], DataType::Int64).unwrap();
        assert_eq!(ints(&[1, 2, 3, 4]), out.columns()[0]);
    }

    #[test]
    fn union_tables() {
        let a = census();
        let b = census().head(1);
        let out = a.union(&b).unwrap();
        assert_eq!(5, out.num_rows());
        assert_eq!(&ScalarValue::from("01"), &out.column(0).unwrap()[0]);
        assert_eq!(&ScalarValue::from("01"), &out.column(0).unwrap()[1]);
        assert_eq!(&ScalarValue::from("04"), &out.column(0).unwrap()[4]);

        let c = census().project(&["GEOID".to_string()]).unwrap();
        let err = a.union(&c).unwrap_err();
        assert_eq!("Tables must have identical columns", err.message());
    }

    #[test]
    fn numeric_stats() {
        let stats = census().stats();
        assert_eq!(2, stats.len());
        assert_eq!("Total", stats[0].name);
        assert_eq!(4, stats[0].count);
        assert_eq!(Some(162.5), stats[0].mean);
        assert_eq!(Some(50.0), stats[0].min);
        assert_eq!(Some(250.0), stats[0].max);
    }

    #[test]
    fn median_values() {
        assert_eq!(Some(2.0), median(&[3.0, 1.0, 2.0]));
        assert_eq!(Some(2.5), median(&[4.0, 1.0, 2.0, 3.0]));
        assert_eq!(None, median(&[]));
    }
}
