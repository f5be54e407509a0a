//! Reading and writing tables as CSV and JSON.
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde::ser::SerializeMap;
use tlang_error::{Result, ResultExt, TlangError};
use tracing::debug;

use super::Table;
use super::datatype::DataType;
use super::field::Field;
use super::scalar::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Format implied by a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TlangError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(TlangError::syntax(format!("Invalid output format: {other}"))),
        }
    }
}

pub fn read_csv(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|e| {
        TlangError::with_source(format!("Failed to open '{}'", path.display()), Box::new(e))
    })?;
    let table = read_csv_from(file)?;
    debug!(path = %path.display(), rows = table.num_rows(), cols = table.num_columns(), "read table");
    Ok(table)
}

/// Read a CSV with a header row, inferring column types.
pub fn read_csv_from<R: io::Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read header")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.context("failed to read record")?;
        for (idx, col) in raw.iter_mut().enumerate() {
            col.push(record.get(idx).unwrap_or("").to_string());
        }
    }

    if raw.first().is_none_or(|col| col.is_empty()) {
        return Err(TlangError::new("No rows in table."));
    }

    let mut fields = Vec::with_capacity(headers.len());
    let mut columns = Vec::with_capacity(headers.len());
    for (header, values) in headers.iter().zip(raw) {
        let datatype = infer_type(&values);
        let values = values
            .into_iter()
            .map(|v| parse_value(&v, datatype))
            .collect::<Result<Vec<_>>>()?;
        fields.push(Field::from_header(header, datatype));
        columns.push(values);
    }

    Table::try_new(fields, columns)
}

fn parse_value(s: &str, datatype: DataType) -> Result<ScalarValue> {
    if s.is_empty() {
        return Ok(ScalarValue::Null);
    }
    ScalarValue::Utf8(s.to_string()).try_cast(datatype)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Int,
    Float,
    Bool,
    Str,
}

fn classify(s: &str) -> Inferred {
    if is_int(s) {
        Inferred::Int
    } else if is_float(s) {
        Inferred::Float
    } else if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        Inferred::Bool
    } else {
        Inferred::Str
    }
}

/// A '0' followed by more digits, e.g. a GEOID like "04013".
fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let mut chars = digits.chars();
    chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn is_int(s: &str) -> bool {
    !has_leading_zero(s) && s.parse::<i64>().is_ok()
}

fn is_float(s: &str) -> bool {
    !has_leading_zero(s) && s.chars().any(|c| c.is_ascii_digit()) && s.parse::<f64>().is_ok()
}

/// Infer a column type from its raw text values. Empty values are nulls and
/// don't take part.
pub fn infer_type<S: AsRef<str>>(values: &[S]) -> DataType {
    let mut kinds = Vec::new();
    let mut widths = Vec::new();
    for v in values.iter().map(|v| v.as_ref()).filter(|v| !v.is_empty()) {
        let kind = classify(v);
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
        if !widths.contains(&v.len()) {
            widths.push(v.len());
        }
    }

    match kinds.as_slice() {
        // All integers of one multi-digit width are identifier codes.
        [Inferred::Int] if widths.len() == 1 && widths[0] > 1 => DataType::Utf8,
        [Inferred::Int] => DataType::Int64,
        [Inferred::Float] => DataType::Float64,
        [Inferred::Bool] => DataType::Boolean,
        [Inferred::Int, Inferred::Float] | [Inferred::Float, Inferred::Int] => DataType::Float64,
        _ => DataType::Utf8,
    }
}

pub fn write_csv<W: io::Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().from_writer(writer);

    writer
        .write_record(table.fields().iter().map(|f| f.output_name()))
        .context("failed to write header")?;

    for idx in 0..table.num_rows() {
        writer
            .write_record(table.columns().iter().map(|col| col[idx].to_string()))
            .context("failed to write record")?;
    }

    writer.flush()?;
    Ok(())
}

struct JsonRow<'a> {
    table: &'a Table,
    row: usize,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.num_columns()))?;
        for (field, col) in self.table.fields().iter().zip(self.table.columns()) {
            map.serialize_entry(field.output_name(), &col[self.row])?;
        }
        map.end()
    }
}

/// Write the table as a JSON array of objects keyed by output name.
pub fn write_json<W: io::Write>(table: &Table, mut writer: W) -> Result<()> {
    let rows: Vec<JsonRow> = (0..table.num_rows())
        .map(|row| JsonRow { table, row })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &rows).context("failed to write json")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn write_table<W: io::Write>(table: &Table, format: OutputFormat, writer: W) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(table, writer),
        OutputFormat::Json => write_json(table, writer),
    }
}

pub fn write_file(table: &Table, path: &Path, format: OutputFormat) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        TlangError::with_source(format!("Failed to create '{}'", path.display()), Box::new(e))
    })?;
    write_table(table, format, io::BufWriter::new(file))?;
    debug!(path = %path.display(), rows = table.num_rows(), "wrote table");
    Ok(())
}
