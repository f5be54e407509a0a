//! Pretty printing for tables.
use comfy_table::{Cell, CellAlignment, ContentArrangement};

use super::Table;
use super::field::Field;

const DEFAULT_PRESET: &str = "││──╞═╪╡│    ┬┴┌┐└┘";
const STR_TRUNCATE: usize = 32;

fn default_table() -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table.load_preset(DEFAULT_PRESET);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn truncate_str(v: &str, truncate: usize) -> String {
    match v.char_indices().nth(truncate) {
        Some((idx, _)) => format!("{}…", &v[..idx]),
        None => v.to_string(),
    }
}

fn header_cell(field: &Field) -> Cell {
    Cell::new(format!(
        "{}\n──\n{}",
        truncate_str(field.output_name(), STR_TRUNCATE),
        field.datatype
    ))
}

/// Format the first `max_rows` rows of a table (all rows if None).
///
/// A footer with the total row count is added when rows are left out.
pub fn pretty_format(table: &Table, max_rows: Option<usize>, width: Option<u16>) -> comfy_table::Table {
    let mut out = default_table();
    if let Some(width) = width {
        out.set_width(width);
    }

    out.set_header(table.fields().iter().map(header_cell));

    let total = table.num_rows();
    let shown = max_rows.unwrap_or(total).min(total);
    for row in 0..shown {
        out.add_row(table.columns().iter().map(|col| {
            let cell = Cell::new(truncate_str(&col[row].to_string(), STR_TRUNCATE));
            if col[row].as_f64().is_some() {
                cell.set_alignment(CellAlignment::Right)
            } else {
                cell
            }
        }));
    }

    if shown < total && table.num_columns() > 0 {
        let mut footer = vec![Cell::new(format!("{total} rows ({shown} shown)"))];
        footer.extend((1..table.num_columns()).map(|_| Cell::new("")));
        out.add_row(footer);
    }

    out
}

/// Column listing for `inspect`, optionally filtered to names containing
/// `pattern`, sorted by name.
pub fn inspect_format(table: &Table, pattern: Option<&str>, width: Option<u16>) -> String {
    let stats = table.stats();
    let fmt_stat = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_default();

    let mut fields: Vec<&Field> = table
        .fields()
        .iter()
        .filter(|f| pattern.is_none_or(|p| f.name.contains(p) || f.output_name().contains(p)))
        .collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = default_table();
    if let Some(width) = width {
        out.set_width(width);
    }
    out.set_header(["name", "alias", "type", "count", "mean", "std", "min", "max"]);

    for field in fields {
        let mut row = vec![
            Cell::new(&field.name),
            Cell::new(field.alias.as_deref().unwrap_or("")),
            Cell::new(field.datatype),
        ];
        match stats.iter().find(|s| s.name == field.name) {
            Some(s) => {
                row.push(Cell::new(s.count).set_alignment(CellAlignment::Right));
                for v in [s.mean, s.std, s.min, s.max] {
                    row.push(Cell::new(fmt_stat(v)).set_alignment(CellAlignment::Right));
                }
            }
            None => row.extend((0..5).map(|_| Cell::new(""))),
        }
        out.add_row(row);
    }

    format!(
        "{out}\n# rows: {}\n# cols: {}\n",
        table.num_rows(),
        table.num_columns()
    )
}
