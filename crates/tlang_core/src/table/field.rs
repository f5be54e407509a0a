use super::datatype::DataType;

/// Column metadata.
///
/// `name` is the identifier used to refer to the column in statements.
/// `alias` is an optional display name used when showing or writing the
/// table, typically the original header from a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    pub datatype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Field {
            name: name.into(),
            alias: None,
            datatype,
        }
    }

    /// Create a field from an arbitrary header, canonicalizing the name and
    /// keeping the original as the alias if it changed.
    pub fn from_header(header: &str, datatype: DataType) -> Self {
        let name = canonicalize_name(header);
        let alias = (name != header).then(|| header.to_string());
        Field {
            name,
            alias,
            datatype,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Turn an arbitrary header into an identifier.
///
/// Spaces, dashes, and dots become underscores, and a name that doesn't
/// start with a letter or underscore gets an underscore prefix. Any other
/// character that isn't valid in an identifier is also replaced.
pub fn canonicalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut out: String = trimmed
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match out.chars().next() {
        Some(c) if c.is_alphabetic() || c == '_' => (),
        _ => out.insert(0, '_'),
    }

    out
}
