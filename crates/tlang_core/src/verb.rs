//! Typed verbs built from parsed commands.
//!
//! All argument validation happens here so that executing a verb only has to
//! deal with table level failures.
use std::path::PathBuf;
use std::str::FromStr;

use tlang_error::{Result, TlangError};

use crate::binding::Namespace;
use crate::command::{Command, is_identifier, split_args_string, validate_identifier};
use crate::table::SortKey;
use crate::table::datatype::DataType;
use crate::table::groupby::AggregateFunction;
use crate::table::io::OutputFormat;
use crate::table::join::{JoinOptions, JoinType, JoinValidate};
use crate::tokens::{is_quoted, unquote};

/// Every verb name accepted by the interpreter.
pub const VERB_NAMES: &[&str] = &[
    "read",
    "from",
    "write",
    "show",
    "inspect",
    "history",
    "use",
    "duplicate",
    "keep",
    "drop",
    "rename",
    "alias",
    "select",
    "derive",
    "sort",
    "first",
    "last",
    "sample",
    "cast",
    "groupby",
    "join",
    "union",
    "clear",
    "pop",
    "swap",
    "reverse",
    "rotate",
];

/// Extension of script files run by `from`.
pub const SCRIPT_EXTENSION: &str = "t";

/// Number of rows to take, either absolute or a percentage of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Rows(usize),
    Percent(usize),
}

impl RowCount {
    /// Resolve to an absolute row count for a table with `num_rows` rows.
    ///
    /// A percentage always selects at least one row.
    pub fn resolve(&self, num_rows: usize) -> usize {
        match self {
            Self::Rows(n) => *n,
            Self::Percent(pct) => {
                let n = (*pct as f64 * num_rows as f64 / 100.0).round_ties_even();
                (n as usize).max(1)
            }
        }
    }
}

/// How a verb interacts with the table stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    /// Tables that must be on the stack before the verb runs.
    pub required: usize,
    /// Tables removed after the verb succeeds.
    pub pops: usize,
    /// Tables pushed after the verb succeeds.
    pub pushes: usize,
}

impl StackEffect {
    const fn new(required: usize, pops: usize, pushes: usize) -> Self {
        StackEffect {
            required,
            pops,
            pushes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    Read {
        path: PathBuf,
    },
    RunScript {
        path: PathBuf,
        bindings: Namespace,
    },
    Write {
        path: Option<PathBuf>,
        format: Option<OutputFormat>,
    },
    Show {
        rows: Option<usize>,
    },
    Inspect {
        pattern: Option<String>,
    },
    History {
        count: Option<usize>,
    },
    Use {
        path: PathBuf,
    },
    Duplicate,
    Keep {
        columns: Vec<String>,
    },
    Drop {
        columns: Vec<String>,
    },
    Rename {
        pairs: Vec<(String, String)>,
    },
    Alias {
        pairs: Vec<(String, String)>,
    },
    Select {
        expr: String,
    },
    Derive {
        name: String,
        expr: String,
    },
    Sort {
        keys: Vec<SortKey>,
    },
    First {
        count: RowCount,
    },
    Last {
        count: RowCount,
    },
    Sample {
        count: RowCount,
    },
    Cast {
        columns: Vec<String>,
        datatype: DataType,
    },
    GroupBy {
        by: Vec<String>,
        only: Option<Vec<String>>,
        aggs: Vec<AggregateFunction>,
    },
    Join(JoinOptions),
    Union,
    Clear,
    Pop,
    Swap,
    Reverse,
    Rotate,
}

impl Verb {
    /// Build a verb from a parsed command.
    pub fn from_command(cmd: &Command) -> Result<Verb> {
        let verb = cmd.verb.as_str();
        let args = Args { cmd };

        Ok(match verb {
            "read" => {
                args.check(&[], 1, Some(1))?;
                Verb::Read {
                    path: args.path(0)?,
                }
            }
            "from" => {
                args.check_positional(1, Some(1))?;
                let path = args.path(0)?;
                let is_script = path
                    .extension()
                    .is_some_and(|ext| ext == SCRIPT_EXTENSION);
                if is_script {
                    Verb::RunScript {
                        path,
                        bindings: Namespace::new(cmd.keyword.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
                    }
                } else {
                    args.check(&[], 1, Some(1))?;
                    Verb::Read { path }
                }
            }
            "write" => {
                args.check(&["format"], 0, Some(2))?;
                args.check_positional(0, Some(1))?;
                let path = if cmd.positional.is_empty() {
                    None
                } else {
                    Some(args.path(0)?)
                };
                let format = cmd
                    .keyword
                    .get("format")
                    .map(|f| OutputFormat::from_str(unquote(f)))
                    .transpose()?;
                Verb::Write { path, format }
            }
            "show" => {
                args.check(&[], 0, Some(1))?;
                Verb::Show {
                    rows: args.optional_count(0)?,
                }
            }
            "history" => {
                args.check(&[], 0, Some(1))?;
                Verb::History {
                    count: args.optional_count(0)?,
                }
            }
            "inspect" => {
                args.check(&[], 0, Some(1))?;
                let pattern = match cmd.positional.first() {
                    Some(arg) if is_quoted(arg) => Some(unquote(arg).to_string()),
                    Some(_) => {
                        return Err(TlangError::syntax(
                            "Column name filters must be simple strings.",
                        ));
                    }
                    None => None,
                };
                Verb::Inspect { pattern }
            }
            "use" => {
                args.check(&[], 1, Some(1))?;
                Verb::Use {
                    path: args.path(0)?,
                }
            }
            "keep" | "drop" => {
                args.check(&[], 1, None)?;
                let columns = cmd
                    .positional
                    .iter()
                    .map(|arg| column_name(arg))
                    .collect::<Result<Vec<_>>>()?;
                if verb == "keep" {
                    Verb::Keep { columns }
                } else {
                    Verb::Drop { columns }
                }
            }
            "rename" | "alias" => {
                args.check(&[], 1, None)?;
                let pairs = cmd
                    .positional
                    .iter()
                    .map(|arg| name_pair(verb, arg))
                    .collect::<Result<Vec<_>>>()?;
                if verb == "rename" {
                    Verb::Rename { pairs }
                } else {
                    Verb::Alias { pairs }
                }
            }
            "select" => {
                // The expression may itself contain '=' so it is taken raw.
                let expr = cmd.args_raw.trim();
                if expr.is_empty() {
                    return Err(TlangError::arity(format!(
                        "Too few arguments for '{verb}' command."
                    )));
                }
                Verb::Select {
                    expr: expr.to_string(),
                }
            }
            "derive" => {
                let parts = split_args_string(&cmd.args_raw)?;
                if parts.len() < 2 {
                    return Err(TlangError::arity(format!(
                        "Too few arguments for '{verb}' command."
                    )));
                }
                if parts.len() > 2 {
                    return Err(TlangError::arity(format!(
                        "Too many arguments for '{verb}' command."
                    )));
                }
                validate_identifier(&parts[0])?;
                Verb::Derive {
                    name: parts[0].clone(),
                    expr: parts[1].clone(),
                }
            }
            "sort" => {
                args.check(&[], 1, None)?;
                let keys = cmd
                    .positional
                    .iter()
                    .map(|arg| sort_key(arg))
                    .collect::<Result<Vec<_>>>()?;
                Verb::Sort { keys }
            }
            "first" | "last" | "sample" => {
                args.check(&[], 1, Some(2))?;
                let count = args.row_count()?;
                match verb {
                    "first" => Verb::First { count },
                    "last" => Verb::Last { count },
                    _ => Verb::Sample { count },
                }
            }
            "cast" => {
                args.check(&[], 2, None)?;
                let (datatype, columns) = cmd
                    .positional
                    .split_last()
                    .ok_or_else(|| TlangError::arity(format!("Too few arguments for '{verb}' command.")))?;
                let datatype = DataType::from_name(unquote(datatype))?;
                let columns = columns
                    .iter()
                    .map(|arg| column_name(arg))
                    .collect::<Result<Vec<_>>>()?;
                Verb::Cast { columns, datatype }
            }
            "groupby" => {
                args.check(&["by", "only", "agg"], 0, None)?;
                let mut by = cmd
                    .positional
                    .iter()
                    .map(|arg| column_name(arg))
                    .collect::<Result<Vec<_>>>()?;
                if let Some(keyword) = cmd.keyword.get("by") {
                    if !by.is_empty() {
                        return Err(TlangError::syntax(
                            "Group columns given both by position and with 'by='.",
                        ));
                    }
                    by = name_list(keyword)?;
                }
                let only = cmd.keyword.get("only").map(|v| name_list(v)).transpose()?;
                let aggs = match cmd.keyword.get("agg") {
                    Some(v) => list_items(v)?
                        .iter()
                        .map(|a| AggregateFunction::from_str(unquote(a)))
                        .collect::<Result<Vec<_>>>()?,
                    None => AggregateFunction::DEFAULTS.to_vec(),
                };
                Verb::GroupBy { by, only, aggs }
            }
            "join" => {
                args.check(&["how", "on", "suffixes", "validate"], 0, None)?;
                args.check_positional(0, Some(0))?;
                Verb::Join(join_options(cmd)?)
            }
            "union" | "duplicate" | "clear" | "pop" | "swap" | "reverse" | "rotate" => {
                args.check(&[], 0, Some(0))?;
                match verb {
                    "union" => Verb::Union,
                    "duplicate" => Verb::Duplicate,
                    "clear" => Verb::Clear,
                    "pop" => Verb::Pop,
                    "swap" => Verb::Swap,
                    "reverse" => Verb::Reverse,
                    _ => Verb::Rotate,
                }
            }
            other => return Err(unknown_verb(other)),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::RunScript { .. } => "from",
            Self::Write { .. } => "write",
            Self::Show { .. } => "show",
            Self::Inspect { .. } => "inspect",
            Self::History { .. } => "history",
            Self::Use { .. } => "use",
            Self::Duplicate => "duplicate",
            Self::Keep { .. } => "keep",
            Self::Drop { .. } => "drop",
            Self::Rename { .. } => "rename",
            Self::Alias { .. } => "alias",
            Self::Select { .. } => "select",
            Self::Derive { .. } => "derive",
            Self::Sort { .. } => "sort",
            Self::First { .. } => "first",
            Self::Last { .. } => "last",
            Self::Sample { .. } => "sample",
            Self::Cast { .. } => "cast",
            Self::GroupBy { .. } => "groupby",
            Self::Join(_) => "join",
            Self::Union => "union",
            Self::Clear => "clear",
            Self::Pop => "pop",
            Self::Swap => "swap",
            Self::Reverse => "reverse",
            Self::Rotate => "rotate",
        }
    }

    pub fn stack_effect(&self) -> StackEffect {
        match self {
            Self::Read { .. } => StackEffect::new(0, 0, 1),
            Self::Write { .. } | Self::Show { .. } | Self::Inspect { .. } => {
                StackEffect::new(1, 0, 0)
            }
            Self::Duplicate => StackEffect::new(1, 0, 1),
            Self::Keep { .. }
            | Self::Drop { .. }
            | Self::Rename { .. }
            | Self::Alias { .. }
            | Self::Select { .. }
            | Self::Derive { .. }
            | Self::Sort { .. }
            | Self::First { .. }
            | Self::Last { .. }
            | Self::Sample { .. }
            | Self::Cast { .. }
            | Self::GroupBy { .. } => StackEffect::new(1, 1, 1),
            Self::Join(_) | Self::Union => StackEffect::new(2, 2, 1),
            Self::Swap => StackEffect::new(2, 0, 0),
            Self::RunScript { .. }
            | Self::History { .. }
            | Self::Use { .. }
            | Self::Clear
            | Self::Pop
            | Self::Reverse
            | Self::Rotate => StackEffect::new(0, 0, 0),
        }
    }

    /// Verbs that print something. A script ending in one of these doesn't
    /// write its result table.
    pub fn is_display(&self) -> bool {
        matches!(
            self,
            Self::Write { .. } | Self::Show { .. } | Self::Inspect { .. } | Self::History { .. }
        )
    }
}

/// Argument checks shared by most verbs.
struct Args<'a> {
    cmd: &'a Command,
}

impl Args<'_> {
    fn verb(&self) -> &str {
        &self.cmd.verb
    }

    /// Check allowed keywords and the total argument count.
    fn check(&self, keywords: &[&str], least: usize, most: Option<usize>) -> Result<()> {
        if let Some(key) = self
            .cmd
            .keyword
            .keys()
            .find(|k| !keywords.contains(&k.as_str()))
        {
            return Err(TlangError::syntax(format!(
                "Invalid keyword argument for '{}' command: {key}",
                self.verb()
            )));
        }
        check_count(self.verb(), self.cmd.num_args(), least, most)
    }

    fn check_positional(&self, least: usize, most: Option<usize>) -> Result<()> {
        check_count(self.verb(), self.cmd.positional.len(), least, most)
    }

    fn path(&self, idx: usize) -> Result<PathBuf> {
        let arg = self.cmd.positional.get(idx).ok_or_else(|| {
            TlangError::arity(format!("Too few arguments for '{}' command.", self.verb()))
        })?;
        file_path(arg)
    }

    fn optional_count(&self, idx: usize) -> Result<Option<usize>> {
        self.cmd
            .positional
            .get(idx)
            .map(|arg| {
                arg.parse::<usize>().map_err(|_| {
                    let units = if self.verb() == "history" { "commands" } else { "rows" };
                    TlangError::syntax(format!(
                        "'{}' command takes an optional number of {units}.",
                        self.verb()
                    ))
                })
            })
            .transpose()
    }

    /// `n`, `n%`, or `n, <anything>` for a percentage.
    fn row_count(&self) -> Result<RowCount> {
        let invalid = || {
            TlangError::syntax(format!(
                "'{}' command requires a number of rows.",
                self.verb()
            ))
        };

        let first = self.cmd.positional.first().ok_or_else(invalid)?;
        let (digits, percent) = match first.strip_suffix('%') {
            Some(digits) => (digits.trim(), true),
            None => (first.as_str(), self.cmd.positional.len() > 1),
        };
        let n = digits.parse::<usize>().map_err(|_| invalid())?;

        Ok(if percent {
            RowCount::Percent(n)
        } else {
            RowCount::Rows(n)
        })
    }
}

fn check_count(verb: &str, n: usize, least: usize, most: Option<usize>) -> Result<()> {
    if most == Some(0) && n > 0 {
        return Err(TlangError::arity(format!(
            "'{verb}' command doesn't take any arguments."
        )));
    }
    if n < least {
        return Err(TlangError::arity(format!(
            "Too few arguments for '{verb}' command."
        )));
    }
    if most.is_some_and(|most| n > most) {
        return Err(TlangError::arity(format!(
            "Too many arguments for '{verb}' command."
        )));
    }
    Ok(())
}

fn unknown_verb(verb: &str) -> TlangError {
    const SIMILARITY_THRESHOLD: f64 = 0.7;

    let suggestion = VERB_NAMES
        .iter()
        .map(|name| (strsim::jaro(name, verb), *name))
        .filter(|(score, _)| *score > SIMILARITY_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0));

    let err = TlangError::syntax(format!("Unknown verb: {verb}"));
    match suggestion {
        Some((_, name)) => err.with_field("did you mean", name),
        None => err,
    }
}

/// A file path, quoted or bare.
fn file_path(arg: &str) -> Result<PathBuf> {
    if is_quoted(arg) {
        return Ok(PathBuf::from(unquote(arg)));
    }
    let simple = !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || "()[]{},=\"'".contains(c));
    if !simple {
        return Err(TlangError::syntax("Filenames must be simple strings."));
    }
    Ok(PathBuf::from(arg))
}

fn column_name(arg: &str) -> Result<String> {
    if !is_identifier(arg) {
        return Err(TlangError::syntax("Columns must be names."));
    }
    validate_identifier(arg)?;
    Ok(arg.to_string())
}

/// Contents of `(a, b)` or `[a, b]`, or `None` if not bracketed.
fn bracketed<'a>(arg: &'a str, open: char, close: char) -> Option<&'a str> {
    arg.strip_prefix(open)?.strip_suffix(close).map(str::trim)
}

/// Items of a `[a, b]` list, or the argument itself as a single item.
fn list_items(arg: &str) -> Result<Vec<String>> {
    match bracketed(arg, '[', ']') {
        Some(inner) => split_args_string(inner),
        None => Ok(vec![arg.to_string()]),
    }
}

fn name_list(arg: &str) -> Result<Vec<String>> {
    list_items(arg)?.iter().map(|s| column_name(s)).collect()
}

fn name_pair(verb: &str, arg: &str) -> Result<(String, String)> {
    let invalid = || TlangError::syntax(format!("The '{verb}' command requires tuples of names."));

    let inner = bracketed(arg, '(', ')').ok_or_else(invalid)?;
    match split_args_string(inner)?.as_slice() {
        [a, b] if is_identifier(a) && is_identifier(b) => {
            validate_identifier(b)?;
            Ok((a.clone(), b.clone()))
        }
        _ => Err(invalid()),
    }
}

fn sort_key(arg: &str) -> Result<SortKey> {
    let Some(inner) = bracketed(arg, '(', ')') else {
        return Ok(SortKey {
            column: column_name(arg)?,
            ascending: true,
        });
    };

    match split_args_string(inner)?.as_slice() {
        [column, order] => {
            let ascending = match unquote(order).to_ascii_uppercase().as_str() {
                "ASC" => true,
                "DESC" => false,
                _ => {
                    return Err(TlangError::syntax(format!("Invalid sort order: {order}")));
                }
            };
            Ok(SortKey {
                column: column_name(column)?,
                ascending,
            })
        }
        _ => Err(TlangError::syntax(
            "The 'sort' command takes column names or tuples of a column name and sort order (ASC, DESC).",
        )),
    }
}

fn join_options(cmd: &Command) -> Result<JoinOptions> {
    let mut opts = JoinOptions::default();

    if let Some(how) = cmd.keyword.get("how") {
        opts.how = JoinType::from_str(unquote(how))?;
    }

    if let Some(on) = cmd.keyword.get("on") {
        let items = list_items(on)?;
        let nested: Vec<Option<&str>> = items.iter().map(|i| bracketed(i, '[', ']')).collect();
        match nested.as_slice() {
            [Some(_), Some(_)] => {
                opts.left_on = name_list(&items[0])?;
                opts.right_on = name_list(&items[1])?;
            }
            n if n.iter().all(|i| i.is_none()) => {
                opts.left_on = items
                    .iter()
                    .map(|i| column_name(i))
                    .collect::<Result<Vec<_>>>()?;
                opts.right_on = opts.left_on.clone();
            }
            _ => {
                return Err(TlangError::syntax(format!(
                    "Invalid JOIN columns: {on}"
                )));
            }
        }
    }

    if let Some(suffixes) = cmd.keyword.get("suffixes") {
        let inner = bracketed(suffixes, '(', ')')
            .or_else(|| bracketed(suffixes, '[', ']'))
            .ok_or_else(|| TlangError::syntax("JOIN suffixes must be a pair."))?;
        let suffix = |s: &str| match s {
            "None" => None,
            s => Some(unquote(s).to_string()),
        };
        match split_args_string(inner)?.as_slice() {
            [left, right] => opts.suffixes = (suffix(left), suffix(right)),
            _ => return Err(TlangError::syntax("JOIN suffixes must be a pair.")),
        }
        if opts.suffixes == (None, None) {
            return Err(TlangError::syntax("At least one JOIN suffix must be given."));
        }
    }

    if let Some(validate) = cmd.keyword.get("validate") {
        opts.validate = Some(JoinValidate::from_str(unquote(validate))?);
    }

    Ok(opts)
}
