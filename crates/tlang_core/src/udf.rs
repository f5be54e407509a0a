//! Functions callable from expressions.
//!
//! Functions are either native (the built-in math and string helpers) or
//! defined by a single expression over named parameters, typically loaded
//! from a file of `def NAME(p1, p2): EXPR` lines.
use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use hashbrown::HashMap;
use indexmap::IndexMap;
use regex::Regex;
use tlang_error::{Result, TlangError};
use tracing::debug;

use crate::command::{split_args_string, validate_identifier};
use crate::expr::compile;
use crate::expr::eval::{BinaryOperator, eval_binary};
use crate::table::datatype::DataType;
use crate::table::scalar::{ScalarValue, f64_to_i64};

pub type FunctionImpl = dyn Fn(&[ScalarValue]) -> Result<ScalarValue> + Send + Sync;

static DEF_LINE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^def\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?:->\s*\w+\s*)?:\s*(.+)$")
});

pub struct ScalarFunction {
    name: String,
    params: Vec<String>,
    /// Trailing parameters past this count are optional.
    min_args: usize,
    /// Source expression for defined functions.
    body: Option<String>,
    func: Box<FunctionImpl>,
}

impl ScalarFunction {
    pub fn new<F>(name: impl Into<String>, params: &[&str], min_args: usize, func: F) -> Self
    where
        F: Fn(&[ScalarValue]) -> Result<ScalarValue> + Send + Sync + 'static,
    {
        ScalarFunction {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            min_args: min_args.min(params.len()),
            body: None,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn call(&self, args: &[ScalarValue]) -> Result<ScalarValue> {
        (self.func)(args)
    }
}

impl fmt::Debug for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))?;
        if let Some(body) = &self.body {
            write!(f, ": {body}")?;
        }
        Ok(())
    }
}

/// Registered functions plus per-expression reference counts.
#[derive(Debug, Default)]
pub struct UdfRegistry {
    functions: IndexMap<String, Arc<ScalarFunction>>,
    counts: HashMap<String, usize>,
}

impl UdfRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for function in builtins() {
            registry.register(function);
        }
        registry
    }

    /// Register a function, replacing any existing one with the same name.
    pub fn register(&mut self, function: ScalarFunction) {
        self.functions
            .insert(function.name.clone(), Arc::new(function));
    }

    /// Define a function from an expression over its parameters.
    ///
    /// The body may call any function registered before this one.
    pub fn define(&mut self, name: &str, params: &[&str], body: &str) -> Result<()> {
        validate_identifier(name)?;
        for param in params {
            validate_identifier(param)?;
        }

        let compiled = compile(body, params, self)
            .map_err(|e| e.with_field("function", name))?;

        let mut function = ScalarFunction::new(name, params, params.len(), move |args| {
            compiled.eval(args)
        });
        function.body = Some(body.to_string());
        self.register(function);

        debug!(%name, ?params, "defined function");
        Ok(())
    }

    /// Load every `def` line from a source string. Returns the names defined.
    pub fn load_str(&mut self, source: &str) -> Result<Vec<String>> {
        let def_line = DEF_LINE
            .as_ref()
            .map_err(|e| TlangError::with_source("Invalid definition pattern", Box::new(e.clone())))?;

        let mut names = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let caps = def_line.captures(line).ok_or_else(|| {
                TlangError::syntax(format!("Invalid function definition: {line}"))
                    .with_field("line", idx + 1)
            })?;
            let name = &caps[1];
            let params = split_args_string(&caps[2])?;
            let params: Vec<&str> = params.iter().map(|p| p.as_str()).collect();

            self.define(name, &params, caps[3].trim())
                .map_err(|e| e.with_field("line", idx + 1))?;
            names.push(name.to_string());
        }
        Ok(names)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<Vec<String>> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            TlangError::with_source(format!("Failed to read '{}'", path.display()), Box::new(e))
        })?;
        let names = self.load_str(&source)?;
        debug!(path = %path.display(), count = names.len(), "loaded functions");
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ScalarFunction>> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|k| k.as_str())
    }

    /// Functions that were defined from expressions, in definition order.
    pub fn defined(&self) -> impl Iterator<Item = &ScalarFunction> {
        self.functions
            .values()
            .filter(|f| f.body.is_some())
            .map(|f| f.as_ref())
    }

    /// Note one more reference to a function, returning the reference number.
    pub fn count(&mut self, name: &str) -> usize {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn reset_counts(&mut self) {
        self.counts.clear();
    }

    pub fn alias(name: &str, reference: usize) -> String {
        format!("_re_{name}_{reference}")
    }
}

fn expect_f64(name: &str, v: &ScalarValue) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| TlangError::new(format!("'{name}' expects a number, got '{v}'")))
}

fn expect_str<'a>(name: &str, v: &'a ScalarValue) -> Result<&'a str> {
    v.as_str()
        .ok_or_else(|| TlangError::new(format!("'{name}' expects a string, got '{v}'")))
}

fn float_fn(name: &'static str, f: fn(f64) -> f64) -> ScalarFunction {
    ScalarFunction::new(name, &["x"], 1, move |args| match &args[0] {
        ScalarValue::Null => Ok(ScalarValue::Null),
        v => Ok(ScalarValue::Float64(f(expect_f64(name, v)?))),
    })
}

fn round_to_int(name: &'static str, f: fn(f64) -> f64) -> ScalarFunction {
    ScalarFunction::new(name, &["x"], 1, move |args| match &args[0] {
        ScalarValue::Null => Ok(ScalarValue::Null),
        ScalarValue::Int64(v) => Ok(ScalarValue::Int64(*v)),
        v => {
            let out = f(expect_f64(name, v)?);
            let out = f64_to_i64(out)
                .ok_or_else(|| TlangError::new(format!("Cannot convert {out} to an integer")))?;
            Ok(ScalarValue::Int64(out))
        }
    })
}

fn string_fn(name: &'static str, f: fn(&str) -> ScalarValue) -> ScalarFunction {
    ScalarFunction::new(name, &["s"], 1, move |args| match &args[0] {
        ScalarValue::Null => Ok(ScalarValue::Null),
        v => Ok(f(expect_str(name, v)?)),
    })
}

fn pick(name: &'static str, want: std::cmp::Ordering) -> ScalarFunction {
    ScalarFunction::new(name, &["a", "b"], 2, move |args| {
        let (a, b) = (&args[0], &args[1]);
        if a.is_null() || b.is_null() {
            return Ok(ScalarValue::Null);
        }
        expect_f64(name, a)?;
        expect_f64(name, b)?;
        Ok(if b.total_cmp(a) == want { b.clone() } else { a.clone() })
    })
}

/// Error function, Abramowitz and Stegun 7.1.26.
fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = A.iter().rev().fold(0.0, |acc, a| acc * t + a) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

fn builtins() -> Vec<ScalarFunction> {
    vec![
        ScalarFunction::new("abs", &["x"], 1, |args| match &args[0] {
            ScalarValue::Null => Ok(ScalarValue::Null),
            ScalarValue::Int64(v) => v
                .checked_abs()
                .map(ScalarValue::Int64)
                .ok_or_else(|| TlangError::new("Integer overflow")),
            v => Ok(ScalarValue::Float64(expect_f64("abs", v)?.abs())),
        }),
        float_fn("sqrt", f64::sqrt),
        float_fn("exp", f64::exp),
        float_fn("ln", f64::ln),
        float_fn("log10", f64::log10),
        float_fn("erf", erf),
        ScalarFunction::new("round", &["x", "digits"], 1, |args| {
            let digits = match args.get(1) {
                None | Some(ScalarValue::Null) => 0,
                Some(ScalarValue::Int64(d)) => *d,
                Some(other) => {
                    return Err(TlangError::new(format!(
                        "'round' expects an integer number of digits, got '{other}'"
                    )));
                }
            };
            match &args[0] {
                ScalarValue::Null => Ok(ScalarValue::Null),
                ScalarValue::Int64(v) if digits >= 0 => Ok(ScalarValue::Int64(*v)),
                v => {
                    let scale = 10f64.powi(digits.clamp(-308, 308) as i32);
                    let x = expect_f64("round", v)?;
                    Ok(ScalarValue::Float64((x * scale).round_ties_even() / scale))
                }
            }
        }),
        round_to_int("floor", f64::floor),
        round_to_int("ceil", f64::ceil),
        pick("min", std::cmp::Ordering::Less),
        pick("max", std::cmp::Ordering::Greater),
        ScalarFunction::new("pow", &["x", "y"], 2, |args| {
            eval_binary(BinaryOperator::Power, args[0].clone(), args[1].clone())
        }),
        string_fn("len", |s| ScalarValue::Int64(s.chars().count() as i64)),
        string_fn("upper", |s| ScalarValue::Utf8(s.to_uppercase())),
        string_fn("lower", |s| ScalarValue::Utf8(s.to_lowercase())),
        ScalarFunction::new("str", &["x"], 1, |args| args[0].try_cast(DataType::Utf8)),
        ScalarFunction::new("int", &["x"], 1, |args| args[0].try_cast(DataType::Int64)),
        ScalarFunction::new("float", &["x"], 1, |args| args[0].try_cast(DataType::Float64)),
    ]
}
