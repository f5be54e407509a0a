use std::borrow::Cow;
use std::error::Error;
use std::fmt;

pub type Result<T, E = TlangError> = std::result::Result<T, E>;

/// Broad category of an error.
///
/// Every error surfaced to a user carries one of these so the interpreter
/// can report it consistently regardless of where it was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed statement, verb call, argument list, or identifier.
    Syntax,
    /// A script parameter could not be resolved.
    Binding,
    /// Unknown column, function, or otherwise invalid reference.
    Reference,
    /// Wrong number of arguments.
    Arity,
    /// Not enough tables on the stack for an operation.
    Stack,
    /// Failure inside a table operation.
    Engine,
    /// Failure reading or writing a file.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "SyntaxError"),
            Self::Binding => write!(f, "BindingError"),
            Self::Reference => write!(f, "ReferenceError"),
            Self::Arity => write!(f, "ArityError"),
            Self::Stack => write!(f, "StackError"),
            Self::Engine => write!(f, "EngineError"),
            Self::Io => write!(f, "IoError"),
        }
    }
}

#[derive(Debug)]
pub struct TlangError {
    inner: Box<TlangErrorInner>,
}

#[derive(Debug)]
struct TlangErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    fields: Vec<(Cow<'static, str>, String)>,
}

impl TlangError {
    /// Create a new engine error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Engine, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        TlangError {
            inner: Box::new(TlangErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
            }),
        }
    }

    /// Wrap an underlying error.
    ///
    /// IO errors keep the `Io` kind, everything else is considered an engine
    /// error unless the source is itself a `TlangError`, in which case its
    /// kind carries over.
    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let kind = if source.is::<std::io::Error>() {
            ErrorKind::Io
        } else if let Some(err) = source.downcast_ref::<TlangError>() {
            err.kind()
        } else {
            ErrorKind::Engine
        };

        TlangError {
            inner: Box::new(TlangErrorInner {
                kind,
                msg: msg.into(),
                source: Some(source),
                fields: Vec::new(),
            }),
        }
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Syntax, msg)
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Binding, msg)
    }

    pub fn reference(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Reference, msg)
    }

    pub fn arity(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Arity, msg)
    }

    pub fn stack(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Stack, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Io, msg)
    }

    /// Attach an additional piece of context to the error.
    pub fn with_field(mut self, key: impl Into<Cow<'static, str>>, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn message(&self) -> &str {
        &self.inner.msg
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .fields
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.fields().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for TlangError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;
        for (key, value) in &self.inner.fields {
            write!(f, "\n  {key}: {value}")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }
        Ok(())
    }
}

impl Error for TlangError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for TlangError {
    fn from(value: std::io::Error) -> Self {
        TlangError::with_source("IO error", Box::new(value))
    }
}

impl From<fmt::Error> for TlangError {
    fn from(value: fmt::Error) -> Self {
        TlangError::with_source("Format error", Box::new(value))
    }
}

pub trait ResultExt<T, E> {
    /// Wrap the error with a message.
    fn context(self, msg: &str) -> Result<T, TlangError>;

    /// Wrap the error with a lazily built message.
    fn context_fn<F, S>(self, f: F) -> Result<T, TlangError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T, TlangError> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(TlangError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F, S>(self, f: F) -> Result<T, TlangError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(TlangError::with_source(f(), Box::new(e))),
        }
    }
}
