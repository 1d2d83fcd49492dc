use std::time::Duration;
use std::{fmt, io};

use crate::error::backend::format_backend_error;

/// Crate-wide `Result` type using [`DocshError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DocshError>;

/// Top-level error type for docsh.
///
/// Statement-level variants (everything except `Io` and `Config`) are
/// reported to the renderer and the session keeps accepting statements.
#[derive(Debug)]
pub enum DocshError {
    /// Tokenization failed.
    Lex(LexError),

    /// Token stream does not form a statement.
    Parse(ParseError),

    /// A literal or constructor argument is malformed or out of range.
    Value(ValueError),

    /// Reference to an unbound variable or path.
    Name(NameError),

    /// Database or collection name is not acceptable.
    InvalidName(InvalidNameError),

    /// Verb/path combination the dispatcher does not know.
    UnknownCommand(String),

    /// Argument count or types do not match the verb.
    ArgumentShape(ArgumentShapeError),

    /// Backend call exceeded the operation timeout.
    BackendTimeout(BackendTimeoutError),

    /// Failure reported by the backend.
    Backend(BackendError),

    /// The user interrupted a running backend call.
    Interrupted,

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),
}

/// Tokenizer errors. Offsets are char indices into the statement text.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// String literal reached end of input.
    UnterminatedString { offset: usize },

    /// Regex literal reached end of input.
    UnterminatedRegex { offset: usize },

    /// Unknown escape inside a string literal.
    InvalidEscape { sequence: String, offset: usize },

    /// Character that starts no token.
    UnexpectedChar { ch: char, offset: usize },
}

/// Parse error with the offset of the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

/// Literal value errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Number does not fit the target type.
    OutOfRange { constructor: String, literal: String },

    /// Argument cannot be interpreted by the constructor.
    Malformed { constructor: String, reason: String },
}

/// Unbound name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameError {
    pub name: String,
}

/// Rejected database or collection name.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidNameError {
    pub kind: NameKind,
    pub name: String,
    pub reason: String,
}

/// What an [`InvalidNameError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Database,
    Collection,
}

/// Argument shape mismatch for a verb.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentShapeError {
    pub verb: String,
    pub expected: String,
}

/// Backend call that did not finish in time.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendTimeoutError {
    pub operation: String,
    pub timeout: Duration,
}

/// Failure reported by a backend.
///
/// `message` is kept exactly as the backend reported it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendError {
    pub message: String,
    pub code: Option<i32>,
    pub code_name: Option<String>,
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Generic configuration failure.
    Generic(String),
}

impl DocshError {
    /// Whether the error should end the process rather than the statement.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DocshError::Io(_) | DocshError::Config(_))
    }

    pub(crate) fn parse(message: impl Into<String>, offset: usize) -> Self {
        DocshError::Parse(ParseError {
            message: message.into(),
            offset,
        })
    }

    pub(crate) fn shape(verb: &str, expected: impl Into<String>) -> Self {
        DocshError::ArgumentShape(ArgumentShapeError {
            verb: verb.to_string(),
            expected: expected.into(),
        })
    }

    pub(crate) fn unknown(command: impl Into<String>) -> Self {
        DocshError::UnknownCommand(command.into())
    }

    pub(crate) fn name(name: impl Into<String>) -> Self {
        DocshError::Name(NameError { name: name.into() })
    }
}

impl ValueError {
    pub(crate) fn malformed(constructor: &str, reason: impl Into<String>) -> Self {
        ValueError::Malformed {
            constructor: constructor.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(constructor: &str, literal: impl Into<String>) -> Self {
        ValueError::OutOfRange {
            constructor: constructor.to_string(),
            literal: literal.into(),
        }
    }
}

impl BackendError {
    /// Backend error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            code_name: None,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DocshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocshError::Lex(e) => write!(f, "LexError: {e}"),
            DocshError::Parse(e) => write!(f, "ParseError: {e}"),
            DocshError::Value(e) => write!(f, "ValueError: {e}"),
            DocshError::Name(e) => write!(f, "NameError: {e}"),
            DocshError::InvalidName(e) => write!(f, "InvalidNameError: {e}"),
            DocshError::UnknownCommand(cmd) => write!(f, "UnknownCommandError: {cmd}"),
            DocshError::ArgumentShape(e) => write!(f, "ArgumentShapeError: {e}"),
            DocshError::BackendTimeout(e) => write!(f, "BackendTimeoutError: {e}"),
            DocshError::Backend(e) => format_backend_error(f, e),
            DocshError::Interrupted => write!(f, "Operation interrupted"),
            DocshError::Config(e) => write!(f, "Configuration error: {e}"),
            DocshError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnterminatedString { offset } => {
                write!(f, "unterminated string literal starting at {offset}")
            }
            LexError::UnterminatedRegex { offset } => {
                write!(f, "unterminated regex literal starting at {offset}")
            }
            LexError::InvalidEscape { sequence, offset } => {
                write!(f, "invalid escape sequence '{sequence}' at {offset}")
            }
            LexError::UnexpectedChar { ch, offset } => {
                write!(f, "unexpected character '{ch}' at {offset}")
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::OutOfRange {
                constructor,
                literal,
            } => write!(f, "{constructor}: value {literal} is out of range"),
            ValueError::Malformed {
                constructor,
                reason,
            } => write!(f, "{constructor}: {reason}"),
        }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not defined", self.name)
    }
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NameKind::Database => "database",
            NameKind::Collection => "collection",
        };
        write!(f, "invalid {kind} name '{}': {}", self.name, self.reason)
    }
}

impl fmt::Display for ArgumentShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} expects {}", self.verb, self.expected)
    }
}

impl fmt::Display for BackendTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} did not complete within {}ms",
            self.operation,
            self.timeout.as_millis()
        )
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DocshError {}
impl std::error::Error for LexError {}
impl std::error::Error for ParseError {}
impl std::error::Error for ValueError {}
impl std::error::Error for NameError {}
impl std::error::Error for InvalidNameError {}
impl std::error::Error for ArgumentShapeError {}
impl std::error::Error for BackendTimeoutError {}
impl std::error::Error for BackendError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to DocshError ========================= */

impl From<io::Error> for DocshError {
    fn from(err: io::Error) -> Self {
        DocshError::Io(err)
    }
}

impl From<LexError> for DocshError {
    fn from(err: LexError) -> Self {
        DocshError::Lex(err)
    }
}

impl From<ParseError> for DocshError {
    fn from(err: ParseError) -> Self {
        DocshError::Parse(err)
    }
}

impl From<ValueError> for DocshError {
    fn from(err: ValueError) -> Self {
        DocshError::Value(err)
    }
}

impl From<NameError> for DocshError {
    fn from(err: NameError) -> Self {
        DocshError::Name(err)
    }
}

impl From<InvalidNameError> for DocshError {
    fn from(err: InvalidNameError) -> Self {
        DocshError::InvalidName(err)
    }
}

impl From<ArgumentShapeError> for DocshError {
    fn from(err: ArgumentShapeError) -> Self {
        DocshError::ArgumentShape(err)
    }
}

impl From<BackendTimeoutError> for DocshError {
    fn from(err: BackendTimeoutError) -> Self {
        DocshError::BackendTimeout(err)
    }
}

impl From<BackendError> for DocshError {
    fn from(err: BackendError) -> Self {
        DocshError::Backend(err)
    }
}

impl From<ConfigError> for DocshError {
    fn from(err: ConfigError) -> Self {
        DocshError::Config(err)
    }
}

impl From<mongodb::error::Error> for DocshError {
    fn from(err: mongodb::error::Error) -> Self {
        DocshError::Backend(crate::error::backend::from_driver_error(&err))
    }
}
