//! Error handling for docsh.
//!
//! One top-level [`DocshError`] covers the whole statement pipeline:
//! lexing, parsing, literal resolution, name lookup, dispatch shape checks
//! and backend failures. Statement-level errors are recoverable; the console
//! renders them and keeps reading statements.
//!
//! # Example
//!
//! ```rust,no_run
//! use docsh::error::{DocshError, Result};
//!
//! fn lookup() -> Result<()> {
//!     Err(DocshError::UnknownCommand("db.foo.explode()".to_string()))
//! }
//! ```

pub mod backend;
pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    ArgumentShapeError, BackendError, BackendTimeoutError, ConfigError, DocshError,
    InvalidNameError, LexError, NameError, NameKind, ParseError, Result, ValueError,
};
