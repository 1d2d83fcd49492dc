//! docsh library
//!
//! Core of the docsh document database console. It can be embedded to drive
//! statements programmatically, for instance against the in-memory backend.
//!
//! # Modules
//!
//! - `backend`: Backend traits, the in-memory store and the server driver
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `console`: Statement console tying parser, dispatcher and renderer together
//! - `error`: Error types and handling
//! - `executor`: Command dispatcher and execution results
//! - `formatter`: Output rendering (shell and JSON notation)
//! - `parser`: Lexer, parser and statement buffering
//! - `repl`: Interactive line editor
//! - `script`: Script loading and execution
//! - `session`: Current database and variable bindings
//! - `value`: Document value model
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use docsh::{Console, Dispatcher, Formatter, MemoryBackend, SessionContext};
//! use docsh::config::OutputFormat;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(Arc::new(MemoryBackend::new()), Duration::from_secs(5));
//!     let mut console = Console::new(
//!         dispatcher,
//!         SessionContext::new(),
//!         Formatter::new(OutputFormat::Shell, false),
//!     );
//!
//!     let mut out = Vec::new();
//!     let mut err = Vec::new();
//!     console
//!         .run_source("use myNewDB\ndb.foo.insert({ x: 1 })\n", &mut out, &mut err)
//!         .await?;
//!     println!("{}", String::from_utf8(out)?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod parser;
pub mod repl;
pub mod script;
pub mod session;
pub mod value;

// Re-export commonly used types
pub use backend::{Backend, MemoryBackend, MongoBackend};
pub use config::Config;
pub use console::{Console, Outcome};
pub use error::{DocshError, Result};
pub use executor::{Dispatcher, ExecutionResult};
pub use formatter::Formatter;
pub use parser::{Statement, parse_statement};
pub use repl::ReplEngine;
pub use session::SessionContext;
pub use value::{Document, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
