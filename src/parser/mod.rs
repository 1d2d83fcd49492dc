//! Statement parser for the console
//!
//! Parsing runs in three steps:
//! - `lexer`: statement text to tokens (comments are stripped first)
//! - `grammar`: tokens to the syntax tree in `ast`
//! - `resolve`: syntax tree to a [`Statement`], binding names against the
//!   [`SessionContext`] and evaluating constructor literals
//!
//! `buffer` decides where statements end when input arrives line by line.
//!
//! # Examples
//!
//! ```no_run
//! use docsh::parser::{Statement, parse_statement};
//! use docsh::session::SessionContext;
//!
//! let session = SessionContext::new();
//! let stmt = parse_statement("db.inventory.find({ status: 'D' })", &session).unwrap();
//! if let Statement::Call(call) = stmt {
//!     assert_eq!(call.method(), "find");
//! }
//! ```

pub mod ast;
pub mod buffer;
mod grammar;
pub mod lexer;
mod literals;
mod resolve;

pub use buffer::StatementBuffer;
pub use lexer::{Keyword, Token, TokenKind, strip_comments, tokenize};
pub use literals::{CONSTRUCTORS, is_constructor, parse_date};

use crate::error::Result;
use crate::session::SessionContext;
use crate::value::Value;

/// Fully resolved statement, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `use`, `show`, `exit`, `var`
    Control(ControlStatement),
    /// Path followed by one or more method calls
    Call(CallExpression),
    /// Bare literal or variable; echoed back
    Value(Value),
    /// Bare `db`
    CurrentDatabase,
}

/// Shell control statements
#[derive(Debug, Clone, PartialEq)]
pub enum ControlStatement {
    Use(String),
    Show(String),
    Exit,
    Var { name: String, value: Value },
}

/// `db.inventory.find({}).limit(5)`: target path plus method calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// Path segments before the first call, e.g. `["db", "inventory"]`
    pub target: Vec<String>,
    /// Non-empty list of calls in source order
    pub calls: Vec<MethodCall>,
}

/// One `.name(args)` step of a call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub args: Vec<Value>,
}

impl CallExpression {
    pub fn path(&self) -> &[String] {
        &self.target
    }

    /// Name of the first call.
    pub fn method(&self) -> &str {
        self.calls.first().map(|c| c.name.as_str()).unwrap_or_default()
    }

    /// Arguments of the first call.
    pub fn args(&self) -> &[Value] {
        self.calls.first().map(|c| c.args.as_slice()).unwrap_or_default()
    }

    /// Calls after the first one (`.sort(...)`, `.limit(...)`).
    pub fn chain(&self) -> &[MethodCall] {
        self.calls.get(1..).unwrap_or_default()
    }

    /// Dotted source form of the path and method names, for messages.
    pub fn describe(&self) -> String {
        let mut text = self.target.join(".");
        for call in &self.calls {
            text.push('.');
            text.push_str(&call.name);
            text.push_str("()");
        }
        text
    }
}

/// Parse a token stream into a resolved statement.
///
/// # Arguments
/// * `tokens` - Output of [`tokenize`]
/// * `session` - Session used to resolve variable names
///
/// # Returns
/// * `Result<Statement>` - Statement, or a parse, value or name error
pub fn parse(tokens: Vec<Token>, session: &SessionContext) -> Result<Statement> {
    let stmt = grammar::parse_stmt(tokens)?;
    resolve::resolve_statement(stmt, session)
}

/// Strip comments, tokenize and parse one statement.
pub fn parse_statement(input: &str, session: &SessionContext) -> Result<Statement> {
    let source = strip_comments(input);
    let tokens = tokenize(&source)?;
    parse(tokens, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocshError;

    #[test]
    fn test_control_statements() {
        let session = SessionContext::new();
        assert_eq!(
            parse_statement("use myNewDatabase", &session).unwrap(),
            Statement::Control(ControlStatement::Use("myNewDatabase".into()))
        );
        assert_eq!(
            parse_statement("show collections", &session).unwrap(),
            Statement::Control(ControlStatement::Show("collections".into()))
        );
        assert_eq!(
            parse_statement("exit", &session).unwrap(),
            Statement::Control(ControlStatement::Exit)
        );
    }

    #[test]
    fn test_call_accessors() {
        let session = SessionContext::new();
        let Statement::Call(call) =
            parse_statement("db.inventory.find({ status: 'D' }).limit(2);", &session).unwrap()
        else {
            panic!("expected call");
        };
        assert_eq!(call.path(), &["db".to_string(), "inventory".to_string()]);
        assert_eq!(call.method(), "find");
        assert_eq!(call.args().len(), 1);
        assert_eq!(call.chain().len(), 1);
        assert_eq!(call.describe(), "db.inventory.find().limit()");
    }

    #[test]
    fn test_hostile_literals_are_statement_errors() {
        let session = SessionContext::new();
        for input in [
            "new Date(9223372036854775807, 0)",
            "new Date(2020, 9223372036854775807)",
            "new Date(2020, 0, -9223372036854775807, -9223372036854775807)",
        ] {
            let err = parse_statement(input, &session).unwrap_err();
            assert!(matches!(err, DocshError::Value(_)), "{input}: {err}");
        }

        let deep = format!("var x = {}{}", "[".repeat(5000), "]".repeat(5000));
        assert!(matches!(parse_statement(&deep, &session), Err(DocshError::Parse(_))));
    }

    #[test]
    fn test_comment_inside_statement() {
        let session = SessionContext::new();
        let stmt = parse_statement(
            "db.inventory.insertMany([\n // adds _id\n { item: 'journal' }\n])",
            &session,
        )
        .unwrap();
        assert!(matches!(stmt, Statement::Call(_)));
    }

    #[test]
    fn test_lex_errors_surface() {
        let session = SessionContext::new();
        let err = parse_statement("db.runCommand({ create: <view> })", &session).unwrap_err();
        assert!(matches!(err, DocshError::Lex(_)));
    }
}
