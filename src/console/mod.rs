//! Console driver
//!
//! Ties the statement pipeline together: buffered input is split into
//! statements, each statement is parsed against the session, dispatched, and
//! its result or error is rendered. Interactive, `--eval`, script and stdin
//! modes all run through [`Console`].

use std::io::{self, Write};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DocshError;
use crate::executor::Dispatcher;
use crate::formatter::Formatter;
use crate::parser::{ControlStatement, Statement, StatementBuffer, parse_statement, strip_comments};
use crate::session::SessionContext;

/// Outcome of one statement
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Statement succeeded; text to print, if any
    Printed(Option<String>),
    /// Statement failed; rendered error text
    Failed(String),
    /// `exit` was entered
    Exit,
}

/// Totals for a non-interactive run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    /// Statements executed, including failed ones
    pub statements: usize,
    /// Statements that reported an error
    pub errors: usize,
    /// Whether the run stopped at `exit`
    pub exited: bool,
}

/// Statement console owning the session
pub struct Console {
    dispatcher: Dispatcher,
    session: SessionContext,
    formatter: Formatter,
}

impl Console {
    /// Create a new console
    ///
    /// # Arguments
    /// * `dispatcher` - Dispatcher bound to a backend
    /// * `session` - Initial session context
    /// * `formatter` - Result renderer
    pub fn new(dispatcher: Dispatcher, session: SessionContext, formatter: Formatter) -> Self {
        Self {
            dispatcher,
            session,
            formatter,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Run one complete statement
    ///
    /// # Arguments
    /// * `text` - Statement text, comments allowed
    /// * `cancel` - Token that interrupts a running backend call
    ///
    /// # Returns
    /// * `Outcome` - Rendered result, rendered error, or exit
    pub async fn run_statement(&mut self, text: &str, cancel: &CancellationToken) -> Outcome {
        if strip_comments(text).trim().is_empty() {
            return Outcome::Printed(None);
        }

        let statement = match parse_statement(text, &self.session) {
            Ok(statement) => statement,
            Err(e) => return self.failed(text, e),
        };

        if matches!(statement, Statement::Control(ControlStatement::Exit)) {
            debug!("Exit requested");
            return Outcome::Exit;
        }

        match self
            .dispatcher
            .dispatch(statement, &mut self.session, cancel)
            .await
        {
            Ok(result) => Outcome::Printed(self.formatter.format(&result)),
            Err(e) => self.failed(text, e),
        }
    }

    /// Run one statement, cancelling it when the user presses Ctrl+C
    pub async fn run_interruptible(&mut self, text: &str) -> Outcome {
        let cancel_token = CancellationToken::new();
        let cancel_token_clone = cancel_token.clone();

        let ctrl_c_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => cancel_token_clone.cancel(),
                Err(err) => warn!("Failed to listen for Ctrl+C: {}", err),
            }
        });

        let outcome = self.run_statement(text, &cancel_token).await;
        ctrl_c_handle.abort();
        outcome
    }

    /// Run a whole source text line by line
    ///
    /// Results go to `out`, errors to `err`. Processing stops at `exit`;
    /// a statement left open at end of input is reported as a parse error.
    ///
    /// # Arguments
    /// * `source` - Script text
    /// * `out` - Sink for results
    /// * `err` - Sink for errors
    ///
    /// # Returns
    /// * `io::Result<ScriptSummary>` - Totals, or a write failure
    pub async fn run_source(
        &mut self,
        source: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<ScriptSummary> {
        let mut summary = ScriptSummary::default();
        let mut buffer = StatementBuffer::new();

        for line in source.lines() {
            for statement in buffer.push_line(line) {
                if self.emit(&statement, &mut summary, out, err).await? {
                    summary.exited = true;
                    return Ok(summary);
                }
            }
        }

        if let Some(rest) = buffer.finish() {
            summary.statements += 1;
            summary.errors += 1;
            let error = DocshError::parse("unexpected end of input", rest.chars().count());
            writeln!(err, "{}", self.formatter.format_error(&error))?;
        }

        Ok(summary)
    }

    /// Run and print one statement; true when the run should stop.
    async fn emit(
        &mut self,
        statement: &str,
        summary: &mut ScriptSummary,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<bool> {
        let outcome = self.run_interruptible(statement).await;
        summary.statements += 1;
        match outcome {
            Outcome::Printed(Some(text)) => writeln!(out, "{}", text)?,
            Outcome::Printed(None) => {}
            Outcome::Failed(text) => {
                summary.errors += 1;
                writeln!(err, "{}", text)?;
            }
            Outcome::Exit => return Ok(true),
        }
        Ok(false)
    }

    fn failed(&self, text: &str, error: DocshError) -> Outcome {
        debug!("Statement failed: {} ({})", text.trim(), error);
        Outcome::Failed(self.formatter.format_error(&error))
    }
}
