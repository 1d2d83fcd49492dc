//! REPL (Read-Eval-Print Loop) engine for docsh
//!
//! This module provides the interactive line editor:
//! - Line editing and persistent history with reedline
//! - Multi-line input until brackets balance
//! - History-based inline hints
//! - A prompt showing the current database

pub mod prompt;
pub mod validator;

pub use prompt::ShellPrompt;
pub use validator::StatementValidator;

use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use tracing::warn;

use crate::config::HistoryConfig;
use crate::error::Result;

/// What the editor produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Complete input, possibly spanning several lines
    Input(String),
    /// Ctrl+C at the prompt; the current input is discarded
    Interrupted,
    /// Ctrl+D or end of input
    Eof,
}

/// REPL engine wrapping the line editor
pub struct ReplEngine {
    /// Line editor
    editor: Reedline,
}

impl ReplEngine {
    /// Create a new REPL engine
    ///
    /// # Arguments
    /// * `history` - History configuration
    /// * `use_colors` - Enable ANSI colors in hints
    ///
    /// # Returns
    /// * `Self` - New engine; history problems only disable persistence
    pub fn new(history: &HistoryConfig, use_colors: bool) -> Self {
        let mut editor = Reedline::create()
            .with_validator(Box::new(StatementValidator::new()))
            .with_hinter(Box::new(
                DefaultHinter::default().with_style(Style::new().italic().fg(Color::DarkGray)),
            ))
            .with_ansi_colors(use_colors);

        if history.persist {
            match FileBackedHistory::with_file(history.max_size, history.file_path.clone()) {
                Ok(file_history) => editor = editor.with_history(Box::new(file_history)),
                Err(e) => warn!(
                    "History file {} unavailable: {}",
                    history.file_path.display(),
                    e
                ),
            }
        }

        Self { editor }
    }

    /// Read one complete input from the terminal
    ///
    /// # Arguments
    /// * `prompt` - Prompt to render
    ///
    /// # Returns
    /// * `Result<ReadOutcome>` - Input, interrupt or end of input
    pub fn read_line(&mut self, prompt: &ShellPrompt) -> Result<ReadOutcome> {
        let outcome = match self.editor.read_line(prompt)? {
            Signal::Success(input) => ReadOutcome::Input(input),
            Signal::CtrlC => ReadOutcome::Interrupted,
            Signal::CtrlD => ReadOutcome::Eof,
            #[allow(unreachable_patterns)]
            _ => ReadOutcome::Interrupted,
        };
        Ok(outcome)
    }
}
