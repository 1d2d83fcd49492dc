//! Prompt showing the current database

use std::borrow::Cow;

use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

/// Prompt for the docsh REPL
pub struct ShellPrompt {
    /// Current database name
    database: String,
    /// Whether the session runs against the in-memory backend
    offline: bool,
}

impl ShellPrompt {
    /// Create a new prompt
    ///
    /// # Arguments
    /// * `database` - Current database name
    /// * `offline` - Whether the in-memory backend is in use
    pub fn new(database: impl Into<String>, offline: bool) -> Self {
        Self {
            database: database.into(),
            offline,
        }
    }
}

impl Prompt for ShellPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        if self.offline {
            format!("{} (offline)> ", self.database).into()
        } else {
            format!("{}> ", self.database).into()
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        "... ".into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}
