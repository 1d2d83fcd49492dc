//! Output formatting and colorization for docsh
//!
//! This module turns execution results and errors into terminal text:
//! - Shell format with type wrappers (default)
//! - JSON formatting (compact and pretty-printed)
//! - Color highlighting for improved readability

pub mod colorizer;
pub mod json;
pub mod shell;

pub use colorizer::Colorizer;
pub use json::JsonFormatter;
pub use shell::ShellFormatter;

use crate::config::{DisplayConfig, OutputFormat};
use crate::error::DocshError;
use crate::executor::{ExecutionResult, ResultData};
use crate::value::Value;

/// Main formatter for execution results
pub struct Formatter {
    /// Output format type
    format_type: OutputFormat,

    /// Enable colored output
    use_colors: bool,

    /// Indentation width
    indent: usize,
}

impl Formatter {
    /// Create a new formatter
    ///
    /// # Arguments
    /// * `format_type` - Output format type
    /// * `use_colors` - Enable colored output
    ///
    /// # Returns
    /// * `Self` - New formatter instance
    pub fn new(format_type: OutputFormat, use_colors: bool) -> Self {
        Self {
            format_type,
            use_colors,
            indent: 2,
        }
    }

    /// Create a formatter from display configuration
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            format_type: config.format,
            use_colors: config.color_output,
            indent: config.indent,
        }
    }

    pub fn format_type(&self) -> OutputFormat {
        self.format_type
    }

    /// Format execution result according to configured format
    ///
    /// # Arguments
    /// * `result` - Execution result to format
    ///
    /// # Returns
    /// * `Option<String>` - Text to print, None when the statement has no output
    pub fn format(&self, result: &ExecutionResult) -> Option<String> {
        match &result.data {
            ResultData::Value(value) => Some(self.format_value(value)),
            ResultData::Message(text) => Some(text.clone()),
            ResultData::None => None,
        }
    }

    /// Format a single value
    pub fn format_value(&self, value: &Value) -> String {
        match self.format_type {
            OutputFormat::Shell => ShellFormatter::new(self.use_colors, self.indent).format(value),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                JsonFormatter::new(self.format_type.is_pretty(), self.use_colors, self.indent)
                    .format(value)
            }
        }
    }

    /// Format a statement-level error
    pub fn format_error(&self, error: &DocshError) -> String {
        Colorizer::new(self.use_colors).error(&error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Document;

    #[test]
    fn test_format_result_kinds() {
        let formatter = Formatter::new(OutputFormat::Shell, false);
        assert_eq!(formatter.format(&ExecutionResult::none()), None);
        assert_eq!(
            formatter.format(&ExecutionResult::message("switched to db test")),
            Some("switched to db test".to_string())
        );
        assert_eq!(
            formatter.format(&ExecutionResult::value(Document::new().with("a", 1))),
            Some("{ a: 1 }".to_string())
        );
    }

    #[test]
    fn test_json_format_from_config() {
        let config = DisplayConfig {
            format: OutputFormat::Json,
            color_output: false,
            indent: 2,
        };
        let formatter = Formatter::from_config(&config);
        assert_eq!(
            formatter.format(&ExecutionResult::value(Value::Bool(true))),
            Some("true".to_string())
        );
    }

    #[test]
    fn test_format_error() {
        let formatter = Formatter::new(OutputFormat::Shell, false);
        let error = DocshError::UnknownCommand("db.x.explode()".into());
        assert_eq!(formatter.format_error(&error), "UnknownCommandError: db.x.explode()");
    }
}
