//! JSON formatting for values
//!
//! Values are simplified to plain JSON first (`ObjectId` to its hex string,
//! dates to ISO-8601 text, `Long` to a number). Key order is kept. Pretty
//! output can be colored; compact output never is, so it stays safe to pipe.

use colored_json::prelude::*;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::value::{Value, value_to_json};

/// JSON formatter with pretty printing support
pub struct JsonFormatter {
    /// Enable pretty printing
    pretty: bool,

    /// Indentation width for pretty output
    indent: usize,

    /// Enable colored output
    use_colors: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    ///
    /// # Arguments
    /// * `pretty` - Enable pretty printing
    /// * `use_colors` - Enable colored output
    /// * `indent` - Spaces per nesting level when pretty printing
    ///
    /// # Returns
    /// * `Self` - New formatter
    pub fn new(pretty: bool, use_colors: bool, indent: usize) -> Self {
        Self {
            pretty,
            indent,
            use_colors,
        }
    }

    /// Format a value as JSON text
    pub fn format(&self, value: &Value) -> String {
        let json = value_to_json(value);
        if !self.pretty {
            return json.to_string();
        }

        let text = self.to_pretty_string(&json);
        if self.use_colors {
            text.to_colored_json_auto().unwrap_or(text)
        } else {
            text
        }
    }

    fn to_pretty_string(&self, json: &serde_json::Value) -> String {
        let indent = " ".repeat(self.indent);
        let mut buffer = Vec::new();
        let pretty = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut buffer, pretty);
        match json.serialize(&mut serializer) {
            Ok(()) => String::from_utf8(buffer).unwrap_or_else(|_| json.to_string()),
            Err(_) => json.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Document;

    fn sample() -> Value {
        Value::Document(
            Document::new()
                .with("item", "journal")
                .with("qty", Value::Long(25))
                .with("tags", vec![Value::from("blank")]),
        )
    }

    #[test]
    fn test_compact_json() {
        let formatter = JsonFormatter::new(false, true, 2);
        assert_eq!(
            formatter.format(&sample()),
            r#"{"item":"journal","qty":25,"tags":["blank"]}"#
        );
    }

    #[test]
    fn test_pretty_json_indent() {
        let formatter = JsonFormatter::new(true, false, 4);
        let text = formatter.format(&sample());
        assert!(text.starts_with("{\n    \"item\": \"journal\","));
        assert!(text.contains("\n        \"blank\"\n"));
    }

    #[test]
    fn test_scalar_json() {
        let formatter = JsonFormatter::new(true, false, 2);
        assert_eq!(formatter.format(&Value::from("test")), "\"test\"");
        assert_eq!(formatter.format(&Value::Bool(true)), "true");
    }
}
