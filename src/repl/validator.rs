//! Validator for reedline - keeps Enter inserting a newline until the
//! statement is balanced

use reedline::{ValidationResult, Validator};

use crate::parser::buffer::is_complete;

/// Statement completeness validator
#[derive(Debug, Default)]
pub struct StatementValidator;

impl StatementValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for StatementValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.trim().is_empty() || is_complete(line) {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let validator = StatementValidator::new();
        assert!(matches!(validator.validate("   "), ValidationResult::Complete));
    }

    #[test]
    fn test_multi_line_insert() {
        let validator = StatementValidator::new();
        assert!(matches!(
            validator.validate("db.inventory.insertMany([\n { item: 'journal' },"),
            ValidationResult::Incomplete
        ));
        assert!(matches!(
            validator.validate("db.inventory.insertMany([\n { item: 'journal' }\n])"),
            ValidationResult::Complete
        ));
    }

    #[test]
    fn test_brackets_in_strings_and_comments() {
        let validator = StatementValidator::new();
        assert!(matches!(
            validator.validate("db.x.find({ name: '{[(' })"),
            ValidationResult::Complete
        ));
        assert!(matches!(
            validator.validate("db.x.find({ // open (\n})"),
            ValidationResult::Complete
        ));
        assert!(matches!(
            validator.validate("db.x.find({ name: \"open"),
            ValidationResult::Incomplete
        ));
    }
}
