//! Execution result types
//!
//! This module defines the data structures for representing statement execution results:
//! - ExecutionResult: Overall result of a statement
//! - ResultData: What the renderer should show
//! - ExecutionStats: Statistics about the execution

use crate::value::Value;

/// Result of statement execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Result data
    pub data: ResultData,

    /// Execution statistics
    pub stats: ExecutionStats,
}

/// Data returned from statement execution
#[derive(Debug, Clone, PartialEq)]
pub enum ResultData {
    /// A value to render (documents, arrays, acknowledgements, scalars)
    Value(Value),

    /// Text printed as-is (`switched to db test`, listings)
    Message(String),

    /// No output (`var`, `exit`)
    None,
}

/// Execution statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStats {
    /// Execution time in milliseconds
    pub execution_time_ms: u64,

    /// Number of documents returned
    pub documents_returned: usize,

    /// Number of documents affected
    pub documents_affected: Option<u64>,
}

impl ExecutionResult {
    /// Create a result with default statistics
    pub fn new(data: ResultData) -> Self {
        Self {
            data,
            stats: ExecutionStats::default(),
        }
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::new(ResultData::Value(value.into()))
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(ResultData::Message(text.into()))
    }

    pub fn none() -> Self {
        Self::new(ResultData::None)
    }

    /// Attach statistics
    pub fn with_stats(mut self, stats: ExecutionStats) -> Self {
        self.stats = stats;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(ExecutionResult::none().data, ResultData::None);
        assert_eq!(
            ExecutionResult::message("switched to db test").data,
            ResultData::Message("switched to db test".into())
        );
        let result = ExecutionResult::value(true).with_stats(ExecutionStats {
            execution_time_ms: 3,
            documents_returned: 0,
            documents_affected: Some(1),
        });
        assert_eq!(result.data, ResultData::Value(Value::Bool(true)));
        assert_eq!(result.stats.documents_affected, Some(1));
    }
}
