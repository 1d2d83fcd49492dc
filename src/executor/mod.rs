//! Statement execution for docsh
//!
//! This module provides the execution layer that takes resolved statements
//! and performs the corresponding backend operations. It includes:
//! - The dispatcher routing statements by path shape
//! - Argument shape validation for every verb
//! - Result types consumed by the formatter

pub mod dispatcher;
pub mod result;
pub mod shape;

pub use dispatcher::Dispatcher;
pub use result::{ExecutionResult, ExecutionStats, ResultData};
