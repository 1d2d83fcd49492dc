//! Session context
//!
//! A [`SessionContext`] holds the current database and the `var` bindings of
//! one console session. It is created at console start, passed explicitly to
//! the parser and the dispatcher, and mutated only by `use` and `var`.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{DocshError, InvalidNameError, NameKind, Result};
use crate::value::Value;

/// Database selected when the console starts without `--database`.
pub const DEFAULT_DATABASE: &str = "test";

/// Longest accepted database name, in bytes.
const MAX_DATABASE_NAME_LEN: usize = 64;

/// Characters a database name may not contain.
const FORBIDDEN_DATABASE_CHARS: &[char] =
    &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];

/// Per-session state: current database plus variable bindings.
#[derive(Debug, Clone)]
pub struct SessionContext {
    current_database: String,
    variables: BTreeMap<String, Value>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            current_database: DEFAULT_DATABASE.to_string(),
            variables: BTreeMap::new(),
        }
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session starting on the given database.
    ///
    /// # Arguments
    /// * `database` - Initial database name, validated like `use`
    ///
    /// # Returns
    /// * `Result<Self>` - New session or `InvalidNameError`
    pub fn with_database(database: &str) -> Result<Self> {
        let mut session = Self::default();
        session.use_database(database)?;
        Ok(session)
    }

    pub fn current_database(&self) -> &str {
        &self.current_database
    }

    /// Switch the current database.
    ///
    /// The switch is lazy: nothing is created or contacted. An invalid name
    /// leaves the session unchanged.
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        validate_database_name(name)?;
        if self.current_database != name {
            info!("Switched database: {} -> {}", self.current_database, name);
        }
        self.current_database = name.to_string();
        Ok(())
    }

    /// Bind a variable, replacing any previous binding.
    pub fn set_var(&mut self, name: &str, value: Value) {
        debug!("Binding variable '{}' ({})", name, value.type_name());
        self.variables.insert(name.to_string(), value);
    }

    /// Look up a variable.
    ///
    /// # Returns
    /// * `Result<&Value>` - Bound value or `NameError`
    pub fn get_var(&self, name: &str) -> Result<&Value> {
        self.variables
            .get(name)
            .ok_or_else(|| DocshError::name(name))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }
}

/// Check a database name against the server's naming rules.
pub fn validate_database_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty".to_string())
    } else if name.len() > MAX_DATABASE_NAME_LEN {
        Some(format!(
            "name is longer than {MAX_DATABASE_NAME_LEN} bytes"
        ))
    } else {
        name.chars()
            .find(|c| FORBIDDEN_DATABASE_CHARS.contains(c))
            .map(|c| format!("name cannot contain {c:?}"))
    };

    match reason {
        Some(reason) => Err(InvalidNameError {
            kind: NameKind::Database,
            name: name.to_string(),
            reason,
        }
        .into()),
        None => Ok(()),
    }
}

/// Check a collection name: non-empty, no `$`, no NUL.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.contains('$') {
        Some("name cannot contain '$'")
    } else if name.contains('\0') {
        Some("name cannot contain a null character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidNameError {
            kind: NameKind::Collection,
            name: name.to_string(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database() {
        let session = SessionContext::new();
        assert_eq!(session.current_database(), "test");
        assert!(session.variables().is_empty());
    }

    #[test]
    fn test_use_database() {
        let mut session = SessionContext::new();
        session.use_database("myNewDB").unwrap();
        assert_eq!(session.current_database(), "myNewDB");
    }

    #[test]
    fn test_invalid_name_leaves_session_unchanged() {
        let mut session = SessionContext::new();
        for bad in ["", "my db", "a.b", "x$", "a/b", "nul\0", &"x".repeat(65)] {
            let err = session.use_database(bad).unwrap_err();
            assert!(matches!(err, DocshError::InvalidName(_)), "{bad:?}");
        }
        assert_eq!(session.current_database(), "test");
        assert!(session.use_database(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_variables() {
        let mut session = SessionContext::new();
        assert!(matches!(session.get_var("a"), Err(DocshError::Name(_))));

        session.set_var("a", Value::Int(1));
        session.set_var("a", Value::Int(2));
        assert_eq!(session.get_var("a").unwrap(), &Value::Int(2));
        assert!(session.is_bound("a"));
    }

    #[test]
    fn test_collection_names() {
        assert!(validate_collection_name("3 test").is_ok());
        assert!(validate_collection_name("3-test").is_ok());
        assert!(validate_collection_name("a.b").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("a$b").is_err());
    }
}
