//! Argument shape checks for dispatched verbs
//!
//! Each function takes the verb name (used in the error message) and the
//! resolved arguments, and either extracts the typed pieces the backend
//! needs or fails with an `ArgumentShapeError`.

use crate::error::{DocshError, Result};
use crate::session::validate_collection_name;
use crate::value::{Document, Value};

/// Require an empty argument list.
pub fn no_args(verb: &str, args: &[Value]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(DocshError::shape(verb, "no arguments"))
    }
}

/// Exactly one document.
pub fn one_document(verb: &str, args: &[Value]) -> Result<Document> {
    match args {
        [Value::Document(doc)] => Ok(doc.clone()),
        _ => Err(DocshError::shape(verb, "exactly one document")),
    }
}

/// Zero or one document; missing means empty.
pub fn optional_document(verb: &str, args: &[Value]) -> Result<Document> {
    match args {
        [] => Ok(Document::new()),
        [Value::Document(doc)] => Ok(doc.clone()),
        _ => Err(DocshError::shape(verb, "zero or one document")),
    }
}

/// `insert`: a single document or a non-empty array of documents.
pub fn insert_documents(verb: &str, args: &[Value]) -> Result<Vec<Document>> {
    match args {
        [Value::Document(doc)] => Ok(vec![doc.clone()]),
        [Value::Array(_)] => document_array(verb, args),
        _ => Err(DocshError::shape(
            verb,
            "a document or a non-empty array of documents",
        )),
    }
}

/// Exactly one non-empty array whose elements are all documents.
pub fn document_array(verb: &str, args: &[Value]) -> Result<Vec<Document>> {
    let expected = "one non-empty array of documents";
    let [Value::Array(items)] = args else {
        return Err(DocshError::shape(verb, expected));
    };
    if items.is_empty() {
        return Err(DocshError::shape(verb, expected));
    }
    items
        .iter()
        .map(|item| match item {
            Value::Document(doc) => Ok(doc.clone()),
            _ => Err(DocshError::shape(verb, expected)),
        })
        .collect()
}

/// Index keys or sort specification: a non-empty document of `1` / `-1`.
pub fn direction_document(verb: &str, args: &[Value]) -> Result<Document> {
    let expected = "one non-empty document with values 1 or -1";
    let [Value::Document(doc)] = args else {
        return Err(DocshError::shape(verb, expected));
    };
    if doc.is_empty() || !doc.iter().all(|(_, v)| is_direction(v)) {
        return Err(DocshError::shape(verb, expected));
    }
    Ok(doc.clone())
}

fn is_direction(value: &Value) -> bool {
    matches!(value.as_i64(), Some(1 | -1))
}

/// `limit` / `skip`: one non-negative integer.
pub fn count(verb: &str, args: &[Value]) -> Result<u64> {
    match args {
        [value] => value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| DocshError::shape(verb, "one non-negative integer")),
        _ => Err(DocshError::shape(verb, "one non-negative integer")),
    }
}

/// `runCommand`: a command document, or a command name meaning `{ name: 1 }`.
pub fn command(verb: &str, args: &[Value]) -> Result<Document> {
    match args {
        [Value::Document(doc)] if !doc.is_empty() => Ok(doc.clone()),
        [Value::String(name)] if !name.is_empty() => Ok(Document::new().with(name.as_str(), 1)),
        _ => Err(DocshError::shape(verb, "one command document or command name")),
    }
}

/// A collection name given as a string argument.
pub fn collection_name(verb: &str, value: Option<&Value>) -> Result<String> {
    match value {
        Some(Value::String(name)) => {
            validate_collection_name(name)?;
            Ok(name.clone())
        }
        _ => Err(DocshError::shape(verb, "a collection name string")),
    }
}

/// `getCollection(name)`.
pub fn single_collection_name(verb: &str, args: &[Value]) -> Result<String> {
    match args {
        [name] => collection_name(verb, Some(name)),
        _ => Err(DocshError::shape(verb, "a collection name string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, Value)]) -> Value {
        Value::Document(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_insert_documents_accepts_single_and_many() {
        let single = insert_documents("insert", &[doc(&[("a", Value::Int(1))])]).unwrap();
        assert_eq!(single.len(), 1);

        let many = insert_documents(
            "insert",
            &[Value::Array(vec![doc(&[("a", Value::Int(1))]), doc(&[("a", Value::Int(2))])])],
        )
        .unwrap();
        assert_eq!(many.len(), 2);

        assert!(insert_documents("insert", &[Value::Array(vec![])]).is_err());
        assert!(insert_documents("insert", &[]).is_err());
    }

    #[test]
    fn test_document_array_rejects_mixed_elements() {
        let err = document_array(
            "insertMany",
            &[Value::Array(vec![doc(&[("a", Value::Int(1))]), Value::Int(3)])],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ArgumentShapeError: insertMany expects one non-empty array of documents"
        );
        assert!(document_array("insertMany", &[doc(&[("a", Value::Int(1))])]).is_err());
    }

    #[test]
    fn test_direction_document() {
        assert!(direction_document("createIndex", &[doc(&[("y", Value::Int(1))])]).is_ok());
        assert!(direction_document("createIndex", &[doc(&[("y", Value::Long(-1))])]).is_ok());
        assert!(direction_document("createIndex", &[doc(&[("y", Value::Double(1.0))])]).is_ok());

        for bad in [Value::Int(2), Value::Double(1.5), Value::from("text"), Value::Int(0)] {
            let err = direction_document("createIndex", &[doc(&[("y", bad)])]).unwrap_err();
            assert!(matches!(err, DocshError::ArgumentShape(_)));
        }
        assert!(direction_document("createIndex", &[doc(&[])]).is_err());
        assert!(direction_document("createIndex", &[]).is_err());
    }

    #[test]
    fn test_count() {
        assert_eq!(count("limit", &[Value::Int(5)]).unwrap(), 5);
        assert_eq!(count("skip", &[Value::Double(2.0)]).unwrap(), 2);
        assert!(count("limit", &[Value::Int(-1)]).is_err());
        assert!(count("limit", &[Value::from("5")]).is_err());
        assert!(count("limit", &[]).is_err());
    }

    #[test]
    fn test_command_string_form() {
        let cmd = command("runCommand", &[Value::from("ping")]).unwrap();
        assert_eq!(cmd, Document::new().with("ping", 1));
        assert!(command("runCommand", &[]).is_err());
        assert!(command("runCommand", &[doc(&[])]).is_err());
    }

    #[test]
    fn test_collection_name_is_validated() {
        assert_eq!(
            single_collection_name("getCollection", &[Value::from("inventory")]).unwrap(),
            "inventory"
        );
        let err = single_collection_name("getCollection", &[Value::from("bad$name")]).unwrap_err();
        assert!(matches!(err, DocshError::InvalidName(_)));
        let err = single_collection_name("getCollection", &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, DocshError::ArgumentShape(_)));
    }

    #[test]
    fn test_no_args() {
        assert!(no_args("isCapped", &[]).is_ok());
        assert!(no_args("isCapped", &[Value::Null]).is_err());
    }
}
