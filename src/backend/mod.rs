//! Backend interfaces used by the dispatcher
//!
//! The dispatcher never talks to a database directly. Administrative
//! operations go through [`AdminBackend`] and per-collection operations
//! through [`CollectionBackend`]. Two implementations ship with the crate:
//! - [`MongoBackend`]: delegates to the official driver
//! - [`MemoryBackend`]: in-process state for offline sessions and tests

use async_trait::async_trait;

use crate::error::Result;
use crate::value::{Document, Value};

pub mod memory;
pub mod mongo;

pub use memory::MemoryBackend;
pub use mongo::MongoBackend;

/// What a `show` statement lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Databases,
    Collections,
    Users,
    Roles,
    Profile,
}

impl ListKind {
    /// Map a `show` keyword to a list kind.
    ///
    /// # Arguments
    /// * `keyword` - Word following `show`
    ///
    /// # Returns
    /// * `Option<Self>` - None for unknown keywords
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "dbs" | "databases" => Some(ListKind::Databases),
            "collections" | "tables" => Some(ListKind::Collections),
            "users" => Some(ListKind::Users),
            "roles" => Some(ListKind::Roles),
            "profile" => Some(ListKind::Profile),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Databases => "databases",
            ListKind::Collections => "collections",
            ListKind::Users => "users",
            ListKind::Roles => "roles",
            ListKind::Profile => "profile",
        }
    }
}

/// Cursor modifiers applied to a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort specification, `{ field: 1 | -1 }` or `{ $natural: 1 | -1 }`
    pub sort: Option<Document>,

    /// Maximum number of documents; None means no limit
    pub limit: Option<u64>,

    /// Number of documents to skip
    pub skip: Option<u64>,
}

/// Database-level and server-level operations.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// List databases, collections, users, roles or profile entries.
    ///
    /// Databases come back as documents `{ name, sizeOnDisk, empty }`,
    /// collections as strings, the rest as documents.
    async fn list(&self, kind: ListKind, db: &str) -> Result<Value>;

    async fn host_info(&self) -> Result<Value>;

    /// Run a raw database command against `db`.
    async fn run_command(&self, db: &str, command: Document) -> Result<Value>;

    /// Statistics for every collection of `db`, keyed by collection name.
    async fn collection_stats(&self, db: &str) -> Result<Value>;

    async fn replication_info(&self) -> Result<Value>;

    async fn sharding_status(&self) -> Result<Value>;

    async fn repair_database(&self, db: &str) -> Result<Value>;

    async fn reset_error(&self, db: &str) -> Result<Value>;

    /// Description of the connection, usually its URI.
    async fn connection_info(&self) -> Result<Value>;
}

/// Operations on a single collection.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Insert documents and return their `_id` values in input order.
    async fn insert(&self, db: &str, collection: &str, documents: Vec<Document>)
    -> Result<Vec<Value>>;

    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>>;

    /// Drop a collection. Returns false when it did not exist.
    async fn drop_collection(&self, db: &str, collection: &str) -> Result<bool>;

    /// Create an index and return its name.
    async fn create_index(&self, db: &str, collection: &str, keys: Document) -> Result<String>;

    async fn is_capped(&self, db: &str, collection: &str) -> Result<bool>;
}

/// Both halves of a backend, as the dispatcher needs them.
pub trait Backend: AdminBackend + CollectionBackend {}

impl<T: AdminBackend + CollectionBackend> Backend for T {}

/// Default index name for a key specification, e.g. `{ a: 1, b: -1 }` gives
/// `a_1_b_-1`.
pub fn index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, direction)| match direction.as_i64() {
            Some(n) => format!("{field}_{n}"),
            None => format!("{field}_{direction}"),
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Give every document an `_id`, generating an ObjectId where missing.
///
/// The generated field goes first, as the server would place it.
pub fn ensure_ids(documents: &mut [Document]) -> Vec<Value> {
    documents
        .iter_mut()
        .map(|doc| match doc.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Value::ObjectId(bson::oid::ObjectId::new());
                let mut with_id = Document::new().with("_id", id.clone());
                for (key, value) in std::mem::take(doc) {
                    with_id.insert(key, value);
                }
                *doc = with_id;
                id
            }
        })
        .collect()
}
