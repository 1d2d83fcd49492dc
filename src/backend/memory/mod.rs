//! In-process backend
//!
//! Keeps databases, collections, indexes, capped flags, views and users in
//! memory. It backs `--offline` sessions and the test suite. Databases and
//! collections come into existence on first write, as they do on a server.

mod query;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{AdminBackend, CollectionBackend, FindOptions, ListKind, ensure_ids, index_name};
use crate::error::{BackendError, Result};
use crate::value::{Document, Timestamp, Value, document_to_bson, now_millis};

use query::{matches, server_error, sort_documents, values_equal};

/// Roles every database offers.
const BUILTIN_ROLES: &[&str] = &[
    "dbAdmin",
    "dbOwner",
    "enableSharding",
    "read",
    "readWrite",
    "userAdmin",
];

/// In-memory implementation of both backend traits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    catalog: RwLock<Catalog>,

    /// Delay applied before every call
    latency: Option<Duration>,

    /// Ordinal for server-filled timestamps
    increment: AtomicU32,
}

#[derive(Debug, Default)]
struct Catalog {
    databases: BTreeMap<String, DatabaseState>,
}

#[derive(Debug, Default)]
struct DatabaseState {
    collections: BTreeMap<String, CollectionState>,
    users: Vec<Document>,
}

#[derive(Debug, Clone)]
struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<(String, Document)>,
    capped: Option<CappedSpec>,
    view: Option<ViewSpec>,
}

#[derive(Debug, Clone, Copy)]
struct CappedSpec {
    size: i64,
    max: Option<i64>,
}

#[derive(Debug, Clone)]
struct ViewSpec {
    view_on: String,
    pipeline: Vec<Value>,
    collation: Option<Document>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            documents: Vec::new(),
            indexes: vec![("_id_".to_string(), Document::new().with("_id", 1))],
            capped: None,
            view: None,
        }
    }

    fn view(spec: ViewSpec) -> Self {
        Self {
            documents: Vec::new(),
            indexes: Vec::new(),
            capped: None,
            view: Some(spec),
        }
    }

    fn data_size(&self) -> i64 {
        self.documents.iter().map(encoded_size).sum()
    }

    /// Drop the oldest documents until capped limits hold.
    fn enforce_cap(&mut self) {
        let Some(cap) = self.capped else {
            return;
        };
        while let Some(max) = cap.max
            && self.documents.len() as i64 > max
        {
            self.documents.remove(0);
        }
        while self.documents.len() > 1 && self.data_size() > cap.size {
            self.documents.remove(0);
        }
    }
}

impl DatabaseState {
    fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.users.is_empty()
    }

    fn size_on_disk(&self) -> i64 {
        self.collections.values().map(CollectionState::data_size).sum()
    }
}

fn encoded_size(doc: &Document) -> i64 {
    let mut buffer = Vec::new();
    match document_to_bson(doc).to_writer(&mut buffer) {
        Ok(()) => buffer.len() as i64,
        Err(_) => 0,
    }
}

fn namespace(db: &str, collection: &str) -> String {
    format!("{db}.{collection}")
}

fn view_error(db: &str, collection: &str) -> crate::error::DocshError {
    server_error(
        166,
        "CommandNotSupportedOnView",
        format!("Namespace {} is a view, not a collection", namespace(db, collection)),
    )
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, to exercise timeouts and interrupts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Replace empty top-level timestamps with the current time.
    fn fill_timestamps(&self, doc: &mut Document) {
        let empty: Vec<String> = doc
            .iter()
            .filter(|(_, v)| matches!(v, Value::Timestamp(Timestamp { time: 0, increment: 0 })))
            .map(|(k, _)| k.to_string())
            .collect();
        for key in empty {
            let time = u32::try_from(now_millis().timestamp()).unwrap_or(u32::MAX);
            let increment = self.increment.fetch_add(1, Ordering::Relaxed) + 1;
            doc.insert(key, Value::Timestamp(Timestamp { time, increment }));
        }
    }

    async fn create(&self, db: &str, command: &Document) -> Result<Value> {
        let name = command
            .get("create")
            .and_then(Value::as_str)
            .ok_or_else(|| server_error(2, "BadValue", "collection name has invalid type"))?;

        let state = if let Some(view_on) = command.get("viewOn") {
            let view_on = view_on
                .as_str()
                .ok_or_else(|| server_error(14, "TypeMismatch", "'viewOn' must be a string"))?;
            let pipeline = match command.get("pipeline") {
                Some(Value::Array(stages)) => stages.clone(),
                None => Vec::new(),
                Some(_) => {
                    return Err(server_error(14, "TypeMismatch", "'pipeline' must be an array"));
                }
            };
            let collation = command.get("collation").and_then(Value::as_document).cloned();
            CollectionState::view(ViewSpec {
                view_on: view_on.to_string(),
                pipeline,
                collation,
            })
        } else {
            let mut state = CollectionState::new();
            if command.get("capped") == Some(&Value::Bool(true)) {
                let size = command.get("size").and_then(Value::as_i64).ok_or_else(|| {
                    let message = "the 'size' field is required when 'capped' is true";
                    server_error(72, "InvalidOptions", message)
                })?;
                let max = command.get("max").and_then(Value::as_i64);
                state.capped = Some(CappedSpec { size, max });
            }
            state
        };

        let mut catalog = self.catalog.write().await;
        let database = catalog.databases.entry(db.to_string()).or_default();
        if database.collections.contains_key(name) {
            return Err(server_error(
                48,
                "NamespaceExists",
                format!("Collection {} already exists.", namespace(db, name)),
            ));
        }
        debug!("Creating {} in memory", namespace(db, name));
        database.collections.insert(name.to_string(), state);
        Ok(ok_document())
    }

    async fn create_user(&self, db: &str, command: &Document) -> Result<Value> {
        let user = command
            .get("createUser")
            .and_then(Value::as_str)
            .ok_or_else(|| server_error(2, "BadValue", "User name must be a string"))?;
        let roles: Vec<Value> = match command.get("roles") {
            Some(Value::Array(roles)) => roles
                .iter()
                .map(|role| match role {
                    Value::String(name) => {
                        Value::Document(Document::new().with("role", name.as_str()).with("db", db))
                    }
                    other => other.clone(),
                })
                .collect(),
            _ => {
                let message = "\"createUser\" command requires a \"roles\" array";
                return Err(server_error(2, "BadValue", message));
            }
        };

        let mut catalog = self.catalog.write().await;
        let database = catalog.databases.entry(db.to_string()).or_default();
        if database
            .users
            .iter()
            .any(|u| u.get("user").and_then(Value::as_str) == Some(user))
        {
            return Err(server_error(
                51003,
                "Location51003",
                format!("User \"{user}@{db}\" already exists"),
            ));
        }

        let mut record = Document::new()
            .with("_id", format!("{db}.{user}"))
            .with("user", user)
            .with("db", db)
            .with("roles", roles);
        if let Some(custom) = command.get("customData") {
            record.insert("customData", custom.clone());
        }
        record.insert(
            "mechanisms",
            vec![Value::from("SCRAM-SHA-1"), Value::from("SCRAM-SHA-256")],
        );
        database.users.push(record);
        Ok(ok_document())
    }

    async fn convert_to_capped(&self, db: &str, command: &Document) -> Result<Value> {
        let name = command
            .get("convertToCapped")
            .and_then(Value::as_str)
            .ok_or_else(|| server_error(2, "BadValue", "collection name has invalid type"))?;
        let size = command
            .get("size")
            .and_then(Value::as_i64)
            .ok_or_else(|| server_error(2, "BadValue", "size must be a number"))?;

        let mut catalog = self.catalog.write().await;
        let state = catalog
            .databases
            .get_mut(db)
            .and_then(|d| d.collections.get_mut(name))
            .ok_or_else(|| {
                server_error(
                    26,
                    "NamespaceNotFound",
                    format!("source collection {} does not exist", namespace(db, name)),
                )
            })?;
        if state.view.is_some() {
            return Err(view_error(db, name));
        }
        state.capped = Some(CappedSpec { size, max: None });
        state.enforce_cap();
        Ok(ok_document())
    }

    async fn drop_command(&self, db: &str, command: &Document) -> Result<Value> {
        let name = command.get("drop").and_then(Value::as_str).unwrap_or_default();
        let mut catalog = self.catalog.write().await;
        let removed = catalog
            .databases
            .get_mut(db)
            .and_then(|d| d.collections.remove(name))
            .ok_or_else(|| server_error(26, "NamespaceNotFound", "ns not found"))?;
        Ok(Value::Document(
            Document::new()
                .with("nIndexesWas", removed.indexes.len() as i64)
                .with("ns", namespace(db, name))
                .with("ok", 1),
        ))
    }

    /// Documents visible through a view, with its pipeline applied.
    fn view_documents(catalog: &Catalog, db: &str, spec: &ViewSpec) -> Result<Vec<Document>> {
        let mut docs = catalog
            .databases
            .get(db)
            .and_then(|d| d.collections.get(&spec.view_on))
            .map(|c| c.documents.clone())
            .unwrap_or_default();

        for stage in &spec.pipeline {
            let Some((name, arg)) = stage.as_document().and_then(|d| d.iter().next()) else {
                return Err(server_error(
                    40323,
                    "Location40323",
                    "A pipeline stage specification object must contain exactly one field.",
                ));
            };
            match (name, arg) {
                ("$match", Value::Document(filter)) => {
                    let mut kept = Vec::with_capacity(docs.len());
                    for doc in docs {
                        if matches(&doc, filter)? {
                            kept.push(doc);
                        }
                    }
                    docs = kept;
                }
                ("$sort", Value::Document(spec)) => sort_documents(&mut docs, spec),
                ("$limit", n) if n.as_i64().is_some_and(|n| n >= 0) => {
                    docs.truncate(n.as_i64().unwrap_or_default() as usize);
                }
                ("$skip", n) if n.as_i64().is_some_and(|n| n >= 0) => {
                    let skip = (n.as_i64().unwrap_or_default() as usize).min(docs.len());
                    docs.drain(..skip);
                }
                _ => {
                    return Err(server_error(
                        40324,
                        "Location40324",
                        format!("Unrecognized pipeline stage name: '{name}'"),
                    ));
                }
            }
        }
        if spec.collation.is_some() {
            warn!("Ignoring view collation in memory backend");
        }
        Ok(docs)
    }
}

fn ok_document() -> Value {
    Value::Document(Document::new().with("ok", 1))
}

#[async_trait]
impl AdminBackend for MemoryBackend {
    async fn list(&self, kind: ListKind, db: &str) -> Result<Value> {
        self.pause().await;
        let catalog = self.catalog.read().await;
        let database = catalog.databases.get(db);

        let items: Vec<Value> = match kind {
            ListKind::Databases => catalog
                .databases
                .iter()
                .filter(|(_, state)| !state.is_empty())
                .map(|(name, state)| {
                    let size = state.size_on_disk();
                    Value::Document(
                        Document::new()
                            .with("name", name.as_str())
                            .with("sizeOnDisk", Value::Long(size))
                            .with("empty", size == 0),
                    )
                })
                .collect(),
            ListKind::Collections => database
                .map(|d| d.collections.keys().map(|k| Value::from(k.as_str())).collect())
                .unwrap_or_default(),
            ListKind::Users => database
                .map(|d| d.users.iter().cloned().map(Value::Document).collect())
                .unwrap_or_default(),
            ListKind::Roles => BUILTIN_ROLES
                .iter()
                .map(|role| {
                    Value::Document(
                        Document::new()
                            .with("role", *role)
                            .with("db", db)
                            .with("isBuiltin", true)
                            .with("roles", Vec::<Value>::new())
                            .with("inheritedRoles", Vec::<Value>::new()),
                    )
                })
                .collect(),
            ListKind::Profile => database
                .and_then(|d| d.collections.get("system.profile"))
                .map(|c| c.documents.iter().rev().take(5).cloned().map(Value::Document).collect())
                .unwrap_or_default(),
        };
        Ok(Value::Array(items))
    }

    async fn host_info(&self) -> Result<Value> {
        self.pause().await;
        let cores = std::thread::available_parallelism()
            .map(|n| n.get() as i64)
            .unwrap_or(1);
        let system = Document::new()
            .with("currentTime", Value::Date(now_millis()))
            .with("hostname", "localhost")
            .with("cpuAddrSize", 64)
            .with("numCores", cores)
            .with("cpuArch", std::env::consts::ARCH);
        let os = Document::new()
            .with("type", std::env::consts::OS)
            .with("name", std::env::consts::FAMILY);
        Ok(Value::Document(
            Document::new()
                .with("system", system)
                .with("os", os)
                .with("extra", Document::new())
                .with("ok", 1),
        ))
    }

    async fn run_command(&self, db: &str, command: Document) -> Result<Value> {
        self.pause().await;
        let Some(name) = command.keys().next().map(str::to_string) else {
            return Err(server_error(59, "CommandNotFound", "no such command: ''"));
        };
        debug!("Memory command '{}' on {}", name, db);

        match name.as_str() {
            "ping" => Ok(ok_document()),
            "hello" | "isMaster" | "ismaster" => Ok(Value::Document(
                Document::new()
                    .with("isWritablePrimary", true)
                    .with("maxBsonObjectSize", 16 * 1024 * 1024)
                    .with("localTime", Value::Date(now_millis()))
                    .with("ok", 1),
            )),
            "buildInfo" | "buildinfo" => Ok(Value::Document(
                Document::new()
                    .with("version", env!("CARGO_PKG_VERSION"))
                    .with("storageEngines", vec![Value::from("memory")])
                    .with("ok", 1),
            )),
            "create" => self.create(db, &command).await,
            "createUser" => self.create_user(db, &command).await,
            "convertToCapped" => self.convert_to_capped(db, &command).await,
            "drop" => self.drop_command(db, &command).await,
            "dropDatabase" => {
                self.catalog.write().await.databases.remove(db);
                Ok(ok_document())
            }
            other => Err(server_error(
                59,
                "CommandNotFound",
                format!("no such command: '{other}'"),
            )),
        }
    }

    async fn collection_stats(&self, db: &str) -> Result<Value> {
        self.pause().await;
        let catalog = self.catalog.read().await;
        let mut stats = Document::new();
        if let Some(database) = catalog.databases.get(db) {
            for (name, state) in &database.collections {
                let mut entry = Document::new()
                    .with("ns", namespace(db, name))
                    .with("count", state.documents.len() as i64)
                    .with("size", state.data_size())
                    .with("nindexes", state.indexes.len() as i64)
                    .with("capped", state.capped.is_some());
                if let Some(cap) = state.capped {
                    entry.insert("maxSize", cap.size);
                    if let Some(max) = cap.max {
                        entry.insert("max", max);
                    }
                }
                if let Some(view) = &state.view {
                    entry.insert("viewOn", view.view_on.as_str());
                }
                entry.insert("ok", 1);
                stats.insert(name.as_str(), entry);
            }
        }
        Ok(Value::Document(stats))
    }

    async fn replication_info(&self) -> Result<Value> {
        self.pause().await;
        Err(BackendError::new("no replication has been enabled, so there is no oplog").into())
    }

    async fn sharding_status(&self) -> Result<Value> {
        self.pause().await;
        Err(server_error(
            203,
            "ShardingStateNotInitialized",
            "This db does not have sharding enabled. Be sure you are connecting to a mongos \
             from the shell and not to a mongod.",
        ))
    }

    async fn repair_database(&self, _db: &str) -> Result<Value> {
        self.pause().await;
        Ok(ok_document())
    }

    async fn reset_error(&self, _db: &str) -> Result<Value> {
        self.pause().await;
        Ok(ok_document())
    }

    async fn connection_info(&self) -> Result<Value> {
        self.pause().await;
        Ok(Value::from("memory://"))
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    async fn insert(
        &self,
        db: &str,
        collection: &str,
        mut documents: Vec<Document>,
    ) -> Result<Vec<Value>> {
        self.pause().await;
        let ids = ensure_ids(&mut documents);
        for doc in &mut documents {
            self.fill_timestamps(doc);
        }

        let mut catalog = self.catalog.write().await;
        let state = catalog
            .databases
            .entry(db.to_string())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_insert_with(CollectionState::new);
        if state.view.is_some() {
            return Err(view_error(db, collection));
        }

        for (doc, id) in documents.into_iter().zip(&ids) {
            if state
                .documents
                .iter()
                .any(|existing| existing.get("_id").is_some_and(|e| values_equal(e, id)))
            {
                return Err(server_error(
                    11000,
                    "DuplicateKey",
                    format!(
                        "E11000 duplicate key error collection: {} \
                         index: _id_ dup key: {{ _id: {id} }}",
                        namespace(db, collection)
                    ),
                ));
            }
            state.documents.push(doc);
        }
        state.enforce_cap();
        debug!("Inserted {} document(s) into {}", ids.len(), namespace(db, collection));
        Ok(ids)
    }

    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        self.pause().await;
        let catalog = self.catalog.read().await;
        let state = catalog.databases.get(db).and_then(|d| d.collections.get(collection));
        let Some(state) = state else {
            return Ok(Vec::new());
        };

        let source = match &state.view {
            Some(spec) => Self::view_documents(&catalog, db, spec)?,
            None => state.documents.clone(),
        };

        let mut docs = Vec::new();
        for doc in source {
            if matches(&doc, &filter)? {
                docs.push(doc);
            }
        }
        if let Some(sort) = &options.sort {
            sort_documents(&mut docs, sort);
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let docs = docs.into_iter().skip(skip);
        let docs: Vec<Document> = match options.limit {
            Some(limit) if limit > 0 => docs.take(limit as usize).collect(),
            _ => docs.collect(),
        };
        Ok(docs)
    }

    async fn drop_collection(&self, db: &str, collection: &str) -> Result<bool> {
        self.pause().await;
        let mut catalog = self.catalog.write().await;
        let removed = catalog
            .databases
            .get_mut(db)
            .and_then(|d| d.collections.remove(collection))
            .is_some();
        if catalog.databases.get(db).is_some_and(DatabaseState::is_empty) {
            catalog.databases.remove(db);
        }
        Ok(removed)
    }

    async fn create_index(&self, db: &str, collection: &str, keys: Document) -> Result<String> {
        self.pause().await;
        let name = index_name(&keys);
        let mut catalog = self.catalog.write().await;
        let state = catalog
            .databases
            .entry(db.to_string())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_insert_with(CollectionState::new);
        if state.view.is_some() {
            return Err(view_error(db, collection));
        }
        if !state.indexes.iter().any(|(existing, _)| *existing == name) {
            state.indexes.push((name.clone(), keys));
        }
        Ok(name)
    }

    async fn is_capped(&self, db: &str, collection: &str) -> Result<bool> {
        self.pause().await;
        let catalog = self.catalog.read().await;
        Ok(catalog
            .databases
            .get(db)
            .and_then(|d| d.collections.get(collection))
            .is_some_and(|c| c.capped.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(key: &str, value: impl Into<Value>) -> Document {
        Document::new().with(key, value)
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_creates_namespace() {
        let backend = MemoryBackend::new();
        let ids = backend.insert("test", "foo", vec![doc("x", 1)]).await.unwrap();
        assert!(matches!(ids[0], Value::ObjectId(_)));

        let dbs = backend.list(ListKind::Databases, "test").await.unwrap();
        let names: Vec<_> = dbs
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d.as_document().unwrap().get("name").cloned().unwrap())
            .collect();
        assert_eq!(names, vec![Value::from("test")]);

        let colls = backend.list(ListKind::Collections, "test").await.unwrap();
        assert_eq!(colls, Value::Array(vec![Value::from("foo")]));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let backend = MemoryBackend::new();
        backend.insert("test", "c", vec![doc("_id", 1)]).await.unwrap();
        let err = backend.insert("test", "c", vec![doc("_id", 1)]).await.unwrap_err();
        assert!(err.to_string().contains("E11000 duplicate key error collection: test.c"));
    }

    #[tokio::test]
    async fn test_find_with_options() {
        let backend = MemoryBackend::new();
        let docs = (1..=5).map(|n| doc("n", n).with("even", n % 2 == 0)).collect();
        backend.insert("test", "nums", docs).await.unwrap();

        let found = backend
            .find("test", "nums", doc("even", false), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 3);

        let options = FindOptions {
            sort: Some(doc("n", -1)),
            limit: Some(2),
            skip: Some(1),
        };
        let found = backend.find("test", "nums", Document::new(), options).await.unwrap();
        let ns: Vec<_> = found.iter().map(|d| d.get("n").cloned().unwrap()).collect();
        assert_eq!(ns, vec![Value::Int(4), Value::Int(3)]);

        let missing = backend
            .find("test", "nothing", Document::new(), FindOptions::default())
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_create_collection_twice_fails() {
        let backend = MemoryBackend::new();
        let create = doc("create", "log").with("capped", true).with("size", 100000);
        backend.run_command("myNewDB", create.clone()).await.unwrap();
        assert!(backend.is_capped("myNewDB", "log").await.unwrap());

        let err = backend.run_command("myNewDB", create).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "BackendError[NamespaceExists(48)]: Collection myNewDB.log already exists."
        );
    }

    #[tokio::test]
    async fn test_capped_requires_size_and_evicts() {
        let backend = MemoryBackend::new();
        let err = backend
            .run_command("test", doc("create", "c").with("capped", true))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'size' field is required"));

        backend
            .run_command(
                "test",
                doc("create", "c").with("capped", true).with("size", 100000).with("max", 2),
            )
            .await
            .unwrap();
        let docs = (1..=3).map(|n| doc("n", n)).collect();
        backend.insert("test", "c", docs).await.unwrap();
        let found = backend
            .find(
                "test",
                "c",
                Document::new(),
                FindOptions { sort: Some(doc("$natural", -1)), ..Default::default() },
            )
            .await
            .unwrap();
        let ns: Vec<_> = found.iter().map(|d| d.get("n").cloned().unwrap()).collect();
        assert_eq!(ns, vec![Value::Int(3), Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_convert_to_capped_missing_collection() {
        let backend = MemoryBackend::new();
        let err = backend
            .run_command("myNewDB", doc("convertToCapped", "mycoll").with("size", 100000))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "BackendError[NamespaceNotFound(26)]: source collection myNewDB.mycoll does not exist"
        );
    }

    #[tokio::test]
    async fn test_views_apply_pipeline_and_refuse_writes() {
        let backend = MemoryBackend::new();
        let docs = (1..=4).map(|n| doc("n", n)).collect();
        backend.insert("test", "src", docs).await.unwrap();

        let pipeline = vec![Value::Document(doc(
            "$match",
            doc("n", Document::new().with("$gte", 3)),
        ))];
        let create = doc("create", "v").with("viewOn", "src").with("pipeline", pipeline);
        backend.run_command("test", create).await.unwrap();

        let found = backend
            .find("test", "v", Document::new(), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(backend.insert("test", "v", vec![doc("n", 9)]).await.is_err());
    }

    #[tokio::test]
    async fn test_users_and_unknown_commands() {
        let backend = MemoryBackend::new();
        let roles = vec![
            Value::Document(doc("role", "readWrite").with("db", "test")),
            Value::from("read"),
        ];
        let command = doc("createUser", "myTester").with("pwd", "xyz123").with("roles", roles);
        backend.run_command("test", command.clone()).await.unwrap();
        assert!(backend.run_command("test", command).await.is_err());

        let users = backend.list(ListKind::Users, "test").await.unwrap();
        let user = users.as_array().unwrap()[0].as_document().unwrap().clone();
        assert_eq!(user.get("_id"), Some(&Value::from("test.myTester")));
        assert!(user.get("pwd").is_none());

        let err = backend.run_command("test", doc("explode", 1)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "BackendError[CommandNotFound(59)]: no such command: 'explode'"
        );
    }

    #[tokio::test]
    async fn test_drop_and_index() {
        let backend = MemoryBackend::new();
        assert!(!backend.drop_collection("test", "students").await.unwrap());
        let name = backend.create_index("myNewDB", "c3", doc("y", 1)).await.unwrap();
        assert_eq!(name, "y_1");
        assert!(backend.drop_collection("myNewDB", "c3").await.unwrap());
        assert!(!backend.is_capped("myNewDB", "c3").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_timestamp_is_filled() {
        let backend = MemoryBackend::new();
        let ts = Value::Timestamp(Timestamp { time: 0, increment: 0 });
        backend.insert("test", "test", vec![doc("ts", ts)]).await.unwrap();
        let found = backend
            .find("test", "test", Document::new(), FindOptions::default())
            .await
            .unwrap();
        match found[0].get("ts") {
            Some(Value::Timestamp(t)) => {
                assert!(t.time > 0);
                assert_eq!(t.increment, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_fallbacks() {
        let backend = MemoryBackend::new();
        assert!(backend.replication_info().await.is_err());
        assert!(backend.sharding_status().await.is_err());
        assert_eq!(backend.connection_info().await.unwrap(), Value::from("memory://"));
        assert!(backend.host_info().await.unwrap().as_document().unwrap().contains_key("system"));
    }
}
