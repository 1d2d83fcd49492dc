//! Statement dispatcher
//!
//! Routes resolved statements to backend operations by path shape:
//! - control statements (`use`, `show`, `var`, `exit`) touch the session or list
//! - `db.<verb>()` goes to [`AdminBackend`](crate::backend::AdminBackend)
//! - `db.<collection>.<verb>()` goes to [`CollectionBackend`](crate::backend::CollectionBackend)
//! - `<variable>.<method>()` applies value methods without a backend call
//!
//! Every backend call is raced against the operation timeout and the
//! statement's cancellation token. Only `use` and `var` mutate the session and
//! they never call the backend, so a failed or interrupted call leaves the
//! session as it was.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::result::{ExecutionResult, ExecutionStats, ResultData};
use super::shape;
use crate::backend::{Backend, FindOptions, ListKind};
use crate::error::{BackendTimeoutError, DocshError, Result};
use crate::parser::{CallExpression, ControlStatement, MethodCall, Statement};
use crate::session::SessionContext;
use crate::value::methods::call_method;
use crate::value::{Document, Value};

/// Name of the database handle at the head of call paths.
const DB_HANDLE: &str = "db";

/// Message shown by `show profile` when nothing was recorded.
const EMPTY_PROFILE: &str = "db.system.profile is empty\n\
Use db.setProfilingLevel(2) will enable profiling\n\
Use db.system.profile.find() to show raw profile entries";

/// Dispatches statements against a backend
pub struct Dispatcher {
    /// Backend receiving admin and collection operations
    backend: Arc<dyn Backend>,

    /// Upper bound for a single backend call
    timeout: Duration,
}

impl Dispatcher {
    /// Create a new dispatcher
    ///
    /// # Arguments
    /// * `backend` - Backend implementation
    /// * `timeout` - Operation timeout applied to every backend call
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one statement
    ///
    /// # Arguments
    /// * `statement` - Resolved statement
    /// * `session` - Session context; only `use` and `var` change it
    /// * `cancel` - Token cancelled when the user interrupts the statement
    ///
    /// # Returns
    /// * `Result<ExecutionResult>` - Result to render, or a statement-level error
    pub async fn dispatch(
        &self,
        statement: Statement,
        session: &mut SessionContext,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();

        let mut result = match statement {
            Statement::Control(control) => self.dispatch_control(control, session, cancel).await?,
            Statement::Call(call) => self.dispatch_call(&call, session, cancel).await?,
            Statement::Value(value) => ExecutionResult::value(value),
            Statement::CurrentDatabase => ExecutionResult::value(session.current_database()),
        };

        result.stats.execution_time_ms = start.elapsed().as_millis() as u64;
        debug!("Statement executed in {}ms", result.stats.execution_time_ms);
        Ok(result)
    }

    /// Race a backend call against the timeout and the cancellation token.
    async fn guarded<T, F>(&self, operation: &str, cancel: &CancellationToken, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("{} interrupted", operation);
                Err(DocshError::Interrupted)
            }
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(DocshError::BackendTimeout(BackendTimeoutError {
                    operation: operation.to_string(),
                    timeout: self.timeout,
                })),
            },
        }
    }

    async fn dispatch_control(
        &self,
        control: ControlStatement,
        session: &mut SessionContext,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        match control {
            ControlStatement::Use(name) => {
                session.use_database(&name)?;
                info!("Switched to database '{}'", name);
                Ok(ExecutionResult::message(format!("switched to db {name}")))
            }
            ControlStatement::Show(keyword) => {
                let kind = ListKind::from_keyword(&keyword)
                    .ok_or_else(|| DocshError::unknown(format!("show {keyword}")))?;
                self.show(kind, session.current_database(), cancel).await
            }
            ControlStatement::Var { name, value } => {
                debug!("Binding variable '{}'", name);
                session.set_var(&name, value);
                Ok(ExecutionResult::none())
            }
            ControlStatement::Exit => Ok(ExecutionResult::none()),
        }
    }

    async fn show(
        &self,
        kind: ListKind,
        db: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let operation = format!("show {}", kind.as_str());
        let listing = self
            .guarded(&operation, cancel, self.backend.list(kind, db))
            .await?;
        let items = match listing {
            Value::Array(items) => items,
            other => return Ok(ExecutionResult::value(other)),
        };

        let stats = ExecutionStats {
            documents_returned: items.len(),
            ..Default::default()
        };
        let result = match kind {
            ListKind::Databases => ExecutionResult::message(database_listing(&items)),
            ListKind::Collections if items.is_empty() => ExecutionResult::none(),
            ListKind::Collections => ExecutionResult::message(
                items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            ListKind::Profile if items.is_empty() => ExecutionResult::message(EMPTY_PROFILE),
            ListKind::Users | ListKind::Roles | ListKind::Profile => {
                ExecutionResult::value(Value::Array(items))
            }
        };
        Ok(result.with_stats(stats))
    }

    async fn dispatch_call(
        &self,
        call: &CallExpression,
        session: &SessionContext,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        debug!("Dispatching {}", call.describe());

        let Some((head, rest)) = call.target.split_first() else {
            return Err(DocshError::unknown(call.describe()));
        };
        if head != DB_HANDLE {
            return apply_value_methods(call, session);
        }

        let db = session.current_database();
        if rest.is_empty() {
            self.dispatch_database(call, db, cancel).await
        } else {
            let collection = rest.join(".");
            self.dispatch_collection(call, db, &collection, &call.calls, cancel)
                .await
        }
    }

    /// `db.<verb>(...)`
    async fn dispatch_database(
        &self,
        call: &CallExpression,
        db: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let verb = call.method();
        let args = call.args();

        if verb == "getCollection" {
            let collection = shape::single_collection_name(verb, args)?;
            if call.chain().is_empty() {
                return Ok(ExecutionResult::value(format!("{db}.{collection}")));
            }
            return self
                .dispatch_collection(call, db, &collection, call.chain(), cancel)
                .await;
        }

        if !call.chain().is_empty() {
            return Err(DocshError::unknown(call.describe()));
        }

        let backend = &self.backend;
        let value = match verb {
            "hostInfo" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.host_info()).await?
            }
            "printCollectionStats" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.collection_stats(db)).await?
            }
            "printReplicationInfo"
            | "printSlaveReplicationInfo"
            | "printSecondaryReplicationInfo" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.replication_info()).await?
            }
            "printShardingStatus" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.sharding_status()).await?
            }
            "repairDatabase" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.repair_database(db)).await?
            }
            "resetError" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.reset_error(db)).await?
            }
            "getMongo" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.connection_info()).await?
            }
            "getCollectionNames" => {
                shape::no_args(verb, args)?;
                self.guarded(verb, cancel, backend.list(ListKind::Collections, db))
                    .await?
            }
            "getName" => {
                shape::no_args(verb, args)?;
                Value::from(db)
            }
            "runCommand" => {
                let command = shape::command(verb, args)?;
                self.guarded(verb, cancel, backend.run_command(db, command)).await?
            }
            "createCollection" => {
                let command = create_collection_command(verb, args)?;
                self.guarded(verb, cancel, backend.run_command(db, command)).await?
            }
            "createView" => {
                let command = create_view_command(verb, args)?;
                self.guarded(verb, cancel, backend.run_command(db, command)).await?
            }
            "createUser" => {
                let command = create_user_command(verb, args)?;
                self.guarded(verb, cancel, backend.run_command(db, command)).await?
            }
            _ => return Err(DocshError::unknown(call.describe())),
        };
        Ok(ExecutionResult::value(value))
    }

    /// `<collection handle>.<verb>(...)[.<modifier>(...)]`
    ///
    /// `calls` starts with the collection verb; anything after it is only
    /// valid as cursor modifiers on `find`.
    async fn dispatch_collection(
        &self,
        call: &CallExpression,
        db: &str,
        collection: &str,
        calls: &[MethodCall],
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let Some((first, modifiers)) = calls.split_first() else {
            return Err(DocshError::unknown(call.describe()));
        };
        let verb = first.name.as_str();
        let args = first.args.as_slice();
        let operation = format!("{db}.{collection}.{verb}()");

        if verb == "find" {
            let filter = shape::optional_document(verb, args)?;
            let options = find_options(call, modifiers)?;
            let documents = self
                .guarded(&operation, cancel, self.backend.find(db, collection, filter, options))
                .await?;
            let stats = ExecutionStats {
                documents_returned: documents.len(),
                ..Default::default()
            };
            let items = documents.into_iter().map(Value::Document).collect();
            return Ok(ExecutionResult::value(Value::Array(items)).with_stats(stats));
        }

        if !modifiers.is_empty() {
            return Err(DocshError::unknown(call.describe()));
        }

        let backend = &self.backend;
        match verb {
            "insert" | "insertMany" => {
                let documents = if verb == "insert" {
                    shape::insert_documents(verb, args)?
                } else {
                    shape::document_array(verb, args)?
                };
                let ids = self
                    .guarded(&operation, cancel, backend.insert(db, collection, documents))
                    .await?;
                let affected = ids.len() as u64;
                let inserted: Document = ids
                    .into_iter()
                    .enumerate()
                    .map(|(i, id)| (i.to_string(), id))
                    .collect();
                Ok(acknowledged("insertedIds", inserted, affected))
            }
            "insertOne" => {
                let document = shape::one_document(verb, args)?;
                let ids = self
                    .guarded(&operation, cancel, backend.insert(db, collection, vec![document]))
                    .await?;
                let id = ids.into_iter().next().unwrap_or(Value::Null);
                Ok(acknowledged("insertedId", id, 1))
            }
            "drop" => {
                shape::optional_document(verb, args)?;
                let dropped = self
                    .guarded(&operation, cancel, backend.drop_collection(db, collection))
                    .await?;
                Ok(ExecutionResult::value(dropped))
            }
            "createIndex" => {
                let keys = shape::direction_document(verb, args)?;
                let name = self
                    .guarded(&operation, cancel, backend.create_index(db, collection, keys))
                    .await?;
                Ok(ExecutionResult::value(name))
            }
            "isCapped" => {
                shape::no_args(verb, args)?;
                let capped = self
                    .guarded(&operation, cancel, backend.is_capped(db, collection))
                    .await?;
                Ok(ExecutionResult::value(capped))
            }
            _ => Err(DocshError::unknown(call.describe())),
        }
    }
}

/// `{ acknowledged: true, <field>: ids }` with the affected count recorded.
fn acknowledged(field: &str, ids: impl Into<Value>, affected: u64) -> ExecutionResult {
    let reply = Document::new().with("acknowledged", true).with(field, ids);
    ExecutionResult::new(ResultData::Value(Value::Document(reply))).with_stats(ExecutionStats {
        documents_affected: Some(affected),
        ..Default::default()
    })
}

/// Collect `sort`, `limit`, `skip` and `pretty` modifiers following a find.
fn find_options(call: &CallExpression, modifiers: &[MethodCall]) -> Result<FindOptions> {
    let mut options = FindOptions::default();
    for modifier in modifiers {
        let verb = modifier.name.as_str();
        let args = modifier.args.as_slice();
        match verb {
            "sort" => options.sort = Some(shape::direction_document(verb, args)?),
            "limit" => options.limit = Some(shape::count(verb, args)?),
            "skip" => options.skip = Some(shape::count(verb, args)?),
            "pretty" => shape::no_args(verb, args)?,
            _ => return Err(DocshError::unknown(call.describe())),
        }
    }
    Ok(options)
}

/// `db.createCollection(name[, options])`
fn create_collection_command(verb: &str, args: &[Value]) -> Result<Document> {
    let (name, options) = match args {
        [name] => (name, None),
        [name, Value::Document(options)] => (name, Some(options)),
        _ => return Err(DocshError::shape(verb, "a collection name and optional options document")),
    };
    let name = shape::collection_name(verb, Some(name))?;

    let mut command = Document::new().with("create", name);
    for (key, value) in options.into_iter().flat_map(Document::iter) {
        command.insert(key, value.clone());
    }
    Ok(command)
}

/// `db.createView(name, source, pipeline[, collation])`
fn create_view_command(verb: &str, args: &[Value]) -> Result<Document> {
    let expected = "a view name, a source collection, a pipeline array and an optional collation";
    let (name, source, pipeline, collation) = match args {
        [name, source, Value::Array(pipeline)] => (name, source, pipeline, None),
        [name, source, Value::Array(pipeline), Value::Document(collation)] => {
            (name, source, pipeline, Some(collation))
        }
        _ => return Err(DocshError::shape(verb, expected)),
    };
    let name = shape::collection_name(verb, Some(name))?;
    let source = shape::collection_name(verb, Some(source))?;

    let mut command = Document::new()
        .with("create", name)
        .with("viewOn", source)
        .with("pipeline", pipeline.clone());
    if let Some(collation) = collation {
        command.insert("collation", collation.clone());
    }
    Ok(command)
}

/// `db.createUser({ user, pwd, roles, ... })` becomes `{ createUser: user, pwd, roles, ... }`.
fn create_user_command(verb: &str, args: &[Value]) -> Result<Document> {
    let mut user_doc = shape::one_document(verb, args)?;
    let Some(Value::String(user)) = user_doc.remove("user") else {
        return Err(DocshError::shape(verb, "a user document with a string 'user' field"));
    };

    let mut command = Document::new().with("createUser", user);
    for (key, value) in user_doc {
        command.insert(key, value);
    }
    Ok(command)
}

/// `<variable>[.field...].<method>()...` evaluated locally.
fn apply_value_methods(call: &CallExpression, session: &SessionContext) -> Result<ExecutionResult> {
    let Some((name, fields)) = call.target.split_first() else {
        return Err(DocshError::unknown(call.describe()));
    };

    let mut value = session.get_var(name)?.clone();
    for field in fields {
        value = match value.as_document().and_then(|doc| doc.get(field)) {
            Some(inner) => inner.clone(),
            None => return Err(DocshError::name(format!("{name}.{}", fields.join(".")))),
        };
    }

    for method in &call.calls {
        value = call_method(&value, &method.name, &method.args)?;
    }
    Ok(ExecutionResult::value(value))
}

/// `show dbs` listing: names padded to a common width followed by sizes.
fn database_listing(items: &[Value]) -> String {
    let rows: Vec<(String, String)> = items
        .iter()
        .filter_map(Value::as_document)
        .map(|doc| {
            let name = doc.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let size = doc.get("sizeOnDisk").and_then(Value::as_i64).unwrap_or(0);
            (name, format_size(size))
        })
        .collect();

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(name, size)| format!("{name:<width$}  {size}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable byte count, e.g. `40.00 KiB`.
fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes.max(0) as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes.max(0), UNITS[0])
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::parser::parse_statement;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(MemoryBackend::new()), Duration::from_secs(5))
    }

    async fn run(
        dispatcher: &Dispatcher,
        session: &mut SessionContext,
        input: &str,
    ) -> Result<ExecutionResult> {
        let statement = parse_statement(input, session)?;
        dispatcher
            .dispatch(statement, session, &CancellationToken::new())
            .await
    }

    fn value(result: ExecutionResult) -> Value {
        match result.data {
            ResultData::Value(value) => value,
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_use_switches_database_without_backend_call() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        let result = run(&dispatcher, &mut session, "use myNewDB").await.unwrap();
        assert_eq!(result.data, ResultData::Message("switched to db myNewDB".into()));
        assert_eq!(session.current_database(), "myNewDB");

        let err = run(&dispatcher, &mut session, "use my.db").await.unwrap_err();
        assert!(matches!(err, DocshError::InvalidName(_)));
        assert_eq!(session.current_database(), "myNewDB");
    }

    #[tokio::test]
    async fn test_insert_one_and_find() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();

        let reply = value(
            run(&dispatcher, &mut session, "db.inventory.insertOne({ item: 'canvas', qty: 100 })")
                .await
                .unwrap(),
        );
        let reply = reply.as_document().unwrap();
        assert_eq!(reply.get("acknowledged"), Some(&Value::Bool(true)));
        assert!(matches!(reply.get("insertedId"), Some(Value::ObjectId(_))));

        let found = run(&dispatcher, &mut session, "db.inventory.find({ item: 'canvas' })")
            .await
            .unwrap();
        assert_eq!(found.stats.documents_returned, 1);
        let docs = value(found);
        assert_eq!(docs.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_many_reports_ids_by_position() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        let result = run(
            &dispatcher,
            &mut session,
            "db.inventory.insertMany([\n { _id: 1, item: 'journal' },\
             \n { _id: 2, item: 'mat' }\n])",
        )
        .await
        .unwrap();
        assert_eq!(result.stats.documents_affected, Some(2));
        let reply = value(result);
        let ids = reply.as_document().unwrap().get("insertedIds").unwrap();
        assert_eq!(
            ids,
            &Value::Document(Document::new().with("0", 1).with("1", 2))
        );

        let err = run(&dispatcher, &mut session, "db.inventory.insertMany([])")
            .await
            .unwrap_err();
        assert!(matches!(err, DocshError::ArgumentShape(_)));
    }

    #[tokio::test]
    async fn test_find_modifiers() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        run(
            &dispatcher,
            &mut session,
            "db.nums.insert([{ n: 3 }, { n: 1 }, { n: 2 }, { n: 4 }])",
        )
        .await
        .unwrap();

        let query = "db.nums.find().sort({ n: -1 }).skip(1).limit(2).pretty()";
        let docs = value(run(&dispatcher, &mut session, query).await.unwrap());
        let ns: Vec<i64> = docs
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|d| d.as_document()?.get("n")?.as_i64())
            .collect();
        assert_eq!(ns, vec![3, 2]);

        let err = run(&dispatcher, &mut session, "db.nums.find().explain()")
            .await
            .unwrap_err();
        assert!(matches!(err, DocshError::UnknownCommand(_)));
    }

    #[tokio::test]
    async fn test_drop_collection() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        run(&dispatcher, &mut session, "db.students.insert({ name: 'Ada' })")
            .await
            .unwrap();

        let dropped = run(
            &dispatcher,
            &mut session,
            "db.students.drop({ writeConcern: { w: \"majority\" } })",
        )
        .await
        .unwrap();
        assert_eq!(value(dropped), Value::Bool(true));

        let again = run(&dispatcher, &mut session, "db.students.drop()").await.unwrap();
        assert_eq!(value(again), Value::Bool(false));

        let err = run(&dispatcher, &mut session, "db.students.drop(5)").await.unwrap_err();
        assert!(matches!(err, DocshError::ArgumentShape(_)));
    }

    #[tokio::test]
    async fn test_create_index_validates_directions() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        let created = run(&dispatcher, &mut session, "db.x.createIndex({ y: 1 })").await;
        let name = value(created.unwrap());
        assert_eq!(name, Value::from("y_1"));

        for bad in ["db.x.createIndex({ y: 2 })", "db.x.createIndex({ y: 'text' })"] {
            let err = run(&dispatcher, &mut session, bad).await.unwrap_err();
            assert!(matches!(err, DocshError::ArgumentShape(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_unknown_commands() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        for input in [
            "db.inventory.explode()",
            "db.fooBar()",
            "show widgets",
            "db.x.drop().limit(1)",
            "db.hostInfo().pretty()",
        ] {
            let err = run(&dispatcher, &mut session, input).await.unwrap_err();
            assert!(matches!(err, DocshError::UnknownCommand(_)), "{input}: {err}");
        }
    }

    #[tokio::test]
    async fn test_get_collection_and_dotted_names() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        run(&dispatcher, &mut session, "db.getCollection('a.b').insertOne({ v: 1 })")
            .await
            .unwrap();
        let docs = value(run(&dispatcher, &mut session, "db.a.b.find()").await.unwrap());
        assert_eq!(docs.as_array().unwrap().len(), 1);

        let names = value(run(&dispatcher, &mut session, "db.getCollectionNames()").await.unwrap());
        assert_eq!(names, Value::Array(vec![Value::from("a.b")]));

        let err = run(&dispatcher, &mut session, "db.getCollection('')").await.unwrap_err();
        assert!(matches!(err, DocshError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_capped_collection() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        run(
            &dispatcher,
            &mut session,
            "db.createCollection('log', { capped: true, size: 5242880, max: 5000 })",
        )
        .await
        .unwrap();
        let capped = value(run(&dispatcher, &mut session, "db.log.isCapped()").await.unwrap());
        assert_eq!(capped, Value::Bool(true));
        let capped = value(run(&dispatcher, &mut session, "db.other.isCapped()").await.unwrap());
        assert_eq!(capped, Value::Bool(false));
    }

    #[tokio::test]
    async fn test_create_user_and_show_users() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        run(&dispatcher, &mut session, "use reporting").await.unwrap();
        run(
            &dispatcher,
            &mut session,
            "db.createUser({ user: 'reportsUser', pwd: 'secret', roles: ['read'] })",
        )
        .await
        .unwrap();

        let users = value(run(&dispatcher, &mut session, "show users").await.unwrap());
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 1);
        let user = users[0].as_document().unwrap();
        assert_eq!(user.get("user"), Some(&Value::from("reportsUser")));
        assert!(!user.contains_key("pwd"));

        let err = run(&dispatcher, &mut session, "db.createUser({ pwd: 'x', roles: [] })")
            .await
            .unwrap_err();
        assert!(matches!(err, DocshError::ArgumentShape(_)));
    }

    #[tokio::test]
    async fn test_show_dbs_and_collections_render_as_text() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        run(&dispatcher, &mut session, "db.inventory.insertOne({ a: 1 })").await.unwrap();

        let dbs = run(&dispatcher, &mut session, "show dbs").await.unwrap();
        let ResultData::Message(text) = dbs.data else {
            panic!("expected message");
        };
        assert!(text.starts_with("test  "));
        assert!(text.ends_with(" B"));

        let collections = run(&dispatcher, &mut session, "show collections").await.unwrap();
        assert_eq!(collections.data, ResultData::Message("inventory".into()));

        let profile = run(&dispatcher, &mut session, "show profile").await.unwrap();
        assert_eq!(profile.data, ResultData::Message(EMPTY_PROFILE.into()));
    }

    #[tokio::test]
    async fn test_run_command_and_admin_verbs() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        let reply = value(run(&dispatcher, &mut session, "db.runCommand('ping')").await.unwrap());
        assert_eq!(reply.as_document().unwrap().get("ok").and_then(Value::as_f64), Some(1.0));

        let host = value(run(&dispatcher, &mut session, "db.hostInfo()").await.unwrap());
        assert!(host.as_document().unwrap().contains_key("system"));

        let err = run(&dispatcher, &mut session, "db.hostInfo(1)").await.unwrap_err();
        assert!(matches!(err, DocshError::ArgumentShape(_)));

        let err = run(&dispatcher, &mut session, "db.printReplicationInfo()")
            .await
            .unwrap_err();
        assert!(matches!(err, DocshError::Backend(_)));

        let name = value(run(&dispatcher, &mut session, "db.getName()").await.unwrap());
        assert_eq!(name, Value::from("test"));
    }

    #[tokio::test]
    async fn test_variables_and_value_methods() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        let bound = run(&dispatcher, &mut session, "var mydate1 = new Date('2014-03-02')")
            .await
            .unwrap();
        assert_eq!(bound.data, ResultData::None);

        let month = value(run(&dispatcher, &mut session, "mydate1.getMonth()").await.unwrap());
        assert_eq!(month, Value::Int(2));

        run(&dispatcher, &mut session, "var doc = { inner: { at: ISODate('2020-01-01') } }")
            .await
            .unwrap();
        let year = run(&dispatcher, &mut session, "doc.inner.at.getFullYear()").await;
        let year = value(year.unwrap());
        assert_eq!(year, Value::Int(2020));

        let err = run(&dispatcher, &mut session, "doc.missing.getFullYear()")
            .await
            .unwrap_err();
        assert!(matches!(err, DocshError::Name(_)));
    }

    #[tokio::test]
    async fn test_echo_statements() {
        let dispatcher = dispatcher();
        let mut session = SessionContext::new();
        let db = value(run(&dispatcher, &mut session, "db").await.unwrap());
        assert_eq!(db, Value::from("test"));
        let echoed = value(run(&dispatcher, &mut session, "NumberLong(5)").await.unwrap());
        assert_eq!(echoed, Value::Long(5));
    }

    #[tokio::test]
    async fn test_timeout_leaves_session_unchanged() {
        let backend = MemoryBackend::new().with_latency(Duration::from_millis(200));
        let dispatcher = Dispatcher::new(Arc::new(backend), Duration::from_millis(20));
        let mut session = SessionContext::with_database("myNewDB").unwrap();

        let err = run(&dispatcher, &mut session, "db.foo.find()").await.unwrap_err();
        assert!(matches!(err, DocshError::BackendTimeout(_)));
        assert_eq!(
            err.to_string(),
            "BackendTimeoutError: myNewDB.foo.find() did not complete within 20ms"
        );
        assert_eq!(session.current_database(), "myNewDB");
    }

    #[tokio::test]
    async fn test_interrupt_leaves_session_unchanged() {
        let backend = MemoryBackend::new().with_latency(Duration::from_secs(5));
        let dispatcher = Dispatcher::new(Arc::new(backend), Duration::from_secs(30));
        let mut session = SessionContext::with_database("myNewDB").unwrap();
        let statement = parse_statement("db.foo.find()", &session).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = dispatcher
            .dispatch(statement, &mut session, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DocshError::Interrupted));
        assert_eq!(session.current_database(), "myNewDB");
        assert!(session.variables().is_empty());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(40 * 1024), "40.00 KiB");
        assert_eq!(format_size(72 * 1024 * 1024), "72.00 MiB");
    }

    #[test]
    fn test_create_user_command_puts_user_first() {
        let command = create_user_command(
            "createUser",
            &[Value::Document(
                Document::new()
                    .with("user", "reportsUser")
                    .with("pwd", "12345678")
                    .with("roles", Vec::<Value>::new()),
            )],
        )
        .unwrap();
        let keys: Vec<&str> = command.keys().collect();
        assert_eq!(keys, vec!["createUser", "pwd", "roles"]);
    }
}
