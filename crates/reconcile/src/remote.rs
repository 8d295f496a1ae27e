//! Remote client seam.
//!
//! The reconciler talks to the backend only through [`RemoteClient`]:
//! four blocking verbs over JSON documents, each receiving the caller's
//! [`CancelToken`] so an implementation can abort in-flight I/O.
//!
//! # Testing
//!
//! Use [`MockRemote`] to exercise reconciliation without network access.
//! It keeps collections in memory and records every call:
//!
//! ```
//! use reconcile::{CancelToken, MockRemote, RemoteClient};
//! use reconcile::remote::Method;
//!
//! let mock = MockRemote::new();
//! let cancel = CancelToken::new();
//! let created = mock
//!     .post("/cloud/project/snowflake/role", &serde_json::json!({"name": "R"}), &cancel)
//!     .unwrap();
//! let id = created["id"].as_str().unwrap();
//!
//! let doc = mock.get(&format!("/cloud/project/snowflake/role/{id}"), &cancel).unwrap();
//! assert_eq!(doc["name"], "R");
//! assert_eq!(mock.calls_for(Method::Post).len(), 1);
//! ```

use crate::context::CancelToken;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Failure reported by a remote client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The addressed document does not exist
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The client aborted the call because the token fired
    #[error("request cancelled")]
    Cancelled,
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Blocking JSON client for the backend API.
///
/// Paths are absolute API paths such as `/cloud/project/snowflake/warehouse/{id}`.
/// Implementations must map a missing document to [`RemoteError::NotFound`].
pub trait RemoteClient: Send + Sync {
    /// Fetch a document or a collection.
    fn get(&self, path: &str, cancel: &CancelToken) -> RemoteResult<Value>;

    /// Create a document in a collection; the response carries its `id`.
    fn post(&self, path: &str, body: &Value, cancel: &CancelToken) -> RemoteResult<Value>;

    /// Modify the fields present in `body`.
    fn put(&self, path: &str, body: &Value, cancel: &CancelToken) -> RemoteResult<()>;

    /// Remove a document.
    fn delete(&self, path: &str, cancel: &CancelToken) -> RemoteResult<()>;
}

/// HTTP verb of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{verb}")
    }
}

/// One call observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

type Document = Map<String, Value>;

#[derive(Debug, Default)]
struct MockState {
    collections: BTreeMap<String, BTreeMap<String, Document>>,
    server_fields: BTreeMap<String, Document>,
    hidden_fields: BTreeMap<String, Vec<String>>,
    failures: VecDeque<(Method, RemoteError)>,
    cancel_during: Option<Method>,
    omit_identity: bool,
    next_id: u64,
    calls: Vec<Call>,
}

impl MockState {
    fn visible(&self, collection: &str, doc: &Document) -> Value {
        let mut doc = doc.clone();
        if let Some(hidden) = self.hidden_fields.get(collection) {
            for field in hidden {
                doc.remove(field);
            }
        }
        Value::Object(doc)
    }

    fn locate<'p>(&self, path: &'p str) -> Option<(&'p str, &'p str)> {
        let (collection, id) = path.rsplit_once('/')?;
        self.collections
            .get(collection)?
            .contains_key(id)
            .then_some((collection, id))
    }

    fn fetch(&self, path: &str) -> RemoteResult<Value> {
        if let Some(items) = self.collections.get(path) {
            return Ok(Value::Array(
                items.values().map(|doc| self.visible(path, doc)).collect(),
            ));
        }
        let (collection, id) = self.locate(path).ok_or_else(|| not_found(path))?;
        Ok(self.visible(collection, &self.collections[collection][id]))
    }

    fn create(&mut self, path: &str, body: &Value) -> RemoteResult<Value> {
        let Value::Object(fields) = body else {
            return Err(RemoteError::Status {
                status: 400,
                message: "request body must be an object".to_string(),
            });
        };

        self.next_id += 1;
        let prefix = path.rsplit('/').next().unwrap_or("doc");
        let id = format!("{prefix}-{}", self.next_id);

        let mut doc = fields.clone();
        if let Some(extra) = self.server_fields.get(path) {
            for (key, value) in extra {
                doc.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        doc.insert("id".to_string(), Value::String(id.clone()));
        self.collections
            .entry(path.to_string())
            .or_default()
            .insert(id.clone(), doc);

        if self.omit_identity {
            Ok(Value::Object(Map::new()))
        } else {
            Ok(serde_json::json!({ "id": id }))
        }
    }

    fn modify(&mut self, path: &str, body: &Value) -> RemoteResult<()> {
        let (collection, id) = self.locate(path).ok_or_else(|| not_found(path))?;
        let doc = self
            .collections
            .get_mut(collection)
            .and_then(|items| items.get_mut(id))
            .ok_or_else(|| not_found(path))?;
        if let Value::Object(fields) = body {
            for (key, value) in fields {
                doc.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn remove(&mut self, path: &str) -> RemoteResult<()> {
        let (collection, id) = path.rsplit_once('/').ok_or_else(|| not_found(path))?;
        self.collections
            .get_mut(collection)
            .and_then(|items| items.remove(id))
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &str) -> RemoteError {
    RemoteError::NotFound {
        path: path.to_string(),
    }
}

/// In-memory backend for tests.
///
/// Documents live in collections keyed by path. `post` assigns identities of
/// the form `{last-path-segment}-{n}`, `get` on a collection path returns an
/// array, and every call is recorded in order.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a document directly, without recording a call.
    pub fn insert(&self, collection: &str, id: &str, doc: Value) {
        let mut fields = match doc {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.insert("id".to_string(), Value::String(id.to_string()));
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Make `collection` exist even while empty.
    pub fn ensure_collection(&self, collection: &str) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default();
    }

    /// Stored document, including hidden fields.
    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.lock()
            .collections
            .get(collection)?
            .get(id)
            .cloned()
            .map(Value::Object)
    }

    /// Fields the server adds to every document created in `collection`.
    pub fn set_server_fields(&self, collection: &str, fields: Value) {
        if let Value::Object(fields) = fields {
            self.lock()
                .server_fields
                .insert(collection.to_string(), fields);
        }
    }

    /// Fields accepted on write but never returned by `get` (secrets).
    pub fn hide_fields(&self, collection: &str, fields: &[&str]) {
        self.lock().hidden_fields.insert(
            collection.to_string(),
            fields.iter().map(ToString::to_string).collect(),
        );
    }

    /// Fail the next call with `method`.
    pub fn fail_next(&self, method: Method, error: RemoteError) {
        self.lock().failures.push_back((method, error));
    }

    /// Cancel the caller's token while serving the next `method` call.
    ///
    /// The call itself still completes, simulating a cancellation that
    /// arrives while the request is in flight.
    pub fn cancel_during(&self, method: Method) {
        self.lock().cancel_during = Some(method);
    }

    /// Answer creates with an empty document instead of `{"id": ...}`.
    pub fn omit_identity(&self) {
        self.lock().omit_identity = true;
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded calls with `method`.
    pub fn calls_for(&self, method: Method) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn enter(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        cancel: &CancelToken,
    ) -> RemoteResult<MutexGuard<'_, MockState>> {
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        let mut state = self.lock();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        if state.failures.front().is_some_and(|(m, _)| *m == method) {
            if let Some((_, error)) = state.failures.pop_front() {
                return Err(error);
            }
        }
        Ok(state)
    }

    fn leave(state: &mut MockState, method: Method, cancel: &CancelToken) {
        if state.cancel_during == Some(method) {
            state.cancel_during = None;
            cancel.cancel();
        }
    }
}

impl RemoteClient for MockRemote {
    fn get(&self, path: &str, cancel: &CancelToken) -> RemoteResult<Value> {
        let mut state = self.enter(Method::Get, path, None, cancel)?;
        let result = state.fetch(path);
        Self::leave(&mut state, Method::Get, cancel);
        result
    }

    fn post(&self, path: &str, body: &Value, cancel: &CancelToken) -> RemoteResult<Value> {
        let mut state = self.enter(Method::Post, path, Some(body), cancel)?;
        let result = state.create(path, body);
        Self::leave(&mut state, Method::Post, cancel);
        result
    }

    fn put(&self, path: &str, body: &Value, cancel: &CancelToken) -> RemoteResult<()> {
        let mut state = self.enter(Method::Put, path, Some(body), cancel)?;
        let result = state.modify(path, body);
        Self::leave(&mut state, Method::Put, cancel);
        result
    }

    fn delete(&self, path: &str, cancel: &CancelToken) -> RemoteResult<()> {
        let mut state = self.enter(Method::Delete, path, None, cancel)?;
        let result = state.remove(path);
        Self::leave(&mut state, Method::Delete, cancel);
        result
    }
}
