//! Key-addressed document storage boundary.
//!
//! The persistent store is an external collaborator; the engines only see
//! this trait. Paths are `/`-separated (`events/{id}`, `users/{username}`)
//! and documents are JSON trees. [`MemoryStore`] is the in-process
//! implementation used by the standalone binary and the test suite; a
//! networked store is a second implementation of the same trait.

pub mod memory;

pub use memory::MemoryStore;

use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Errors that can occur when working with the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A transaction kept colliding with concurrent writes
    #[error("Transaction on '{path}' aborted after {attempts} conflicting attempts")]
    Conflict { path: String, attempts: u32 },

    /// Malformed path (empty, or empty segment)
    #[error("Invalid document path: '{0}'")]
    InvalidPath(String),

    /// Backend failure (network, I/O)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Decision returned by a transaction callback.
///
/// The callback sees the current document (`None` if absent) and either
/// commits a replacement or aborts, leaving the document untouched.
#[derive(Debug, Clone)]
pub enum TxDecision {
    Commit(Value),
    Abort,
}

/// Result of a transaction: whether it committed, and the document as last
/// observed (the committed value, or the value that caused the abort).
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub committed: bool,
    pub value: Option<Value>,
}

/// Key-addressed document storage with atomic multi-path writes and a
/// single-document optimistic read-modify-write transaction.
pub trait DocumentStore: Send + Sync + 'static {
    /// Point read. `None` if nothing is stored at the path.
    fn get(&self, path: &str) -> impl Future<Output = StoreResult<Option<Value>>> + Send;

    /// Full overwrite at a path. Writing `Value::Null` removes the node.
    fn set(&self, path: &str, value: Value) -> impl Future<Output = StoreResult<()>> + Send;

    /// Apply several absolute-path writes as one atomic batch.
    fn update(&self, writes: Vec<(String, Value)>) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove the node at a path (no-op if absent).
    fn remove(&self, path: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Optimistic read-modify-write on a single document.
    ///
    /// The callback may run several times: it is re-invoked with a fresh
    /// read whenever a concurrent write invalidates the previous one. The
    /// store gives up with [`StoreError::Conflict`] after a bounded number
    /// of collisions.
    fn transaction<F>(&self, path: &str, f: F) -> impl Future<Output = StoreResult<TxOutcome>> + Send
    where
        F: FnMut(Option<Value>) -> TxDecision + Send;

    /// Generate a fresh collision-resistant child id without writing.
    ///
    /// Ids are lexicographically increasing per store instance, so sorted
    /// key order under a path is insertion order.
    fn push_id(&self) -> String;

    /// Children of `path` whose `field` equals `equals`, as (key, document)
    /// pairs.
    fn query(
        &self,
        path: &str,
        field: &str,
        equals: &Value,
    ) -> impl Future<Output = StoreResult<Vec<(String, Value)>>> + Send;
}
