//! In-memory document store.
//!
//! Holds one JSON tree behind an `RwLock`. Conflict detection for
//! transactions is store-wide: a single mutation counter is compared between
//! the transaction's read and its commit, so any intervening write forces a
//! re-read. Coarser than a per-document version, which only costs spurious
//! retries in a process-local store.

use super::{DocumentStore, StoreError, StoreResult, TxDecision, TxOutcome};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

const DEFAULT_MAX_TX_ATTEMPTS: u32 = 25;

pub struct MemoryStore {
    root: RwLock<Value>,
    version: AtomicU64,
    push_counter: AtomicU64,
    max_tx_attempts: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_tx_attempts(DEFAULT_MAX_TX_ATTEMPTS)
    }

    pub fn with_max_tx_attempts(max_tx_attempts: u32) -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            version: AtomicU64::new(0),
            push_counter: AtomicU64::new(0),
            max_tx_attempts: max_tx_attempts.max(1),
        }
    }

    fn read_at(&self, segments: &[&str]) -> StoreResult<(u64, Option<Value>)> {
        let root = self
            .root
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        let seen = self.version.load(Ordering::SeqCst);
        Ok((seen, node_at(&root, segments).cloned()))
    }
}

fn split_path(path: &str) -> StoreResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn node_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(*segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Write `value` at the path, creating intermediate objects. A null value
/// removes the node instead.
fn write_at(root: &mut Value, segments: &[&str], value: Value) {
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let map = node.as_object_mut().expect("object ensured above");
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let map = node.as_object_mut().expect("object ensured above");
    if value.is_null() {
        map.remove(*last);
    } else {
        map.insert(last.to_string(), value);
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        let segments = split_path(path)?;
        let (_, value) = self.read_at(&segments)?;
        Ok(value)
    }

    async fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        self.update(vec![(path.to_string(), value)]).await
    }

    async fn update(&self, writes: Vec<(String, Value)>) -> StoreResult<()> {
        // Validate every path before touching the tree so the batch is
        // all-or-nothing even on bad input.
        let mut parsed = Vec::with_capacity(writes.len());
        for (path, value) in &writes {
            parsed.push((split_path(path)?, value));
        }

        let mut root = self
            .root
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        for (segments, value) in parsed {
            write_at(&mut root, &segments, value.clone());
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, path: &str) -> StoreResult<()> {
        self.set(path, Value::Null).await
    }

    async fn transaction<F>(&self, path: &str, mut f: F) -> StoreResult<TxOutcome>
    where
        F: FnMut(Option<Value>) -> TxDecision + Send,
    {
        let segments = split_path(path)?;

        for _ in 0..self.max_tx_attempts {
            let (seen_version, current) = self.read_at(&segments)?;

            match f(current.clone()) {
                TxDecision::Abort => {
                    return Ok(TxOutcome {
                        committed: false,
                        value: current,
                    })
                }
                TxDecision::Commit(next) => {
                    let mut root = self
                        .root
                        .write()
                        .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
                    if self.version.load(Ordering::SeqCst) != seen_version {
                        // Someone wrote since our read; re-run the callback
                        // against a fresh snapshot.
                        continue;
                    }
                    write_at(&mut root, &segments, next.clone());
                    self.version.fetch_add(1, Ordering::SeqCst);
                    return Ok(TxOutcome {
                        committed: true,
                        value: Some(next),
                    });
                }
            }
        }

        Err(StoreError::Conflict {
            path: path.to_string(),
            attempts: self.max_tx_attempts,
        })
    }

    fn push_id(&self) -> String {
        let counter = self.push_counter.fetch_add(1, Ordering::SeqCst);
        let tail = Uuid::new_v4().simple().to_string();
        // Zero-padded counter prefix keeps ids lexicographically ordered;
        // the UUID tail keeps them collision-resistant across instances.
        format!("{:016x}-{}", counter, &tail[..8])
    }

    async fn query(&self, path: &str, field: &str, equals: &Value) -> StoreResult<Vec<(String, Value)>> {
        let segments = split_path(path)?;
        let (_, node) = self.read_at(&segments)?;

        let mut matches = Vec::new();
        if let Some(Value::Object(children)) = node {
            for (key, child) in children {
                if child.get(field) == Some(equals) {
                    matches.push((key, child));
                }
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn get_of_missing_path_is_none() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            assert!(store.get("events/none").await.unwrap().is_none());
        });
    }

    #[test]
    fn set_then_get_roundtrips() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .set("users/alice", json!({"username": "alice", "xp": 5}))
                .await
                .unwrap();
            let doc = store.get("users/alice").await.unwrap().unwrap();
            assert_eq!(doc["xp"], json!(5));
            assert_eq!(store.get("users/alice/xp").await.unwrap(), Some(json!(5)));
        });
    }

    #[test]
    fn null_write_removes_node() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.set("events/e1/name", json!("launch")).await.unwrap();
            store.remove("events/e1/name").await.unwrap();
            assert!(store.get("events/e1/name").await.unwrap().is_none());
        });
    }

    #[test]
    fn update_applies_all_paths_atomically() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .update(vec![
                    ("events/e1/winners".to_string(), json!(["u1"])),
                    ("events/e1/assignedCodes/u1".to_string(), json!("CODE-A")),
                ])
                .await
                .unwrap();
            let doc = store.get("events/e1").await.unwrap().unwrap();
            assert_eq!(doc["winners"], json!(["u1"]));
            assert_eq!(doc["assignedCodes"]["u1"], json!("CODE-A"));
        });
    }

    #[test]
    fn invalid_path_is_rejected() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let err = store.get("events//oops").await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath(_)));
        });
    }

    #[test]
    fn push_ids_are_unique_and_ordered() {
        let store = MemoryStore::new();
        let ids: Vec<String> = (0..64).map(|_| store.push_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), 64);
    }

    #[test]
    fn transaction_abort_leaves_document_untouched() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.set("users/bob/xp", json!(3)).await.unwrap();
            let outcome = store
                .transaction("users/bob", |_| TxDecision::Abort)
                .await
                .unwrap();
            assert!(!outcome.committed);
            assert_eq!(store.get("users/bob/xp").await.unwrap(), Some(json!(3)));
        });
    }

    #[test]
    fn transaction_retries_on_conflicting_write() {
        tokio_test::block_on(async {
            let store = Arc::new(MemoryStore::new());
            store.set("counters/a", json!(0)).await.unwrap();

            let barrier = Arc::new(std::sync::Barrier::new(2));
            let writer_store = store.clone();
            let writer_barrier = barrier.clone();
            let writer = std::thread::spawn(move || {
                writer_barrier.wait(); // transaction has taken its first read
                futures::executor::block_on(writer_store.set("counters/a", json!(10))).unwrap();
                writer_barrier.wait(); // let the transaction try to commit
            });

            let mut attempts = 0;
            let outcome = store
                .transaction("counters/a", |current| {
                    attempts += 1;
                    if attempts == 1 {
                        barrier.wait();
                        barrier.wait();
                    }
                    let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                    TxDecision::Commit(json!(n + 1))
                })
                .await
                .unwrap();
            writer.join().unwrap();

            assert!(outcome.committed);
            assert!(attempts >= 2, "first attempt must have been invalidated");
            assert_eq!(outcome.value, Some(json!(11)));
        });
    }

    #[test]
    fn transaction_gives_up_after_bounded_attempts() {
        tokio_test::block_on(async {
            let store = Arc::new(MemoryStore::with_max_tx_attempts(3));
            store.set("counters/a", json!(0)).await.unwrap();

            // Every attempt is invalidated by a write made from the callback
            // through a second handle.
            let saboteur = store.clone();
            let err = store
                .transaction("counters/a", move |current| {
                    futures::executor::block_on(saboteur.set("counters/noise", json!(1))).unwrap();
                    let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                    TxDecision::Commit(json!(n + 1))
                })
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Conflict { attempts: 3, .. }));
        });
    }

    #[test]
    fn query_matches_on_field_equality() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .update(vec![
                    (
                        "quizzes/q1/submissions/s1".to_string(),
                        json!({"username": "alice", "submittedAt": 1}),
                    ),
                    (
                        "quizzes/q1/submissions/s2".to_string(),
                        json!({"username": "bob", "submittedAt": 2}),
                    ),
                ])
                .await
                .unwrap();

            let hits = store
                .query("quizzes/q1/submissions", "username", &json!("bob"))
                .await
                .unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].0, "s2");

            let none = store
                .query("quizzes/q1/submissions", "username", &json!("carol"))
                .await
                .unwrap();
            assert!(none.is_empty());
        });
    }
}
