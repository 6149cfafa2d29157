use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::GraphResult;
use crate::path;
use crate::subscription::Subscription;

/// Path-addressable replicated graph store.
///
/// Implementations must satisfy these rules:
/// - A write overwrites exactly one path; there are no multi-path
///   transactions.
/// - `Value::Null` is a tombstone. Reads treat it as absent; subscriptions
///   deliver it so consumers can retract.
/// - Subscriptions replay current children before live updates and may
///   deliver the same update more than once.
/// - Nothing here blocks a thread waiting on replication.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// One-shot read. Returns `Ok(None)` for missing or tombstoned paths.
    async fn get(&self, path: &str) -> GraphResult<Option<Value>>;

    /// Overwrite the value at `path`.
    async fn put(&self, path: &str, value: Value) -> GraphResult<()>;

    /// One-shot read of a node's live children, in arrival order.
    async fn children(&self, path: &str) -> GraphResult<Vec<(String, Value)>>;

    /// Live subscription to a node's children.
    fn on(&self, path: &str) -> GraphResult<Subscription>;

    /// Append `value` to the set at `path` under a fresh, time-ordered key.
    async fn set(&self, path: &str, value: Value) -> GraphResult<String> {
        let key = Uuid::now_v7().to_string();
        self.put(&path::join(path, &key), value).await?;
        Ok(key)
    }

    /// Tombstone the value at `path`.
    async fn remove(&self, path: &str) -> GraphResult<()> {
        self.put(path, Value::Null).await
    }
}
