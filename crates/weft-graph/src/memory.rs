use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::GraphResult;
use crate::path;
use crate::router::Router;
use crate::snapshot::{GraphSnapshot, SnapshotEntry};
use crate::subscription::{NodeUpdate, Subscription};
use crate::traits::GraphStore;

/// A stored child value with its arrival sequence number.
#[derive(Clone, Debug)]
struct Slot {
    value: Value,
    seq: u64,
}

/// In-process graph replica.
///
/// Nodes live in a `HashMap` from node path to its children behind a
/// `RwLock`. Every write gets a sequence number so children can be listed in
/// arrival order. Besides the [`GraphStore`] contract it offers snapshot
/// persistence and fault simulation for lost writes and redelivery.
pub struct InMemoryGraph {
    nodes: RwLock<HashMap<String, BTreeMap<String, Slot>>>,
    seq: AtomicU64,
    router: Router,
    lost_prefixes: RwLock<Vec<String>>,
}

impl InMemoryGraph {
    /// Create a new empty replica.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
            router: Router::new(),
            lost_prefixes: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored values, tombstones included.
    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.router.subscriber_count()
    }

    /// Silently discard every later write under `prefix`, as if it were lost
    /// in a partition. Readers still see what was written before.
    pub fn drop_writes_under(&self, prefix: impl Into<String>) {
        self.lost_prefixes
            .write()
            .expect("lock poisoned")
            .push(prefix.into());
    }

    /// Stop discarding writes.
    pub fn heal(&self) {
        self.lost_prefixes.write().expect("lock poisoned").clear();
    }

    /// Deliver every current child of `node` to its subscribers again.
    pub fn redeliver(&self, node: &str) {
        let updates: Vec<NodeUpdate> = {
            let nodes = self.nodes.read().expect("lock poisoned");
            ordered(nodes.get(node))
                .into_iter()
                .map(|(key, value)| NodeUpdate {
                    path: node.to_string(),
                    key,
                    value: Some(value),
                })
                .collect()
        };
        for update in &updates {
            self.router.route(update);
        }
    }

    /// Capture every stored value, tombstones included, in arrival order.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self.nodes.read().expect("lock poisoned");
        let mut entries: Vec<(u64, SnapshotEntry)> = nodes
            .iter()
            .flat_map(|(node, children)| {
                children.iter().map(move |(key, slot)| {
                    (
                        slot.seq,
                        SnapshotEntry {
                            path: path::join(node, key),
                            value: slot.value.clone(),
                        },
                    )
                })
            })
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        GraphSnapshot {
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
        }
    }

    /// Build a replica from a snapshot, preserving arrival order.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let graph = Self::new();
        for entry in snapshot.entries {
            graph.write(&entry.path, entry.value)?;
        }
        Ok(graph)
    }

    /// Persist a snapshot to `file`.
    pub fn save(&self, file: &Path) -> GraphResult<()> {
        self.snapshot().save(file)
    }

    /// Load a replica from `file`, or start empty if it does not exist.
    pub fn load(file: &Path) -> GraphResult<Self> {
        if !file.exists() {
            debug!(file = %file.display(), "no snapshot, starting empty");
            return Ok(Self::new());
        }
        Self::from_snapshot(GraphSnapshot::load(file)?)
    }

    fn is_lost(&self, path: &str) -> bool {
        self.lost_prefixes
            .read()
            .expect("lock poisoned")
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn write(&self, full_path: &str, value: Value) -> GraphResult<()> {
        let (node, key) = path::split(full_path)?;
        if self.is_lost(full_path) {
            debug!(path = %full_path, "write lost");
            return Ok(());
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let update = NodeUpdate {
            path: node.to_string(),
            key: key.to_string(),
            value: (!value.is_null()).then(|| value.clone()),
        };
        {
            let mut nodes = self.nodes.write().expect("lock poisoned");
            nodes
                .entry(node.to_string())
                .or_default()
                .insert(key.to_string(), Slot { value, seq });
        }
        self.router.route(&update);
        Ok(())
    }
}

/// Live children of a node, in arrival order.
fn ordered(children: Option<&BTreeMap<String, Slot>>) -> Vec<(String, Value)> {
    let Some(children) = children else {
        return Vec::new();
    };
    let mut live: Vec<(&String, &Slot)> = children
        .iter()
        .filter(|(_, slot)| !slot.value.is_null())
        .collect();
    live.sort_by_key(|(_, slot)| slot.seq);
    live.into_iter()
        .map(|(key, slot)| (key.clone(), slot.value.clone()))
        .collect()
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn get(&self, full_path: &str) -> GraphResult<Option<Value>> {
        let (node, key) = path::split(full_path)?;
        let nodes = self.nodes.read().expect("lock poisoned");
        Ok(nodes
            .get(node)
            .and_then(|children| children.get(key))
            .filter(|slot| !slot.value.is_null())
            .map(|slot| slot.value.clone()))
    }

    async fn put(&self, full_path: &str, value: Value) -> GraphResult<()> {
        debug!(path = %full_path, tombstone = value.is_null(), "put");
        self.write(full_path, value)
    }

    async fn children(&self, node: &str) -> GraphResult<Vec<(String, Value)>> {
        path::validate(node)?;
        let nodes = self.nodes.read().expect("lock poisoned");
        Ok(ordered(nodes.get(node)))
    }

    fn on(&self, node: &str) -> GraphResult<Subscription> {
        path::validate(node)?;
        let (tx, rx) = mpsc::unbounded_channel();
        // Replay and register under the read lock so no write falls between.
        let nodes = self.nodes.read().expect("lock poisoned");
        for (key, value) in ordered(nodes.get(node)) {
            // The receiver is still in scope, so this cannot fail.
            let _ = tx.send(NodeUpdate {
                path: node.to_string(),
                key,
                value: Some(value),
            });
        }
        self.router.register(node, tx);
        drop(nodes);
        Ok(Subscription::new(node, rx))
    }
}

impl std::fmt::Debug for InMemoryGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraph")
            .field("value_count", &self.len())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Core reads and writes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_get() {
        let graph = InMemoryGraph::new();
        graph.put("users/a/profile", json!({"name": "a"})).await.unwrap();
        let value = graph.get("users/a/profile").await.unwrap();
        assert_eq!(value, Some(json!({"name": "a"})));
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let graph = InMemoryGraph::new();
        assert_eq!(graph.get("nothing/here").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let graph = InMemoryGraph::new();
        graph.put("a/b", json!(1)).await.unwrap();
        graph.put("a/b", json!(2)).await.unwrap();
        assert_eq!(graph.get("a/b").await.unwrap(), Some(json!(2)));
        assert_eq!(graph.len(), 1);
    }

    #[tokio::test]
    async fn remove_tombstones() {
        let graph = InMemoryGraph::new();
        graph.put("a/b", json!(true)).await.unwrap();
        graph.remove("a/b").await.unwrap();
        assert_eq!(graph.get("a/b").await.unwrap(), None);
        // The tombstone itself is kept.
        assert_eq!(graph.len(), 1);
    }

    #[tokio::test]
    async fn children_in_arrival_order_without_tombstones() {
        let graph = InMemoryGraph::new();
        graph.put("set/zeta", json!(1)).await.unwrap();
        graph.put("set/alpha", json!(2)).await.unwrap();
        graph.put("set/mid", json!(3)).await.unwrap();
        graph.remove("set/alpha").await.unwrap();

        let keys: Vec<String> = graph
            .children("set")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["zeta", "mid"]);
    }

    #[tokio::test]
    async fn set_appends_under_fresh_keys() {
        let graph = InMemoryGraph::new();
        let k1 = graph.set("log", json!("first")).await.unwrap();
        let k2 = graph.set("log", json!("second")).await.unwrap();
        assert_ne!(k1, k2);
        let children = graph.children("log").await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], (k1, json!("first")));
    }

    #[tokio::test]
    async fn invalid_paths_are_rejected() {
        let graph = InMemoryGraph::new();
        assert!(graph.put("", json!(1)).await.is_err());
        assert!(graph.put("single", json!(1)).await.is_err());
        assert!(graph.get("a//b").await.is_err());
        assert!(graph.on("").is_err());
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn on_replays_then_streams() {
        let graph = InMemoryGraph::new();
        graph.put("feed/one", json!(1)).await.unwrap();

        let mut sub = graph.on("feed").unwrap();
        graph.put("feed/two", json!(2)).await.unwrap();
        graph.put("other/three", json!(3)).await.unwrap();

        assert_eq!(sub.next().await.unwrap().key, "one");
        assert_eq!(sub.next().await.unwrap().key, "two");
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn on_delivers_tombstones_live() {
        let graph = InMemoryGraph::new();
        graph.put("likes/u1", json!(true)).await.unwrap();
        let mut sub = graph.on("likes").unwrap();
        graph.remove("likes/u1").await.unwrap();

        assert!(!sub.next().await.unwrap().is_tombstone());
        let update = sub.next().await.unwrap();
        assert_eq!(update.key, "u1");
        assert!(update.is_tombstone());
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let graph = InMemoryGraph::new();
        let sub = graph.on("feed").unwrap();
        assert_eq!(graph.subscriber_count(), 1);
        sub.cancel();
        graph.put("feed/x", json!(1)).await.unwrap();
        assert_eq!(graph.subscriber_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Fault simulation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn lost_writes_until_healed() {
        let graph = InMemoryGraph::new();
        graph.drop_writes_under("users/");
        graph.put("users/a/posts/p", json!(1)).await.unwrap();
        graph.put("posts/p/author", json!("a")).await.unwrap();
        assert_eq!(graph.get("users/a/posts/p").await.unwrap(), None);
        assert!(graph.get("posts/p/author").await.unwrap().is_some());

        graph.heal();
        graph.put("users/a/posts/p", json!(1)).await.unwrap();
        assert!(graph.get("users/a/posts/p").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn redeliver_duplicates_updates() {
        let graph = InMemoryGraph::new();
        graph.put("feed/one", json!(1)).await.unwrap();
        let mut sub = graph.on("feed").unwrap();
        graph.redeliver("feed");

        assert_eq!(sub.next().await.unwrap().key, "one");
        assert_eq!(sub.next().await.unwrap().key, "one");
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn snapshot_preserves_values_order_and_tombstones() {
        let graph = InMemoryGraph::new();
        graph.put("set/b", json!(1)).await.unwrap();
        graph.put("set/a", json!(2)).await.unwrap();
        graph.put("gone/x", json!(3)).await.unwrap();
        graph.remove("gone/x").await.unwrap();

        let restored = InMemoryGraph::from_snapshot(graph.snapshot()).unwrap();
        let keys: Vec<String> = restored
            .children("set")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(restored.get("gone/x").await.unwrap(), None);
        assert_eq!(restored.len(), 3);
    }

    #[tokio::test]
    async fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("replica.json");

        let graph = InMemoryGraph::new();
        graph.put("users/a/profile", json!({"n": 1})).await.unwrap();
        graph.save(&file).unwrap();

        let loaded = InMemoryGraph::load(&file).unwrap();
        assert_eq!(
            loaded.get("users/a/profile").await.unwrap(),
            Some(json!({"n": 1}))
        );
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let graph = InMemoryGraph::load(&dir.path().join("absent.json")).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn debug_format() {
        let graph = InMemoryGraph::new();
        let debug = format!("{graph:?}");
        assert!(debug.contains("InMemoryGraph"));
        assert!(debug.contains("value_count"));
    }
}
