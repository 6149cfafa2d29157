use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use weft_graph::{GraphStore, SubscriptionHandle};
use weft_types::{layout, PostId};

use crate::edge::{Edge, EdgeKind, Found};
use crate::error::{RefError, RefResult};

/// Tuning for the reference index.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// How long a read waits before treating silence as absence.
    pub wait: Duration,
    /// Re-issue missing edge halves when a read notices them.
    pub read_repair: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(4000),
            read_repair: true,
        }
    }
}

/// Writes and walks bidirectional edges over a [`GraphStore`].
///
/// Cloning is cheap; clones share the store.
#[derive(Clone)]
pub struct ReferenceIndex {
    pub(crate) graph: Arc<dyn GraphStore>,
    pub(crate) config: IndexConfig,
}

impl ReferenceIndex {
    pub fn new(graph: Arc<dyn GraphStore>, config: IndexConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Write both halves of `edge`.
    ///
    /// The halves are independent writes. If the second one fails the first
    /// stays in place and the error is returned; a later read repairs it.
    pub async fn link(&self, edge: &Edge) -> RefResult<()> {
        self.graph
            .put(&edge.forward_path(), edge.forward_value()?)
            .await?;
        if let Err(e) = self
            .graph
            .put(&edge.backward_path(), edge.backward_value()?)
            .await
        {
            warn!(%edge, error = %e, "back-edge write failed, left one-sided");
            return Err(e.into());
        }
        if let Edge::Tagging { tag, .. } = edge {
            self.graph
                .put(&layout::tag_name(&tag.slug), Value::String(tag.name.clone()))
                .await?;
        }
        debug!(%edge, "linked");
        Ok(())
    }

    /// Tombstone both halves of `edge`.
    pub async fn unlink(&self, edge: &Edge) -> RefResult<()> {
        self.graph.remove(&edge.forward_path()).await?;
        if let Err(e) = self.graph.remove(&edge.backward_path()).await {
            warn!(%edge, error = %e, "back-edge removal failed, left one-sided");
            return Err(e.into());
        }
        debug!(%edge, "unlinked");
        Ok(())
    }

    /// Walk `kind` from `anchor`, calling `on_found` once per distinct target.
    ///
    /// Targets already stored are delivered first (a user's posts oldest
    /// first), then live arrivals. Tombstones are skipped. With read-repair
    /// on, a backward walk also derives its edges from the payload: targets
    /// the index lost are delivered, and every edge of a live post gets its
    /// missing halves re-issued, forward ones included. The walk runs until
    /// the returned handle is cancelled or dropped.
    pub fn traverse<F>(
        &self,
        kind: EdgeKind,
        anchor: &str,
        on_found: F,
    ) -> RefResult<SubscriptionHandle>
    where
        F: FnMut(Found) + Send + 'static,
    {
        check_anchor(anchor)?;
        let node = kind.node(anchor);
        // Subscribe before the snapshot so nothing written in between is missed.
        let mut sub = self.graph.on(&node)?;
        let index = self.clone();
        let anchor = anchor.to_string();

        let task = tokio::spawn(async move {
            let mut sink = Dedupe::new(on_found);
            match index.graph.children(&node).await {
                Ok(children) => {
                    for (key, value) in kind.order(children) {
                        sink.offer(kind, key, value);
                    }
                }
                Err(e) => warn!(node = %node, error = %e, "traversal snapshot failed"),
            }
            if kind.is_backward() && index.config.read_repair {
                match index.repaired(kind, &anchor).await {
                    Ok(found) => found.into_iter().for_each(|f| sink.deliver(f)),
                    Err(e) => debug!(node = %node, error = %e, "traversal repair failed"),
                }
            }
            while let Some(update) = sub.next().await {
                if let Some(value) = update.value {
                    sink.offer(kind, update.key, value);
                }
            }
        });
        Ok(SubscriptionHandle::new(task))
    }

    /// Like [`traverse`](Self::traverse), but delivers into a channel.
    pub fn traverse_stream(
        &self,
        kind: EdgeKind,
        anchor: &str,
    ) -> RefResult<(mpsc::UnboundedReceiver<Found>, SubscriptionHandle)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.traverse(kind, anchor, move |found| {
            let _ = tx.send(found);
        })?;
        Ok((rx, handle))
    }

    /// Derive the targets of a backward walk from the payload, healing the
    /// post's edges on the way.
    ///
    /// Author and parent come from the payload whether or not the post is
    /// live. Tags only do for a live post; a deleted post has none.
    async fn repaired(&self, kind: EdgeKind, anchor: &str) -> RefResult<Vec<Found>> {
        let post = PostId::from_hex(anchor)?;
        let Some(payload) = self.payload(&post).await? else {
            return Ok(Vec::new());
        };
        let live = self.is_live(&post).await?;
        if live {
            self.heal_post(&payload).await?;
        }
        let found = match kind {
            EdgeKind::PostAuthor => vec![hex_found(payload.author_pub.to_hex())],
            EdgeKind::ReplyParent => payload
                .reply_to
                .map(|parent| hex_found(parent.to_hex()))
                .into_iter()
                .collect(),
            EdgeKind::PostTags if live => payload
                .tags()
                .into_iter()
                .filter_map(|tag| {
                    let value = serde_json::to_value(&tag).ok()?;
                    Some(Found {
                        target: tag.slug.to_string(),
                        value,
                    })
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(found)
    }
}

impl std::fmt::Debug for ReferenceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn hex_found(hex: String) -> Found {
    Found {
        value: Value::String(hex.clone()),
        target: hex,
    }
}

/// Anchors become a single path segment.
fn check_anchor(anchor: &str) -> RefResult<()> {
    let reason = if anchor.is_empty() {
        "empty"
    } else if anchor.contains('/') {
        "contains a path separator"
    } else {
        return Ok(());
    };
    Err(RefError::InvalidAnchor {
        anchor: anchor.to_string(),
        reason: reason.to_string(),
    })
}

/// Delivers each target at most once.
struct Dedupe<F> {
    seen: HashSet<String>,
    sink: F,
}

impl<F: FnMut(Found)> Dedupe<F> {
    fn new(sink: F) -> Self {
        Self {
            seen: HashSet::new(),
            sink,
        }
    }

    fn offer(&mut self, kind: EdgeKind, key: String, value: Value) {
        if let Some(found) = kind.found(key, value) {
            self.deliver(found);
        }
    }

    fn deliver(&mut self, found: Found) {
        if self.seen.insert(found.target.clone()) {
            (self.sink)(found);
        }
    }
}
