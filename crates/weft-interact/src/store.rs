use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use weft_crypto::IdentityProvider;
use weft_graph::{GraphStore, NodeUpdate, SubscriptionHandle};
use weft_refs::ReferenceIndex;
use weft_types::{
    layout, now_ms, InteractionCounts, InteractionKind, PostId, RepostMark, UserPostEntry, UserPub,
};

use crate::error::{InteractError, InteractResult};

/// Records likes and reposts as the current identity, and reads them back.
#[derive(Clone)]
pub struct InteractionStore {
    graph: Arc<dyn GraphStore>,
    identity: Arc<dyn IdentityProvider>,
    index: ReferenceIndex,
}

impl InteractionStore {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        identity: Arc<dyn IdentityProvider>,
        index: ReferenceIndex,
    ) -> Self {
        Self {
            graph,
            identity,
            index,
        }
    }

    fn caller(&self) -> InteractResult<UserPub> {
        self.identity.current().ok_or(InteractError::NotAuthenticated)
    }

    /// Like `post`. Liking twice is the same as liking once.
    pub async fn like(&self, post: &PostId) -> InteractResult<()> {
        let user = self.caller()?;
        self.graph
            .put(&layout::like_entry(post, &user), Value::Bool(true))
            .await?;
        debug!(post = %post.short_hex(), user = %user.short_id(), "liked");
        Ok(())
    }

    pub async fn unlike(&self, post: &PostId) -> InteractResult<()> {
        let user = self.caller()?;
        self.graph.remove(&layout::like_entry(post, &user)).await?;
        debug!(post = %post.short_hex(), user = %user.short_id(), "unliked");
        Ok(())
    }

    /// Repost `post`.
    ///
    /// Writes the repost record and, unless the caller wrote the post,
    /// mirrors it into the caller's post index with the `reposted` marker.
    pub async fn repost(&self, post: &PostId) -> InteractResult<()> {
        let user = self.caller()?;
        let author = self
            .index
            .post_author(post)
            .await?
            .ok_or(InteractError::NotFound(*post))?;
        let timestamp = now_ms();

        self.graph
            .put(
                &layout::repost_entry(post, &user),
                encode(&RepostMark { timestamp })?,
            )
            .await?;
        if author != user {
            self.graph
                .put(
                    &layout::user_post_entry(&user, post),
                    encode(&UserPostEntry::repost(*post, timestamp))?,
                )
                .await?;
        }
        info!(post = %post.short_hex(), user = %user.short_id(), "reposted");
        Ok(())
    }

    /// Undo a repost. Only a mirror entry carrying the `reposted` marker is
    /// removed from the caller's post index.
    pub async fn unrepost(&self, post: &PostId) -> InteractResult<()> {
        let user = self.caller()?;
        self.graph.remove(&layout::repost_entry(post, &user)).await?;

        let entry_path = layout::user_post_entry(&user, post);
        let mirrored = self
            .graph
            .get(&entry_path)
            .await?
            .and_then(|v| serde_json::from_value::<UserPostEntry>(v).ok())
            .is_some_and(|entry| entry.reposted);
        if mirrored {
            self.graph.remove(&entry_path).await?;
        }
        info!(post = %post.short_hex(), user = %user.short_id(), "unreposted");
        Ok(())
    }

    pub async fn has_liked(&self, post: &PostId, user: &UserPub) -> InteractResult<bool> {
        Ok(self.graph.get(&layout::like_entry(post, user)).await?.is_some())
    }

    /// Whether `user` has reposted `post`, from the repost record.
    pub async fn has_reposted(&self, post: &PostId, user: &UserPub) -> InteractResult<bool> {
        Ok(self
            .graph
            .get(&layout::repost_entry(post, user))
            .await?
            .is_some())
    }

    pub async fn likers(&self, post: &PostId) -> InteractResult<Vec<UserPub>> {
        self.actors(&layout::likes(post)).await
    }

    pub async fn reposters(&self, post: &PostId) -> InteractResult<Vec<UserPub>> {
        self.actors(&layout::reposts(post)).await
    }

    async fn actors(&self, node: &str) -> InteractResult<Vec<UserPub>> {
        Ok(self
            .graph
            .children(node)
            .await?
            .into_iter()
            .filter_map(|(key, _)| UserPub::from_hex(&key).ok())
            .collect())
    }

    /// Current like and repost counts.
    pub async fn counts(&self, post: &PostId) -> InteractResult<InteractionCounts> {
        let likes = self.graph.children(&layout::likes(post)).await?.len();
        let reposts = self.graph.children(&layout::reposts(post)).await?.len();
        Ok(InteractionCounts { likes, reposts })
    }

    /// Report counts for `post` now and after every change.
    ///
    /// Redelivered updates that change nothing are not reported.
    pub fn watch<F>(&self, post: &PostId, mut on_counts: F) -> InteractResult<SubscriptionHandle>
    where
        F: FnMut(InteractionCounts) + Send + 'static,
    {
        let likes_node = layout::likes(post);
        let reposts_node = layout::reposts(post);
        let mut likes = self.graph.on(&likes_node)?;
        let mut reposts = self.graph.on(&reposts_node)?;
        let graph = Arc::clone(&self.graph);

        let task = tokio::spawn(async move {
            let mut tally = Tally::default();
            for (kind, node) in [
                (InteractionKind::Like, &likes_node),
                (InteractionKind::Repost, &reposts_node),
            ] {
                match graph.children(node).await {
                    Ok(children) => {
                        for (key, _) in children {
                            tally.set(kind).insert(key);
                        }
                    }
                    Err(e) => warn!(node = %node, error = %e, "count snapshot failed"),
                }
            }
            on_counts(tally.counts());

            loop {
                let (kind, update) = tokio::select! {
                    Some(update) = likes.next() => (InteractionKind::Like, update),
                    Some(update) = reposts.next() => (InteractionKind::Repost, update),
                    else => break,
                };
                if tally.apply(kind, update) {
                    on_counts(tally.counts());
                }
            }
        });
        Ok(SubscriptionHandle::new(task))
    }
}

impl std::fmt::Debug for InteractionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionStore").finish_non_exhaustive()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> InteractResult<Value> {
    serde_json::to_value(value).map_err(|e| InteractError::Serialization(e.to_string()))
}

/// Live acting-user sets for one post.
#[derive(Default)]
struct Tally {
    likes: HashSet<String>,
    reposts: HashSet<String>,
}

impl Tally {
    fn set(&mut self, kind: InteractionKind) -> &mut HashSet<String> {
        match kind {
            InteractionKind::Like => &mut self.likes,
            InteractionKind::Repost => &mut self.reposts,
        }
    }

    /// Returns `true` if the update changed a set.
    fn apply(&mut self, kind: InteractionKind, update: NodeUpdate) -> bool {
        if update.is_tombstone() {
            self.set(kind).remove(&update.key)
        } else {
            self.set(kind).insert(update.key)
        }
    }

    fn counts(&self) -> InteractionCounts {
        InteractionCounts {
            likes: self.likes.len(),
            reposts: self.reposts.len(),
        }
    }
}
