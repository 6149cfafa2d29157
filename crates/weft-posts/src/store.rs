use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use weft_crypto::{ContentAddresser, IdentityProvider, PostFields};
use weft_graph::{resolve, GraphStore};
use weft_refs::{Edge, ReferenceIndex};
use weft_types::{layout, now_ms, DayBucket, Post, PostId};

use crate::draft::{PostDraft, Published};
use crate::error::{PostError, PostResult};

/// Tuning for the post store.
#[derive(Clone, Debug)]
pub struct PostStoreConfig {
    /// Bound on how long `read` waits for the content table and payload.
    pub wait: Duration,
}

impl Default for PostStoreConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(4000),
        }
    }
}

/// Publishes, reads, and de-indexes posts.
#[derive(Clone)]
pub struct PostStore {
    graph: Arc<dyn GraphStore>,
    identity: Arc<dyn IdentityProvider>,
    index: ReferenceIndex,
    config: PostStoreConfig,
}

impl PostStore {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        identity: Arc<dyn IdentityProvider>,
        index: ReferenceIndex,
        config: PostStoreConfig,
    ) -> Self {
        Self {
            graph,
            identity,
            index,
            config,
        }
    }

    /// Publish a post as the current identity.
    ///
    /// Returns once every write has been issued. Publishing the same fields
    /// twice yields the same id; the second call reports `duplicate` and
    /// re-issues the writes, which also heals any half-written index.
    pub async fn publish(&self, draft: PostDraft) -> PostResult<Published> {
        if draft.text.trim().is_empty() {
            return Err(PostError::EmptyText);
        }
        let author = self.identity.current().ok_or(PostError::NotAuthenticated)?;
        let timestamp = draft.timestamp.unwrap_or_else(now_ms);
        let day = DayBucket::from_timestamp_ms(timestamp)?;

        let id = ContentAddresser::POST.compute(&PostFields {
            author_pub: &author,
            text: &draft.text,
            timestamp,
            reply_to: draft.reply_to.as_ref(),
            media_ref: draft.media_ref.as_deref(),
        });
        let duplicate = self.graph.get(&layout::content_entry(&id)).await?.is_some();

        let post = Post {
            id,
            author_pub: author,
            text: draft.text,
            timestamp,
            reply_to: draft.reply_to,
            media_ref: draft.media_ref,
        };
        let pointer = layout::post_pointer(&id);
        self.graph.put(&layout::payload(&id), post.to_value()?).await?;
        self.graph
            .put(&layout::content_entry(&id), pointer.clone())
            .await?;
        self.graph
            .put(&layout::timeline_entry(&day, &id), pointer)
            .await?;
        for edge in Edge::all_for(&post) {
            self.index.link(&edge).await?;
        }

        info!(
            post = %id.short_hex(),
            author = %author.short_id(),
            %day,
            duplicate,
            "published"
        );
        Ok(Published { id, duplicate })
    }

    /// Read a post by id.
    ///
    /// Resolves the content table pointer and the payload side by side, so
    /// a missing post costs one bounded wait. A de-indexed post is still
    /// returned if its payload is reachable. A payload that does not hash
    /// to `id` is treated as missing.
    pub async fn read(&self, id: &PostId) -> PostResult<Post> {
        let (entry, payload) = tokio::try_join!(
            async {
                let path = layout::content_entry(id);
                Ok::<_, PostError>(resolve(self.graph.as_ref(), &path, self.config.wait).await?)
            },
            async { Ok::<_, PostError>(self.index.payload(id).await?) },
        )?;
        if let Some(target) = entry.as_ref().and_then(layout::deref) {
            if target != layout::payload(id) {
                warn!(post = %id.short_hex(), %target, "content table points elsewhere");
            }
        } else {
            debug!(post = %id.short_hex(), "not in content table, reading payload directly");
        }
        payload.ok_or(PostError::NotFound(*id))
    }

    /// De-index a post the current identity authored.
    ///
    /// Removes the content table entry, the timeline pointer, and every
    /// authorship, tag, and reply edge. The payload stays; copies already
    /// replicated elsewhere are not recalled.
    pub async fn delete(&self, id: &PostId) -> PostResult<()> {
        let caller = self.identity.current().ok_or(PostError::NotAuthenticated)?;
        let post = self
            .index
            .payload(id)
            .await?
            .ok_or(PostError::NotFound(*id))?;
        if post.author_pub != caller {
            return Err(PostError::PermissionDenied {
                post: *id,
                user: caller,
            });
        }

        self.graph.remove(&layout::content_entry(id)).await?;
        self.graph
            .remove(&layout::timeline_entry(&post.day()?, id))
            .await?;
        for edge in Edge::all_for(&post) {
            self.index.unlink(&edge).await?;
        }
        info!(post = %id.short_hex(), "de-indexed");
        Ok(())
    }

    /// Returns `true` if `id` is in the content table.
    pub async fn is_live(&self, id: &PostId) -> PostResult<bool> {
        Ok(self.index.is_live(id).await?)
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }
}

impl std::fmt::Debug for PostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
