use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};
use weft_graph::{GraphStore, SubscriptionHandle};
use weft_interact::InteractionStore;
use weft_posts::PostStore;
use weft_profile::ProfileCache;
use weft_refs::{EdgeKind, Found, ReferenceIndex};
use weft_types::{DayBucket, InteractionCounts, PostId, Tag, TagSlug, UserPub};

use crate::error::{QueryError, QueryResult};
use crate::feed;
use crate::view::PostView;

/// Tuning for the read paths.
#[derive(Clone, Debug)]
pub struct QueryConfig {
    /// Number of daily timeline shards the global timeline covers.
    pub window_days: usize,
    /// How long a one-shot [`QueryFacade::view`] waits for the author's
    /// profile. Feeds never wait on it.
    pub enrich_wait: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            enrich_wait: Duration::from_millis(1500),
        }
    }
}

/// Composes stores into live, deduplicated feeds.
#[derive(Clone)]
pub struct QueryFacade {
    graph: Arc<dyn GraphStore>,
    index: ReferenceIndex,
    posts: PostStore,
    interactions: InteractionStore,
    profiles: ProfileCache,
    config: QueryConfig,
}

impl QueryFacade {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        posts: PostStore,
        interactions: InteractionStore,
        profiles: ProfileCache,
        config: QueryConfig,
    ) -> Self {
        Self {
            graph,
            index: posts.index().clone(),
            posts,
            interactions,
            profiles,
            config,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Resolve one post and enrich it with counts and, if it arrives in
    /// time, the author's profile. A profile that arrives later is still
    /// cached and announced on [`ProfileCache::watch`].
    pub async fn view(&self, id: &PostId) -> QueryResult<PostView> {
        let post = self.posts.read(id).await?;

        let profiles = self.profiles.clone();
        let author_pub = post.author_pub;
        let fetch = tokio::spawn(async move { profiles.get(&author_pub).await });

        let counts = self.counts(id).await;
        let author = match tokio::time::timeout(self.config.enrich_wait, fetch).await {
            Ok(Ok(Ok(profile))) => profile,
            Ok(Ok(Err(e))) => {
                debug!(user = %author_pub.short_id(), error = %e, "profile fetch failed");
                None
            }
            Ok(Err(e)) => {
                debug!(error = %e, "profile fetch aborted");
                None
            }
            Err(_) => {
                trace!(user = %author_pub.short_id(), "profile still resolving");
                None
            }
        };
        Ok(PostView {
            post,
            author,
            counts,
        })
    }

    /// Resolve one post without waiting on its author.
    ///
    /// The profile is attached only if already cached. Either way a fetch
    /// is started, and its result is announced on [`ProfileCache::watch`].
    pub async fn view_now(&self, id: &PostId) -> QueryResult<PostView> {
        let post = self.posts.read(id).await?;
        let author_pub = post.author_pub;
        let author = self.profiles.cached(&author_pub);
        if author.is_none() {
            let profiles = self.profiles.clone();
            tokio::spawn(async move {
                if let Err(e) = profiles.get(&author_pub).await {
                    debug!(user = %author_pub.short_id(), error = %e, "profile fetch failed");
                }
            });
        }
        let counts = self.counts(id).await;
        Ok(PostView {
            post,
            author,
            counts,
        })
    }

    async fn counts(&self, id: &PostId) -> InteractionCounts {
        match self.interactions.counts(id).await {
            Ok(counts) => counts,
            Err(e) => {
                debug!(post = %id.short_hex(), error = %e, "counts unavailable");
                Default::default()
            }
        }
    }

    // ---------------------------------------------------------------
    // Feeds
    // ---------------------------------------------------------------

    /// Posts from the most recent `window_days` timeline shards.
    pub fn view_global_timeline<F>(&self, on_post: F) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        let days = DayBucket::today().window(self.config.window_days);
        self.view_timeline_days(&days, on_post)
    }

    /// Posts from exactly the given timeline shards.
    pub fn view_timeline_days<F>(
        &self,
        days: &[DayBucket],
        on_post: F,
    ) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        let (ids, mut handle) = feed::start(self.clone(), on_post);
        for day in days {
            handle = handle.merge(feed::shard_source(self.graph.as_ref(), day, ids.clone())?);
        }
        debug!(shards = days.len(), "timeline feed started");
        Ok(handle)
    }

    /// Posts carrying `tag`. The tag may be given with or without `#`.
    pub fn view_hashtag<F>(&self, tag: &str, on_post: F) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        let slug = TagSlug::parse(tag)?;
        self.traversal_feed(EdgeKind::TagPosts, slug.as_str(), |_| true, on_post)
    }

    /// Posts `user` authored. Reposts are not included; use
    /// [`get_user_reposts`](Self::get_user_reposts) for those.
    pub fn get_user_posts<F>(&self, user: &UserPub, on_post: F) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        let keep = |found: &Found| !is_repost(found);
        self.traversal_feed(EdgeKind::AuthorPosts, &user.to_hex(), keep, on_post)
    }

    /// Posts `user` reposted, from the mirror entries in their post index.
    pub fn get_user_reposts<F>(
        &self,
        user: &UserPub,
        on_post: F,
    ) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        self.traversal_feed(EdgeKind::AuthorPosts, &user.to_hex(), is_repost, on_post)
    }

    /// Replies to `post`.
    pub fn view_replies<F>(&self, post: &PostId, on_post: F) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        self.traversal_feed(EdgeKind::ParentReplies, &post.to_hex(), |_| true, on_post)
    }

    fn traversal_feed<F>(
        &self,
        kind: EdgeKind,
        anchor: &str,
        keep: fn(&Found) -> bool,
        on_post: F,
    ) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        let (ids, handle) = feed::start(self.clone(), on_post);
        let source = self.index.traverse(kind, anchor, move |found| {
            if !keep(&found) {
                return;
            }
            if let Ok(id) = PostId::from_hex(&found.target) {
                let _ = ids.send(id);
            }
        })?;
        Ok(handle.merge(source))
    }

    // ---------------------------------------------------------------
    // Edge lookups
    // ---------------------------------------------------------------

    /// Tags of `post`, healed from the payload if the index lost them.
    pub fn get_post_tags<F>(&self, post: &PostId, mut on_tag: F) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(Tag) + Send + 'static,
    {
        Ok(self
            .index
            .traverse(EdgeKind::PostTags, &post.to_hex(), move |found| {
                if let Ok(tag) = serde_json::from_value::<Tag>(found.value) {
                    on_tag(tag);
                }
            })?)
    }

    /// Author of `post`, healed from the payload if the index lost it.
    pub fn get_post_author<F>(
        &self,
        post: &PostId,
        mut on_author: F,
    ) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(UserPub) + Send + 'static,
    {
        Ok(self
            .index
            .traverse(EdgeKind::PostAuthor, &post.to_hex(), move |found| {
                if let Ok(user) = UserPub::from_hex(&found.target) {
                    on_author(user);
                }
            })?)
    }

    /// Parent of the reply `post`, healed from the payload if the index
    /// lost it.
    pub fn get_parent_post<F>(
        &self,
        post: &PostId,
        mut on_parent: F,
    ) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostId) + Send + 'static,
    {
        Ok(self
            .index
            .traverse(EdgeKind::ReplyParent, &post.to_hex(), move |found| {
                if let Ok(parent) = PostId::from_hex(&found.target) {
                    on_parent(parent);
                }
            })?)
    }

    /// One-shot author lookup.
    pub async fn post_author(&self, post: &PostId) -> QueryResult<UserPub> {
        self.index
            .post_author(post)
            .await?
            .ok_or_else(|| QueryError::not_found(format!("author of {}", post.short_hex())))
    }

    /// One-shot parent lookup. A post that is not a reply has no parent.
    pub async fn parent_post(&self, post: &PostId) -> QueryResult<PostId> {
        self.index
            .parent_post(post)
            .await?
            .ok_or_else(|| QueryError::not_found(format!("parent of {}", post.short_hex())))
    }

    /// One-shot tag lookup. An empty list is only returned for a post whose
    /// payload resolved.
    pub async fn post_tags(&self, post: &PostId) -> QueryResult<Vec<Tag>> {
        let tags = self.index.post_tags(post).await?;
        if tags.is_empty() && self.index.payload(post).await?.is_none() {
            return Err(QueryError::not_found(format!("post {}", post.short_hex())));
        }
        Ok(tags)
    }

    // ---------------------------------------------------------------
    // Single post
    // ---------------------------------------------------------------

    /// Deliver a view of `id` as soon as the post resolves, then a fresh one
    /// whenever its counts change or its author's profile resolves or
    /// changes.
    pub fn watch_post<F>(&self, id: &PostId, mut on_view: F) -> QueryResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        let facade = self.clone();
        let id = *id;
        let mut profiles = self.profiles.watch();
        let task = tokio::spawn(async move {
            let mut view = match facade.view_now(&id).await {
                Ok(view) => view,
                Err(e) => {
                    debug!(post = %id.short_hex(), error = %e, "watched post did not resolve");
                    return;
                }
            };
            on_view(view.clone());

            let (tx, mut counts) = mpsc::unbounded_channel();
            let _counts_handle = match facade.interactions.watch(&id, move |c| {
                let _ = tx.send(c);
            }) {
                Ok(handle) => handle,
                Err(e) => {
                    debug!(post = %id.short_hex(), error = %e, "count watch failed");
                    return;
                }
            };

            loop {
                tokio::select! {
                    Some(next) = counts.recv() => {
                        if next != view.counts {
                            view.counts = next;
                            on_view(view.clone());
                        }
                    }
                    update = profiles.recv() => match update {
                        Ok(profile) if profile.user == view.post.author_pub => {
                            if view.author.as_ref() != Some(&profile) {
                                view.author = Some(profile);
                                on_view(view.clone());
                            }
                        }
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
        Ok(SubscriptionHandle::new(task))
    }
}

impl std::fmt::Debug for QueryFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFacade")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn is_repost(found: &Found) -> bool {
    found
        .value
        .get("reposted")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
