use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;
use weft_crypto::IdentityProvider;
use weft_graph::{GraphStore, InMemoryGraph, SubscriptionHandle};
use weft_interact::InteractionStore;
use weft_posts::{PostDraft, PostStore, Published};
use weft_profile::ProfileCache;
use weft_query::{PostView, QueryFacade};
use weft_refs::ReferenceIndex;
use weft_types::{DayBucket, InteractionCounts, Post, PostId, Profile, Tag, UserPub};

use crate::config::WeftConfig;
use crate::error::{SdkError, SdkResult};
use crate::media::{InMemoryMediaUploader, MediaUploader};
use crate::result::ActionResult;

/// High-level Weft client.
///
/// Cloning is cheap; clones share every store and cache.
#[derive(Clone)]
pub struct Weft {
    graph: Arc<dyn GraphStore>,
    identity: Arc<dyn IdentityProvider>,
    media: Arc<dyn MediaUploader>,
    config: WeftConfig,
    posts: PostStore,
    interactions: InteractionStore,
    profiles: ProfileCache,
    query: QueryFacade,
}

impl Weft {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        identity: Arc<dyn IdentityProvider>,
        config: WeftConfig,
    ) -> Self {
        let index = ReferenceIndex::new(Arc::clone(&graph), config.index_config());
        let posts = PostStore::new(
            Arc::clone(&graph),
            Arc::clone(&identity),
            index.clone(),
            config.post_store_config(),
        );
        let interactions =
            InteractionStore::new(Arc::clone(&graph), Arc::clone(&identity), index);
        let profiles = ProfileCache::new(
            Arc::clone(&graph),
            Arc::clone(&identity),
            config.profile_config(),
        );
        let query = QueryFacade::new(
            Arc::clone(&graph),
            posts.clone(),
            interactions.clone(),
            profiles.clone(),
            config.query_config(),
        );
        Self {
            graph,
            identity,
            media: Arc::new(InMemoryMediaUploader::new()),
            config,
            posts,
            interactions,
            profiles,
            query,
        }
    }

    /// A client over a fresh in-process graph.
    pub fn in_memory(identity: Arc<dyn IdentityProvider>, config: WeftConfig) -> Self {
        Self::new(Arc::new(InMemoryGraph::new()), identity, config)
    }

    pub fn with_media(mut self, media: Arc<dyn MediaUploader>) -> Self {
        self.media = media;
        self
    }

    pub fn config(&self) -> &WeftConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<dyn GraphStore> {
        &self.graph
    }

    pub fn posts(&self) -> &PostStore {
        &self.posts
    }

    pub fn interactions(&self) -> &InteractionStore {
        &self.interactions
    }

    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    pub fn query(&self) -> &QueryFacade {
        &self.query
    }

    pub fn current_user(&self) -> Option<UserPub> {
        self.identity.current()
    }

    // ---- Posts ----

    /// Publish as the current identity.
    pub async fn publish_post(
        &self,
        text: &str,
        media_ref: Option<&str>,
        reply_to: Option<&PostId>,
    ) -> ActionResult {
        let mut draft = PostDraft::new(text);
        draft.media_ref = media_ref.map(str::to_string);
        draft.reply_to = reply_to.copied();
        match self.publish(draft).await {
            Ok(published) => ActionResult {
                duplicate: published.duplicate,
                ..ActionResult::with_id(published.id.to_hex())
            },
            Err(e) => failed("publish", e),
        }
    }

    pub async fn publish(&self, draft: PostDraft) -> SdkResult<Published> {
        Ok(self.posts.publish(draft).await?)
    }

    pub async fn delete_post(&self, id: &PostId) -> ActionResult {
        match self.posts.delete(id).await {
            Ok(()) => ActionResult::with_id(id.to_hex()),
            Err(e) => failed("delete", e.into()),
        }
    }

    pub async fn read_post(&self, id: &PostId) -> SdkResult<Post> {
        Ok(self.posts.read(id).await?)
    }

    /// One enriched view of a post.
    pub async fn view_post(&self, id: &PostId) -> SdkResult<PostView> {
        Ok(self.query.view(id).await?)
    }

    pub async fn upload_media(&self, blob: impl Into<Bytes>) -> SdkResult<String> {
        self.media.upload(blob.into()).await
    }

    // ---- Interactions ----

    pub async fn like_post(&self, id: &PostId) -> ActionResult {
        act("like", self.interactions.like(id).await)
    }

    pub async fn unlike_post(&self, id: &PostId) -> ActionResult {
        act("unlike", self.interactions.unlike(id).await)
    }

    pub async fn repost(&self, id: &PostId) -> ActionResult {
        act("repost", self.interactions.repost(id).await)
    }

    pub async fn unrepost(&self, id: &PostId) -> ActionResult {
        act("unrepost", self.interactions.unrepost(id).await)
    }

    pub async fn counts(&self, id: &PostId) -> SdkResult<InteractionCounts> {
        Ok(self.interactions.counts(id).await?)
    }

    // ---- Profiles ----

    pub async fn get_user_profile(&self, user: &UserPub) -> SdkResult<Option<Profile>> {
        Ok(self.profiles.get(user).await?)
    }

    pub async fn update_profile(&self, profile: Profile) -> ActionResult {
        act("update profile", self.profiles.update(profile).await)
    }

    // ---- Feeds ----

    pub fn view_global_timeline<F>(&self, on_post: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.view_global_timeline(on_post)?)
    }

    pub fn view_timeline_days<F>(
        &self,
        days: &[DayBucket],
        on_post: F,
    ) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.view_timeline_days(days, on_post)?)
    }

    pub fn view_hashtag<F>(&self, tag: &str, on_post: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.view_hashtag(tag, on_post)?)
    }

    pub fn get_user_posts<F>(&self, user: &UserPub, on_post: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.get_user_posts(user, on_post)?)
    }

    pub fn get_user_reposts<F>(&self, user: &UserPub, on_post: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.get_user_reposts(user, on_post)?)
    }

    pub fn view_replies<F>(&self, post: &PostId, on_post: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.view_replies(post, on_post)?)
    }

    pub fn watch_post<F>(&self, post: &PostId, on_view: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostView) + Send + 'static,
    {
        Ok(self.query.watch_post(post, on_view)?)
    }

    pub fn get_post_tags<F>(&self, post: &PostId, on_tag: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(Tag) + Send + 'static,
    {
        Ok(self.query.get_post_tags(post, on_tag)?)
    }

    pub fn get_post_author<F>(&self, post: &PostId, on_author: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(UserPub) + Send + 'static,
    {
        Ok(self.query.get_post_author(post, on_author)?)
    }

    pub fn get_parent_post<F>(&self, post: &PostId, on_parent: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(PostId) + Send + 'static,
    {
        Ok(self.query.get_parent_post(post, on_parent)?)
    }
}

impl std::fmt::Debug for Weft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Weft")
            .field("config", &self.config)
            .field("user", &self.current_user())
            .finish_non_exhaustive()
    }
}

fn act<T, E: Into<SdkError>>(action: &str, result: Result<T, E>) -> ActionResult {
    match result {
        Ok(_) => ActionResult::ok(),
        Err(e) => failed(action, e.into()),
    }
}

fn failed(action: &str, error: SdkError) -> ActionResult {
    warn!(action, kind = %error.kind(), error = %error, "action failed");
    ActionResult::failed(&error)
}
