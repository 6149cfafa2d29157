use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{broadcast, OnceCell};
use tracing::{debug, warn};
use weft_crypto::IdentityProvider;
use weft_graph::{resolve, GraphStore};
use weft_types::{layout, Profile, UserPub};

use crate::error::{ProfileError, ProfileResult};

/// Capacity of the profile update broadcast.
const UPDATE_CAPACITY: usize = 256;

/// Tuning for the profile cache.
#[derive(Clone, Debug)]
pub struct ProfileConfig {
    /// How long a fetch waits before reporting no profile.
    pub wait: Duration,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(4000),
        }
    }
}

type Fetch = Arc<OnceCell<Option<Profile>>>;

struct Inner {
    graph: Arc<dyn GraphStore>,
    identity: Arc<dyn IdentityProvider>,
    config: ProfileConfig,
    profiles: RwLock<HashMap<UserPub, Profile>>,
    in_flight: Mutex<HashMap<UserPub, Fetch>>,
    /// Bumped by `update` and `invalidate`; a fetch that started under an
    /// older generation is not cached.
    generations: Mutex<HashMap<UserPub, u64>>,
    updates: broadcast::Sender<Profile>,
}

/// Shared, deduplicating profile cache. Clones share state.
#[derive(Clone)]
pub struct ProfileCache {
    inner: Arc<Inner>,
}

impl ProfileCache {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        identity: Arc<dyn IdentityProvider>,
        config: ProfileConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                graph,
                identity,
                config,
                profiles: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                generations: Mutex::new(HashMap::new()),
                updates,
            }),
        }
    }

    /// Profile for `user`.
    ///
    /// A cached profile is returned at once and refreshed in the background.
    /// Otherwise this waits on the (possibly shared) fetch; `None` means
    /// nothing arrived within the wait.
    pub async fn get(&self, user: &UserPub) -> ProfileResult<Option<Profile>> {
        if let Some(cached) = self.cached(user) {
            let inner = Arc::clone(&self.inner);
            let user = *user;
            tokio::spawn(async move {
                if let Err(e) = inner.fetch(user).await {
                    debug!(user = %user.short_id(), error = %e, "background refresh failed");
                }
            });
            return Ok(Some(cached));
        }
        self.inner.fetch(*user).await
    }

    /// Cached profile for `user`, without fetching.
    pub fn cached(&self, user: &UserPub) -> Option<Profile> {
        self.inner
            .profiles
            .read()
            .expect("lock poisoned")
            .get(user)
            .cloned()
    }

    /// Fetch `user` now, bypassing the cached value.
    pub async fn refresh(&self, user: &UserPub) -> ProfileResult<Option<Profile>> {
        self.inner.fetch(*user).await
    }

    /// Drop the cached profile for `user`. A fetch already in flight will
    /// not bring it back.
    pub fn invalidate(&self, user: &UserPub) {
        let mut generations = self.inner.generations.lock().expect("lock poisoned");
        self.inner.supersede(&mut generations, *user);
        self.inner
            .profiles
            .write()
            .expect("lock poisoned")
            .remove(user);
    }

    pub fn clear(&self) {
        let mut generations = self.inner.generations.lock().expect("lock poisoned");
        let mut profiles = self.inner.profiles.write().expect("lock poisoned");
        let users: Vec<UserPub> = profiles.keys().copied().collect();
        for user in users {
            self.inner.supersede(&mut generations, user);
        }
        profiles.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.profiles.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every profile that resolves to something new.
    pub fn watch(&self) -> broadcast::Receiver<Profile> {
        self.inner.updates.subscribe()
    }

    /// Publish the caller's own profile and cache it.
    pub async fn update(&self, profile: Profile) -> ProfileResult<()> {
        let caller = self
            .inner
            .identity
            .current()
            .ok_or(ProfileError::NotAuthenticated)?;
        if profile.user != caller {
            return Err(ProfileError::PermissionDenied { caller });
        }
        if profile.display_name.trim().is_empty() {
            return Err(ProfileError::EmptyDisplayName);
        }
        let value =
            serde_json::to_value(&profile).map_err(|e| ProfileError::Serialization(e.to_string()))?;
        self.inner
            .graph
            .put(&layout::user_profile(&caller), value)
            .await?;
        let mut generations = self.inner.generations.lock().expect("lock poisoned");
        self.inner.supersede(&mut generations, caller);
        self.inner.store(profile);
        debug!(user = %caller.short_id(), "profile updated");
        Ok(())
    }
}

impl Inner {
    /// Join the in-flight fetch for `user`, starting one if needed.
    async fn fetch(&self, user: UserPub) -> ProfileResult<Option<Profile>> {
        let (cell, generation): (Fetch, u64) = {
            let generations = self.generations.lock().expect("lock poisoned");
            let mut in_flight = self.in_flight.lock().expect("lock poisoned");
            let cell = Arc::clone(in_flight.entry(user).or_default());
            (cell, generations.get(&user).copied().unwrap_or_default())
        };
        let result = cell.get_or_try_init(|| self.load(user)).await.cloned();

        {
            let mut in_flight = self.in_flight.lock().expect("lock poisoned");
            if in_flight
                .get(&user)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(&user);
            }
        }

        let profile = result?;
        if let Some(profile) = &profile {
            let generations = self.generations.lock().expect("lock poisoned");
            if generations.get(&user).copied().unwrap_or_default() == generation {
                self.store(profile.clone());
            } else {
                debug!(user = %user.short_id(), "fetch superseded, not cached");
            }
        }
        Ok(profile)
    }

    /// Start a new generation for `user` and detach any fetch in flight, so
    /// later lookups start fresh. Called with the generations lock held.
    fn supersede(&self, generations: &mut HashMap<UserPub, u64>, user: UserPub) {
        *generations.entry(user).or_default() += 1;
        self.in_flight.lock().expect("lock poisoned").remove(&user);
    }

    async fn load(&self, user: UserPub) -> ProfileResult<Option<Profile>> {
        let path = layout::user_profile(&user);
        let Some(value) = resolve(self.graph.as_ref(), &path, self.config.wait).await? else {
            debug!(user = %user.short_id(), "no profile");
            return Ok(None);
        };
        match serde_json::from_value::<Profile>(value) {
            Ok(profile) if profile.user == user => Ok(Some(profile)),
            Ok(profile) => {
                warn!(user = %user.short_id(), claimed = %profile.user.short_id(), "profile names another user");
                Ok(None)
            }
            Err(e) => {
                warn!(user = %user.short_id(), error = %e, "undecodable profile");
                Ok(None)
            }
        }
    }

    /// Cache `profile` and announce it if it changed.
    fn store(&self, profile: Profile) {
        let previous = self
            .profiles
            .write()
            .expect("lock poisoned")
            .insert(profile.user, profile.clone());
        if previous.as_ref() != Some(&profile) {
            // No receivers is fine.
            let _ = self.updates.send(profile);
        }
    }
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("config", &self.inner.config)
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weft_crypto::KeyIdentity;
    use weft_graph::{GraphResult, InMemoryGraph, Subscription};
    use weft_types::ErrorKind;

    /// Wraps a graph, counting reads and delaying each answer. The value is
    /// read before the delay, so a slow read can return stale data.
    struct CountingGraph {
        inner: InMemoryGraph,
        reads: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl GraphStore for CountingGraph {
        async fn get(&self, path: &str) -> GraphResult<Option<Value>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let value = self.inner.get(path).await;
            tokio::time::sleep(self.delay).await;
            value
        }
        async fn put(&self, path: &str, value: Value) -> GraphResult<()> {
            self.inner.put(path, value).await
        }
        async fn children(&self, path: &str) -> GraphResult<Vec<(String, Value)>> {
            self.inner.children(path).await
        }
        fn on(&self, path: &str) -> GraphResult<Subscription> {
            self.inner.on(path)
        }
    }

    fn counting(delay: Duration) -> Arc<CountingGraph> {
        Arc::new(CountingGraph {
            inner: InMemoryGraph::new(),
            reads: AtomicUsize::new(0),
            delay,
        })
    }

    fn cache_over(graph: Arc<dyn GraphStore>, identity: Arc<KeyIdentity>) -> ProfileCache {
        ProfileCache::new(
            graph,
            identity,
            ProfileConfig {
                wait: Duration::from_millis(200),
            },
        )
    }

    async fn seed(graph: &dyn GraphStore, profile: &Profile) {
        graph
            .put(
                &layout::user_profile(&profile.user),
                serde_json::to_value(profile).unwrap(),
            )
            .await
            .unwrap();
    }

    // ---------------------------------------------------------------
    // fetch sharing
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_lookups_share_one_fetch() {
        let graph = counting(Duration::from_millis(50));
        let user = UserPub::from_raw([1; 32]);
        seed(graph.as_ref(), &Profile::new(user, "Ada")).await;
        let cache = cache_over(graph.clone(), Arc::new(KeyIdentity::anonymous()));

        let mut lookups = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let cache = cache.clone();
            lookups.spawn(async move { cache.get(&user).await });
        }
        while let Some(result) = lookups.join_next().await {
            let profile = result.unwrap().unwrap().unwrap();
            assert_eq!(profile.display_name, "Ada");
        }
        assert_eq!(graph.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_value_returns_immediately_and_refreshes() {
        let graph = counting(Duration::from_millis(5));
        let user = UserPub::from_raw([2; 32]);
        seed(graph.as_ref(), &Profile::new(user, "Old")).await;
        let cache = cache_over(graph.clone(), Arc::new(KeyIdentity::anonymous()));
        assert_eq!(cache.get(&user).await.unwrap().unwrap().display_name, "Old");

        let mut updates = cache.watch();
        seed(graph.as_ref(), &Profile::new(user, "New")).await;
        let served = cache.get(&user).await.unwrap().unwrap();
        assert_eq!(served.display_name, "Old");

        let refreshed = tokio::time::timeout(Duration::from_secs(1), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.display_name, "New");
        assert_eq!(cache.cached(&user).unwrap().display_name, "New");
    }

    #[tokio::test]
    async fn missing_profile_is_none_after_wait() {
        let graph = Arc::new(InMemoryGraph::new());
        let cache = cache_over(graph, Arc::new(KeyIdentity::anonymous()));
        assert_eq!(cache.get(&UserPub::from_raw([3; 32])).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_and_clear_drop_entries() {
        let graph = Arc::new(InMemoryGraph::new());
        let a = UserPub::from_raw([4; 32]);
        let b = UserPub::from_raw([5; 32]);
        seed(graph.as_ref(), &Profile::new(a, "A")).await;
        seed(graph.as_ref(), &Profile::new(b, "B")).await;
        let cache = cache_over(graph, Arc::new(KeyIdentity::anonymous()));
        cache.get(&a).await.unwrap();
        cache.get(&b).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate(&a);
        assert!(cache.cached(&a).is_none());
        assert!(cache.cached(&b).is_some());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn profile_claiming_another_key_is_ignored() {
        let graph = Arc::new(InMemoryGraph::new());
        let victim = UserPub::from_raw([6; 32]);
        let forged = Profile::new(UserPub::from_raw([7; 32]), "Mallory");
        graph
            .put(
                &layout::user_profile(&victim),
                serde_json::to_value(&forged).unwrap(),
            )
            .await
            .unwrap();
        let cache = cache_over(graph, Arc::new(KeyIdentity::anonymous()));
        assert_eq!(cache.get(&victim).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalidate_during_a_fetch_sticks() {
        let graph = counting(Duration::from_millis(100));
        let user = UserPub::from_raw([9; 32]);
        seed(graph.as_ref(), &Profile::new(user, "Ada")).await;
        let cache = cache_over(graph.clone(), Arc::new(KeyIdentity::anonymous()));
        cache.get(&user).await.unwrap();

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh(&user).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.invalidate(&user);
        pending.await.unwrap().unwrap();
        assert!(cache.cached(&user).is_none());
    }

    // ---------------------------------------------------------------
    // update
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn update_wins_over_a_fetch_already_in_flight() {
        let graph = counting(Duration::from_millis(100));
        let identity = Arc::new(KeyIdentity::generate());
        let me = identity.current().unwrap();
        seed(graph.as_ref(), &Profile::new(me, "Old")).await;
        let cache = cache_over(graph.clone(), identity);

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh(&me).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut updates = cache.watch();
        cache.update(Profile::new(me, "New")).await.unwrap();
        let stale = pending.await.unwrap().unwrap().unwrap();
        assert_eq!(stale.display_name, "Old");

        assert_eq!(cache.cached(&me).unwrap().display_name, "New");
        assert_eq!(updates.recv().await.unwrap().display_name, "New");
        assert!(updates.try_recv().is_err(), "stale profile was re-announced");
    }

    #[tokio::test]
    async fn update_writes_through_and_notifies() {
        let graph = Arc::new(InMemoryGraph::new());
        let identity = Arc::new(KeyIdentity::generate());
        let me = identity.current().unwrap();
        let cache = cache_over(graph.clone(), identity);
        let mut updates = cache.watch();

        let profile = Profile::new(me, "Me").with_bio("hello");
        cache.update(profile.clone()).await.unwrap();
        assert_eq!(updates.recv().await.unwrap(), profile);
        assert_eq!(cache.cached(&me), Some(profile.clone()));
        let stored = graph.get(&layout::user_profile(&me)).await.unwrap().unwrap();
        assert_eq!(serde_json::from_value::<Profile>(stored).unwrap(), profile);
    }

    #[tokio::test]
    async fn update_is_owner_only() {
        let graph = Arc::new(InMemoryGraph::new());
        let identity = Arc::new(KeyIdentity::generate());
        let cache = cache_over(graph, identity.clone());

        let other = Profile::new(UserPub::from_raw([8; 32]), "Someone");
        let err = cache.update(other).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let me = identity.current().unwrap();
        let err = cache.update(Profile::new(me, "  ")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        identity.logout();
        let err = cache.update(Profile::new(me, "Me")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    }
}
