use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A single change to one child of a subscribed node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeUpdate {
    /// The subscribed node's path.
    pub path: String,
    /// The child key that changed.
    pub key: String,
    /// The new value; `None` is a tombstone.
    pub value: Option<Value>,
}

impl NodeUpdate {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// A live subscription to one node's children.
///
/// Dropping the subscription (or calling [`Subscription::cancel`]) is the
/// disposer: the store prunes the closed channel on its next write.
#[derive(Debug)]
pub struct Subscription {
    path: String,
    rx: mpsc::UnboundedReceiver<NodeUpdate>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, rx: mpsc::UnboundedReceiver<NodeUpdate>) -> Self {
        Self {
            path: path.into(),
            rx,
        }
    }

    /// Wait for the next update. Returns `None` once the store goes away.
    pub async fn next(&mut self) -> Option<NodeUpdate> {
        self.rx.recv().await
    }

    /// Take an already-delivered update without waiting.
    pub fn try_next(&mut self) -> Option<NodeUpdate> {
        self.rx.try_recv().ok()
    }

    /// The subscribed node's path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stop receiving updates.
    pub fn cancel(self) {}
}

/// Cancellation token for a running live query.
///
/// Owns the background tasks that consume subscriptions and invoke caller
/// callbacks. Cancelling, or dropping the handle, aborts those tasks, which
/// in turn drops their [`Subscription`]s. Handles are cheap; re-issuing an
/// identical query and cancelling the old handle is always safe.
#[derive(Debug, Default)]
#[must_use = "dropping a SubscriptionHandle cancels the live query"]
pub struct SubscriptionHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { tasks: vec![task] }
    }

    /// A handle that owns nothing, for queries that finished synchronously.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Take ownership of another task.
    pub fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Combine two handles so one cancel stops both.
    pub fn merge(mut self, mut other: SubscriptionHandle) -> Self {
        self.tasks.append(&mut other.tasks);
        self
    }

    /// Returns `true` once every owned task has stopped.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Stop the query and release its subscriptions.
    pub fn cancel(self) {}
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
