use std::sync::RwLock;

use tokio::sync::mpsc;

use crate::subscription::NodeUpdate;

/// Internal subscriber: a node path paired with a delivery channel.
struct Subscriber {
    path: String,
    sender: mpsc::UnboundedSender<NodeUpdate>,
}

/// Fan-out router that delivers child updates to subscribers of a node.
pub(crate) struct Router {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a new subscriber for `path`.
    pub(crate) fn register(&self, path: &str, sender: mpsc::UnboundedSender<NodeUpdate>) {
        self.subscribers
            .write()
            .expect("router lock poisoned")
            .push(Subscriber {
                path: path.to_string(),
                sender,
            });
    }

    /// Route an update to every subscriber of its node.
    /// Subscribers whose channels are closed are pruned.
    pub(crate) fn route(&self, update: &NodeUpdate) {
        let mut subs = self.subscribers.write().expect("router lock poisoned");
        subs.retain(|sub| {
            if sub.path == update.path {
                // If send fails (receiver dropped), the subscriber is stale.
                sub.sender.send(update.clone()).is_ok()
            } else {
                !sub.sender.is_closed()
            }
        });
    }

    /// Number of registered subscribers, including not-yet-pruned stale ones.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("router lock poisoned")
            .iter()
            .filter(|sub| !sub.sender.is_closed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(path: &str, key: &str) -> NodeUpdate {
        NodeUpdate {
            path: path.into(),
            key: key.into(),
            value: Some(serde_json::Value::Bool(true)),
        }
    }

    #[test]
    fn routes_only_to_matching_path() {
        let router = Router::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        router.register("a", tx_a);
        router.register("b", tx_b);

        router.route(&update("a", "k"));

        assert_eq!(rx_a.try_recv().unwrap().key, "k");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn prunes_closed_subscribers() {
        let router = Router::new();
        let (tx, rx) = mpsc::unbounded_channel();
        router.register("a", tx);
        assert_eq!(router.subscriber_count(), 1);
        drop(rx);
        assert_eq!(router.subscriber_count(), 0);
        router.route(&update("a", "k"));
        assert!(router.subscribers.read().unwrap().is_empty());
    }
}
