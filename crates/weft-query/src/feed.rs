//! The delivery pipeline behind every feed.
//!
//! Sources (timeline shard subscriptions, index traversals) push post ids
//! into one channel. A single consumer deduplicates them and resolves each
//! new id in its own task, so one slow or missing post never holds up the
//! rest. Posts are delivered as soon as they resolve; an author profile
//! that is not cached yet is announced later on the profile watch.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, trace};
use weft_graph::{GraphResult, GraphStore, SubscriptionHandle};
use weft_types::{layout, DayBucket, PostId};

use crate::facade::QueryFacade;
use crate::view::PostView;

/// Start the consumer. Returns the id sink for sources and the handle that
/// owns the consumer.
pub(crate) fn start<F>(
    facade: QueryFacade,
    mut on_post: F,
) -> (mpsc::UnboundedSender<PostId>, SubscriptionHandle)
where
    F: FnMut(PostView) + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<PostId>();
    let task = tokio::spawn(async move {
        let mut seen = HashSet::new();
        let mut pending = JoinSet::new();
        loop {
            tokio::select! {
                Some(id) = rx.recv() => {
                    if !seen.insert(id) {
                        trace!(post = %id.short_hex(), "duplicate delivery");
                        continue;
                    }
                    let facade = facade.clone();
                    pending.spawn(async move { (id, facade.view_now(&id).await) });
                }
                Some(joined) = pending.join_next() => match joined {
                    Ok((_, Ok(view))) => on_post(view),
                    Ok((id, Err(e))) => {
                        // A later redelivery may find it.
                        seen.remove(&id);
                        debug!(post = %id.short_hex(), error = %e, "post did not resolve");
                    }
                    Err(e) => debug!(error = %e, "post resolution aborted"),
                },
                else => break,
            }
        }
    });
    (tx, SubscriptionHandle::new(task))
}

/// Forward every post id that lands in one timeline shard.
pub(crate) fn shard_source(
    graph: &dyn GraphStore,
    day: &DayBucket,
    ids: mpsc::UnboundedSender<PostId>,
) -> GraphResult<SubscriptionHandle> {
    let mut sub = graph.on(&layout::timeline_shard(day))?;
    let task = tokio::spawn(async move {
        while let Some(update) = sub.next().await {
            let Some(value) = update.value else {
                continue;
            };
            let id = layout::pointed_post(&value).or_else(|| PostId::from_hex(&update.key).ok());
            if let Some(id) = id {
                if ids.send(id).is_err() {
                    break;
                }
            }
        }
    });
    Ok(SubscriptionHandle::new(task))
}
