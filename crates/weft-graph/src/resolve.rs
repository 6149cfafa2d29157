//! Bounded-wait reads.
//!
//! The store never says "this does not exist"; a value may simply not have
//! propagated yet. These helpers wait up to a bound for it to arrive, and
//! only then report absence.

use std::time::Duration;

use serde_json::Value;
use tracing::trace;
use weft_types::layout;

use crate::error::{GraphError, GraphResult};
use crate::path;
use crate::traits::GraphStore;

/// Read `full_path`, waiting up to `wait` for it to appear.
///
/// Returns `Err(Timeout)` if the store does not answer the initial read in
/// time, and `Ok(None)` if it answered but nothing arrived within `wait`.
pub async fn resolve(
    graph: &dyn GraphStore,
    full_path: &str,
    wait: Duration,
) -> GraphResult<Option<Value>> {
    let (node, key) = path::split(full_path)?;
    let first = tokio::time::timeout(wait, graph.get(full_path))
        .await
        .map_err(|_| GraphError::Timeout {
            path: full_path.to_string(),
            waited_ms: wait.as_millis() as u64,
        })??;
    if first.is_some() {
        return Ok(first);
    }

    let mut sub = graph.on(node)?;
    let arrival = async {
        while let Some(update) = sub.next().await {
            if update.key == key {
                if let Some(value) = update.value {
                    return Some(value);
                }
            }
        }
        None
    };
    let resolved = tokio::time::timeout(wait, arrival).await.ok().flatten();
    trace!(path = %full_path, found = resolved.is_some(), "resolved after wait");
    Ok(resolved)
}

/// Resolve a pointer stored at `full_path`, then the value it points to.
///
/// A known pointer whose target has not arrived yet resolves to `None`
/// after the wait; that is a transient state, not a fault.
pub async fn resolve_pointer(
    graph: &dyn GraphStore,
    full_path: &str,
    wait: Duration,
) -> GraphResult<Option<Value>> {
    let Some(pointer) = resolve(graph, full_path, wait).await? else {
        return Ok(None);
    };
    match layout::deref(&pointer) {
        Some(target) => resolve(graph, target, wait).await,
        None => Ok(Some(pointer)),
    }
}
