//! Shared test helpers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use weft_crypto::{ContentAddresser, PostFields};
use weft_graph::{GraphStore, InMemoryGraph};
use weft_types::{layout, Post, PostId, UserPub};

use crate::edge::{Edge, Found};
use crate::index::{IndexConfig, ReferenceIndex};

pub fn setup() -> (Arc<InMemoryGraph>, ReferenceIndex) {
    let graph = Arc::new(InMemoryGraph::new());
    let config = IndexConfig {
        wait: Duration::from_millis(100),
        read_repair: true,
    };
    let index = ReferenceIndex::new(graph.clone(), config);
    (graph, index)
}

pub fn make_post(author: UserPub, text: &str, timestamp: i64, reply_to: Option<PostId>) -> Post {
    let id = ContentAddresser::POST.compute(&PostFields {
        author_pub: &author,
        text,
        timestamp,
        reply_to: reply_to.as_ref(),
        media_ref: None,
    });
    Post {
        id,
        author_pub: author,
        text: text.to_string(),
        timestamp,
        reply_to,
        media_ref: None,
    }
}

/// Write a post the way the post store does, minus the timeline.
pub async fn publish_raw(graph: &InMemoryGraph, index: &ReferenceIndex, post: &Post) {
    graph
        .put(&layout::payload(&post.id), post.to_value().unwrap())
        .await
        .unwrap();
    graph
        .put(&layout::content_entry(&post.id), layout::post_pointer(&post.id))
        .await
        .unwrap();
    for edge in Edge::all_for(post) {
        index.link(&edge).await.unwrap();
    }
}

/// Collect everything delivered until the stream goes quiet.
pub async fn drain(rx: &mut mpsc::UnboundedReceiver<Found>) -> Vec<Found> {
    let mut out = Vec::new();
    while let Ok(Some(found)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
        out.push(found);
    }
    out
}
