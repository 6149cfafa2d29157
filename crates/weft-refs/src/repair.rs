//! Repairing reads.
//!
//! Each reader here prefers the authoritative source. A verified payload
//! wins over an indexed back-edge, and an indexed back-edge wins over
//! nothing. When read-repair is on and the post is still in the content
//! table, both halves of every edge the payload implies are re-issued if
//! missing, whichever edge the read was about. Deleted posts are left
//! alone so repair never undoes a delete.

use serde_json::Value;
use tracing::{info, warn};
use weft_crypto::ContentAddresser;
use weft_graph::resolve;
use weft_types::{layout, Post, PostId, Tag, UserPub};

use crate::edge::Edge;
use crate::error::RefResult;
use crate::index::ReferenceIndex;

impl ReferenceIndex {
    /// The payload of `post`, waiting up to the configured bound.
    ///
    /// Payloads that do not decode, or whose fields do not hash to `post`,
    /// are ignored.
    pub async fn payload(&self, post: &PostId) -> RefResult<Option<Post>> {
        let Some(value) = resolve(self.graph.as_ref(), &layout::payload(post), self.config.wait).await?
        else {
            return Ok(None);
        };
        let decoded = match Post::from_value(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(post = %post.short_hex(), error = %e, "undecodable payload");
                return Ok(None);
            }
        };
        if decoded.id != *post || !ContentAddresser::POST.verify(&decoded) {
            warn!(post = %post.short_hex(), "payload does not match its address");
            return Ok(None);
        }
        Ok(Some(decoded))
    }

    /// Returns `true` if `post` is in the content table.
    pub async fn is_live(&self, post: &PostId) -> RefResult<bool> {
        Ok(self.graph.get(&layout::content_entry(post)).await?.is_some())
    }

    /// Author of `post`, from the payload or the `author` back-edge.
    pub async fn post_author(&self, post: &PostId) -> RefResult<Option<UserPub>> {
        let indexed = self
            .graph
            .get(&layout::post_author(post))
            .await?
            .and_then(|v| v.as_str().and_then(|s| UserPub::from_hex(s).ok()));
        let live = self.is_live(post).await?;
        let payload = if indexed.is_none() || (live && self.config.read_repair) {
            self.payload(post).await?
        } else {
            None
        };
        if let Some(payload) = &payload {
            if live {
                self.heal_post(payload).await?;
            }
        }
        Ok(payload.map(|p| p.author_pub).or(indexed))
    }

    /// Parent of `post`, from the payload or the `parent` back-edge.
    pub async fn parent_post(&self, post: &PostId) -> RefResult<Option<PostId>> {
        let indexed = self
            .graph
            .get(&layout::post_parent(post))
            .await?
            .and_then(|v| v.as_str().and_then(|s| PostId::from_hex(s).ok()));
        let live = self.is_live(post).await?;
        let payload = if indexed.is_none() || (live && self.config.read_repair) {
            self.payload(post).await?
        } else {
            None
        };
        match payload {
            Some(payload) => {
                if live {
                    self.heal_post(&payload).await?;
                }
                Ok(payload.reply_to)
            }
            None => Ok(indexed),
        }
    }

    /// Tags of `post`.
    ///
    /// For a live post the payload text is authoritative and every tag edge
    /// it implies is healed. Otherwise only the indexed tags are returned,
    /// which for a deleted post is nothing.
    pub async fn post_tags(&self, post: &PostId) -> RefResult<Vec<Tag>> {
        let indexed: Vec<Tag> = self
            .graph
            .children(&layout::post_tags(post))
            .await?
            .into_iter()
            .filter_map(|(_, value)| serde_json::from_value(value).ok())
            .collect();
        if !self.is_live(post).await? {
            return Ok(indexed);
        }
        let Some(payload) = self.payload(post).await? else {
            return Ok(indexed);
        };
        self.heal_post(&payload).await?;
        Ok(payload.tags())
    }

    /// Re-issue the missing halves of every edge `post` implies. Returns the
    /// number of edges touched.
    ///
    /// Only for live posts: healing a de-indexed one re-links it.
    pub async fn heal_post(&self, post: &Post) -> RefResult<usize> {
        let mut healed = 0;
        for edge in Edge::all_for(post) {
            if self.heal(&edge).await? {
                healed += 1;
            }
        }
        Ok(healed)
    }

    /// Re-issue whichever half of `edge` is missing. Returns `true` if
    /// anything was written.
    async fn heal(&self, edge: &Edge) -> RefResult<bool> {
        if !self.config.read_repair {
            return Ok(false);
        }
        let mut healed = false;
        if self.graph.get(&edge.forward_path()).await?.is_none() {
            self.graph
                .put(&edge.forward_path(), edge.forward_value()?)
                .await?;
            healed = true;
        }
        if self.graph.get(&edge.backward_path()).await?.is_none() {
            self.graph
                .put(&edge.backward_path(), edge.backward_value()?)
                .await?;
            healed = true;
        }
        if let Edge::Tagging { tag, .. } = edge {
            let name = layout::tag_name(&tag.slug);
            if self.graph.get(&name).await?.is_none() {
                self.graph.put(&name, Value::String(tag.name.clone())).await?;
                healed = true;
            }
        }
        if healed {
            info!(%edge, "read-repair re-issued missing edge");
        }
        Ok(healed)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{make_post, publish_raw, setup};
    use crate::index::{IndexConfig, ReferenceIndex};
    use std::sync::Arc;
    use std::time::Duration;
    use weft_graph::{GraphStore, InMemoryGraph};
    use weft_types::{layout, TagSlug, UserPub};

    #[tokio::test]
    async fn author_falls_back_to_payload_and_heals() {
        let (graph, index) = setup();
        let post = make_post(UserPub::from_raw([1; 32]), "hi", 1_000, None);
        graph.drop_writes_under(layout::post_author(&post.id));
        publish_raw(&graph, &index, &post).await;
        graph.heal();
        assert_eq!(graph.get(&layout::post_author(&post.id)).await.unwrap(), None);

        assert_eq!(index.post_author(&post.id).await.unwrap(), Some(post.author_pub));
        assert!(graph.get(&layout::post_author(&post.id)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lost_forward_half_is_healed_from_back_edge_read() {
        let (graph, index) = setup();
        let post = make_post(UserPub::from_raw([2; 32]), "hi", 1_000, None);
        let forward = layout::user_post_entry(&post.author_pub, &post.id);
        graph.drop_writes_under(forward.clone());
        publish_raw(&graph, &index, &post).await;
        graph.heal();
        assert_eq!(graph.get(&forward).await.unwrap(), None);

        index.post_author(&post.id).await.unwrap();
        assert!(graph.get(&forward).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn author_read_heals_the_other_edges_too() {
        let (graph, index) = setup();
        let post = make_post(UserPub::from_raw([9; 32]), "see #also", 1_000, None);
        let also = TagSlug::parse("also").unwrap();
        let forward = layout::tag_post_entry(&also, &post.id);
        graph.drop_writes_under(forward.clone());
        publish_raw(&graph, &index, &post).await;
        graph.heal();

        index.post_author(&post.id).await.unwrap();
        assert!(graph.get(&forward).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn parent_falls_back_to_payload() {
        let (graph, index) = setup();
        let parent = make_post(UserPub::from_raw([3; 32]), "root", 1_000, None);
        let reply = make_post(UserPub::from_raw([4; 32]), "re", 2_000, Some(parent.id));
        publish_raw(&graph, &index, &parent).await;
        graph.drop_writes_under(layout::post_parent(&reply.id));
        publish_raw(&graph, &index, &reply).await;
        graph.heal();

        assert_eq!(index.parent_post(&reply.id).await.unwrap(), Some(parent.id));
        assert!(graph.get(&layout::post_parent(&reply.id)).await.unwrap().is_some());
        assert_eq!(index.parent_post(&parent.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tags_come_from_payload_and_heal_the_index() {
        let (graph, index) = setup();
        let post = make_post(UserPub::from_raw([5; 32]), "#one #Two", 1_000, None);
        graph.drop_writes_under(format!("posts/{}/tags", post.id));
        publish_raw(&graph, &index, &post).await;
        graph.heal();

        let slugs: Vec<String> = index
            .post_tags(&post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.slug.to_string())
            .collect();
        assert_eq!(slugs, ["one", "two"]);
        let two = TagSlug::parse("two").unwrap();
        assert!(graph
            .get(&layout::post_tag_entry(&post.id, &two))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn deleted_posts_are_never_repaired() {
        let (graph, index) = setup();
        let post = make_post(UserPub::from_raw([6; 32]), "#gone", 1_000, None);
        publish_raw(&graph, &index, &post).await;
        graph.remove(&layout::content_entry(&post.id)).await.unwrap();
        for edge in crate::Edge::all_for(&post) {
            index.unlink(&edge).await.unwrap();
        }

        assert!(index.post_tags(&post.id).await.unwrap().is_empty());
        assert_eq!(index.post_author(&post.id).await.unwrap(), Some(post.author_pub));
        assert_eq!(graph.get(&layout::post_author(&post.id)).await.unwrap(), None);
        assert_eq!(
            graph
                .get(&layout::user_post_entry(&post.author_pub, &post.id))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn repair_can_be_disabled() {
        let graph = Arc::new(InMemoryGraph::new());
        let index = ReferenceIndex::new(
            graph.clone(),
            IndexConfig {
                wait: Duration::from_millis(50),
                read_repair: false,
            },
        );
        let post = make_post(UserPub::from_raw([7; 32]), "hi", 1_000, None);
        graph.drop_writes_under(layout::post_author(&post.id));
        publish_raw(&graph, &index, &post).await;
        graph.heal();

        assert_eq!(index.post_author(&post.id).await.unwrap(), Some(post.author_pub));
        assert_eq!(graph.get(&layout::post_author(&post.id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tampered_payload_is_ignored() {
        let (graph, index) = setup();
        let mut post = make_post(UserPub::from_raw([8; 32]), "honest", 1_000, None);
        post.text = "forged".into();
        graph
            .put(&layout::payload(&post.id), post.to_value().unwrap())
            .await
            .unwrap();
        assert_eq!(index.payload(&post.id).await.unwrap(), None);
    }
}
