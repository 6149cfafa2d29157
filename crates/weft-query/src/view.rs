use serde::Serialize;
use weft_types::{InteractionCounts, Post, Profile};

/// A post as a feed delivers it: the payload plus whatever enrichment
/// resolved in time.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub post: Post,
    /// `None` until the author's profile resolves.
    pub author: Option<Profile>,
    pub counts: InteractionCounts,
}

impl PostView {
    /// Author display name, falling back to the short key.
    pub fn author_name(&self) -> String {
        match &self.author {
            Some(profile) => profile.display_name.clone(),
            None => self.post.author_pub.short_id(),
        }
    }
}
