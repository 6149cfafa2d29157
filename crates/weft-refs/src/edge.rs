//! Edges and traversal directions.

use std::fmt;

use serde_json::Value;
use weft_types::{layout, Post, PostId, Tag, UserPostEntry, UserPub};

use crate::error::{RefError, RefResult};

/// The three relation families kept in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeFamily {
    Authorship,
    Tagging,
    Reply,
}

/// One relation, with enough data to write either half.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    /// `users/{author}/posts/{post}` and `posts/{post}/author`.
    Authorship {
        author: UserPub,
        post: PostId,
        timestamp: i64,
    },
    /// `tags/{slug}/posts/{post}` and `posts/{post}/tags/{slug}`.
    Tagging { tag: Tag, post: PostId },
    /// `posts/{parent}/replies/{reply}` and `posts/{reply}/parent`.
    Reply { parent: PostId, reply: PostId },
}

impl Edge {
    pub fn authorship(post: &Post) -> Self {
        Self::Authorship {
            author: post.author_pub,
            post: post.id,
            timestamp: post.timestamp,
        }
    }

    /// The reply edge of `post`, if it replies to anything.
    pub fn reply(post: &Post) -> Option<Self> {
        post.reply_to.map(|parent| Self::Reply {
            parent,
            reply: post.id,
        })
    }

    pub fn taggings(post: &Post) -> Vec<Self> {
        post.tags()
            .into_iter()
            .map(|tag| Self::Tagging { tag, post: post.id })
            .collect()
    }

    /// Every edge a published post participates in as the child side.
    pub fn all_for(post: &Post) -> Vec<Self> {
        let mut edges = vec![Self::authorship(post)];
        edges.extend(Self::taggings(post));
        edges.extend(Self::reply(post));
        edges
    }

    pub fn family(&self) -> EdgeFamily {
        match self {
            Self::Authorship { .. } => EdgeFamily::Authorship,
            Self::Tagging { .. } => EdgeFamily::Tagging,
            Self::Reply { .. } => EdgeFamily::Reply,
        }
    }

    /// Path of the forward half (parent side to child).
    pub fn forward_path(&self) -> String {
        match self {
            Self::Authorship { author, post, .. } => layout::user_post_entry(author, post),
            Self::Tagging { tag, post } => layout::tag_post_entry(&tag.slug, post),
            Self::Reply { parent, reply } => layout::reply_entry(parent, reply),
        }
    }

    /// Path of the backward half (child side to parent).
    pub fn backward_path(&self) -> String {
        match self {
            Self::Authorship { post, .. } => layout::post_author(post),
            Self::Tagging { tag, post } => layout::post_tag_entry(post, &tag.slug),
            Self::Reply { reply, .. } => layout::post_parent(reply),
        }
    }

    pub fn forward_value(&self) -> RefResult<Value> {
        match self {
            Self::Authorship {
                post, timestamp, ..
            } => encode(&UserPostEntry::authored(*post, *timestamp)),
            Self::Tagging { post, .. } => Ok(layout::post_pointer(post)),
            Self::Reply { reply, .. } => Ok(layout::post_pointer(reply)),
        }
    }

    pub fn backward_value(&self) -> RefResult<Value> {
        match self {
            Self::Authorship { author, .. } => Ok(Value::String(author.to_hex())),
            Self::Tagging { tag, .. } => encode(tag),
            Self::Reply { parent, .. } => Ok(Value::String(parent.to_hex())),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorship { author, post, .. } => {
                write!(f, "author {} -> {}", author.short_id(), post.short_hex())
            }
            Self::Tagging { tag, post } => write!(f, "tag #{} -> {}", tag.slug, post.short_hex()),
            Self::Reply { parent, reply } => {
                write!(f, "reply {} -> {}", parent.short_hex(), reply.short_hex())
            }
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> RefResult<Value> {
    serde_json::to_value(value).map_err(|e| RefError::Serialization(e.to_string()))
}

/// A traversal direction: one family walked from one side.
///
/// The anchor is the node the traversal starts from. Its form depends on
/// the kind: a user public key, a tag slug, or a post id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// User to the posts in their index.
    AuthorPosts,
    /// Post to its author.
    PostAuthor,
    /// Tag to its posts.
    TagPosts,
    /// Post to its tags.
    PostTags,
    /// Post to its replies.
    ParentReplies,
    /// Reply to its parent.
    ReplyParent,
}

impl EdgeKind {
    pub fn family(&self) -> EdgeFamily {
        match self {
            Self::AuthorPosts | Self::PostAuthor => EdgeFamily::Authorship,
            Self::TagPosts | Self::PostTags => EdgeFamily::Tagging,
            Self::ParentReplies | Self::ReplyParent => EdgeFamily::Reply,
        }
    }

    /// The same family walked the other way.
    pub fn inverse(&self) -> Self {
        match self {
            Self::AuthorPosts => Self::PostAuthor,
            Self::PostAuthor => Self::AuthorPosts,
            Self::TagPosts => Self::PostTags,
            Self::PostTags => Self::TagPosts,
            Self::ParentReplies => Self::ReplyParent,
            Self::ReplyParent => Self::ParentReplies,
        }
    }

    /// Returns `true` for the child-to-parent directions.
    pub fn is_backward(&self) -> bool {
        matches!(self, Self::PostAuthor | Self::PostTags | Self::ReplyParent)
    }

    /// Node whose children this traversal watches.
    pub(crate) fn node(&self, anchor: &str) -> String {
        match self {
            Self::AuthorPosts => format!("{}/{anchor}/posts", layout::USERS),
            Self::TagPosts => format!("{}/{anchor}/posts", layout::TAGS),
            Self::PostTags => format!("{}/{anchor}/tags", layout::POSTS),
            Self::ParentReplies => format!("{}/{anchor}/replies", layout::POSTS),
            Self::PostAuthor | Self::ReplyParent => format!("{}/{anchor}", layout::POSTS),
        }
    }

    /// Turn one child of the watched node into a result, if it is one.
    pub(crate) fn found(&self, key: String, value: Value) -> Option<Found> {
        let single_key = match self {
            Self::PostAuthor => "author",
            Self::ReplyParent => "parent",
            _ => return Some(Found { target: key, value }),
        };
        if key != single_key {
            return None;
        }
        let target = value.as_str()?.to_string();
        Some(Found { target, value })
    }

    /// Order a snapshot of children before delivery.
    ///
    /// A user's post index is delivered oldest first; other snapshots keep
    /// arrival order.
    pub(crate) fn order(&self, mut children: Vec<(String, Value)>) -> Vec<(String, Value)> {
        if *self == Self::AuthorPosts {
            children.sort_by_key(|(_, value)| {
                value
                    .get("timestamp")
                    .and_then(Value::as_i64)
                    .unwrap_or_default()
            });
        }
        children
    }
}

/// One result of a traversal.
#[derive(Clone, Debug, PartialEq)]
pub struct Found {
    /// The far end of the edge: a post id, user public key, or tag slug.
    pub target: String,
    /// The stored edge value.
    pub value: Value,
}
