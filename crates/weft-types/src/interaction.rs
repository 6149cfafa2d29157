use std::fmt;

use serde::{Deserialize, Serialize};

use crate::post::PostId;

/// The two kinds of per-user interaction kept in a post's side record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    Like,
    Repost,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => write!(f, "like"),
            Self::Repost => write!(f, "repost"),
        }
    }
}

/// Value stored at `posts/{id}/reposts/{userPub}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepostMark {
    pub timestamp: i64,
}

/// Value stored at `users/{userPub}/posts/{postId}`.
///
/// Authored posts and reposts share the user's post index; `reposted`
/// distinguishes the mirror entries written by a repost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPostEntry {
    pub id: PostId,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reposted: bool,
}

impl UserPostEntry {
    pub fn authored(id: PostId, timestamp: i64) -> Self {
        Self {
            id,
            timestamp,
            reposted: false,
        }
    }

    pub fn repost(id: PostId, timestamp: i64) -> Self {
        Self {
            id,
            timestamp,
            reposted: true,
        }
    }
}

/// Live interaction counts for a post, computed from the side record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub likes: usize,
    pub reposts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authored_entry_omits_reposted_flag() {
        let entry = UserPostEntry::authored(PostId::from_hash([1; 32]), 10);
        let json = serde_json::to_value(entry).unwrap();
        assert!(json.get("reposted").is_none());
        let back: UserPostEntry = serde_json::from_value(json).unwrap();
        assert!(!back.reposted);
    }

    #[test]
    fn repost_entry_carries_flag() {
        let entry = UserPostEntry::repost(PostId::from_hash([1; 32]), 10);
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["reposted"], true);
    }
}
