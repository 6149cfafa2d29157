//! The persisted graph layout shared by every replica.
//!
//! Paths are `/`-separated. Changing any of these breaks compatibility with
//! data already replicated elsewhere.
//!
//! | Path | Value |
//! |------|-------|
//! | `timeline/{YYYY-MM-DD}/{postId}` | pointer to the payload |
//! | `postsByHash/{postId}` | pointer to the payload (content table) |
//! | `posts/{postId}/data` | the [`Post`](crate::Post) payload |
//! | `posts/{postId}/author` | author public key (back-edge) |
//! | `posts/{postId}/parent` | parent post id (back-edge) |
//! | `posts/{postId}/replies/{replyId}` | pointer to the reply payload |
//! | `posts/{postId}/tags/{slug}` | `{slug, name}` (back-edge) |
//! | `posts/{postId}/likes/{userPub}` | `true` or tombstone |
//! | `posts/{postId}/reposts/{userPub}` | `{timestamp}` or tombstone |
//! | `tags/{slug}/name` | display name |
//! | `tags/{slug}/posts/{postId}` | pointer to the payload |
//! | `users/{userPub}/posts/{postId}` | `{id, timestamp, reposted?}` |
//! | `users/{userPub}/profile` | [`Profile`](crate::Profile) |

use serde_json::{Map, Value};

use crate::post::PostId;
use crate::tag::TagSlug;
use crate::temporal::DayBucket;
use crate::user::UserPub;

/// Key under which a pointer object stores its target path.
pub const POINTER_KEY: &str = "#";

pub const TIMELINE: &str = "timeline";
pub const CONTENT_TABLE: &str = "postsByHash";
pub const POSTS: &str = "posts";
pub const TAGS: &str = "tags";
pub const USERS: &str = "users";

pub fn timeline_shard(day: &DayBucket) -> String {
    format!("{TIMELINE}/{day}")
}

pub fn timeline_entry(day: &DayBucket, id: &PostId) -> String {
    format!("{TIMELINE}/{day}/{id}")
}

pub fn content_entry(id: &PostId) -> String {
    format!("{CONTENT_TABLE}/{id}")
}

pub fn post_node(id: &PostId) -> String {
    format!("{POSTS}/{id}")
}

pub fn payload(id: &PostId) -> String {
    format!("{POSTS}/{id}/data")
}

pub fn post_author(id: &PostId) -> String {
    format!("{POSTS}/{id}/author")
}

pub fn post_parent(id: &PostId) -> String {
    format!("{POSTS}/{id}/parent")
}

pub fn replies(parent: &PostId) -> String {
    format!("{POSTS}/{parent}/replies")
}

pub fn reply_entry(parent: &PostId, reply: &PostId) -> String {
    format!("{POSTS}/{parent}/replies/{reply}")
}

pub fn post_tags(id: &PostId) -> String {
    format!("{POSTS}/{id}/tags")
}

pub fn post_tag_entry(id: &PostId, slug: &TagSlug) -> String {
    format!("{POSTS}/{id}/tags/{slug}")
}

pub fn likes(id: &PostId) -> String {
    format!("{POSTS}/{id}/likes")
}

pub fn like_entry(id: &PostId, user: &UserPub) -> String {
    format!("{POSTS}/{id}/likes/{user}")
}

pub fn reposts(id: &PostId) -> String {
    format!("{POSTS}/{id}/reposts")
}

pub fn repost_entry(id: &PostId, user: &UserPub) -> String {
    format!("{POSTS}/{id}/reposts/{user}")
}

pub fn tag_name(slug: &TagSlug) -> String {
    format!("{TAGS}/{slug}/name")
}

pub fn tag_posts(slug: &TagSlug) -> String {
    format!("{TAGS}/{slug}/posts")
}

pub fn tag_post_entry(slug: &TagSlug, id: &PostId) -> String {
    format!("{TAGS}/{slug}/posts/{id}")
}

pub fn user_posts(user: &UserPub) -> String {
    format!("{USERS}/{user}/posts")
}

pub fn user_post_entry(user: &UserPub, id: &PostId) -> String {
    format!("{USERS}/{user}/posts/{id}")
}

pub fn user_profile(user: &UserPub) -> String {
    format!("{USERS}/{user}/profile")
}

/// A pointer value: `{"#": path}`.
pub fn pointer(path: &str) -> Value {
    let mut map = Map::new();
    map.insert(POINTER_KEY.to_string(), Value::String(path.to_string()));
    Value::Object(map)
}

/// Pointer to a post's payload node.
pub fn post_pointer(id: &PostId) -> Value {
    pointer(&payload(id))
}

/// The target path of a pointer value, if it is one.
pub fn deref(value: &Value) -> Option<&str> {
    value.get(POINTER_KEY)?.as_str()
}

/// The post id a payload pointer targets, if it targets one.
pub fn pointed_post(value: &Value) -> Option<PostId> {
    let path = deref(value)?;
    let rest = path.strip_prefix(POSTS)?.strip_prefix('/')?;
    let id = rest.strip_suffix("/data")?;
    PostId::from_hex(id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> PostId {
        PostId::from_hash([0xaa; 32])
    }

    #[test]
    fn timeline_paths() {
        let day = DayBucket::parse("2024-05-01").unwrap();
        assert_eq!(
            timeline_entry(&day, &id()),
            format!("timeline/2024-05-01/{}", id())
        );
        assert_eq!(timeline_shard(&day), "timeline/2024-05-01");
    }

    #[test]
    fn side_record_paths() {
        let user = UserPub::from_raw([1; 32]);
        assert_eq!(
            like_entry(&id(), &user),
            format!("posts/{}/likes/{}", id(), user)
        );
        assert_eq!(
            repost_entry(&id(), &user),
            format!("posts/{}/reposts/{}", id(), user)
        );
        assert_eq!(
            user_post_entry(&user, &id()),
            format!("users/{}/posts/{}", user, id())
        );
    }

    #[test]
    fn tag_paths() {
        let slug = TagSlug::parse("world").unwrap();
        assert_eq!(tag_post_entry(&slug, &id()), format!("tags/world/posts/{}", id()));
        assert_eq!(post_tag_entry(&id(), &slug), format!("posts/{}/tags/world", id()));
    }

    #[test]
    fn pointer_roundtrip() {
        let ptr = post_pointer(&id());
        assert_eq!(deref(&ptr), Some(payload(&id()).as_str()));
        assert_eq!(pointed_post(&ptr), Some(id()));
    }

    #[test]
    fn non_pointer_values() {
        assert_eq!(deref(&Value::Bool(true)), None);
        assert_eq!(pointed_post(&pointer("users/x/profile")), None);
    }
}
