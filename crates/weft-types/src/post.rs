use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::tag::{extract_tags, Tag};
use crate::temporal::DayBucket;
use crate::user::UserPub;

/// Content-addressed identifier for a post.
///
/// A `PostId` is the BLAKE3 hash of a post's canonicalized immutable fields.
/// Publishing identical content always produces the same `PostId`, which makes
/// re-publishing idempotent. Serialized as a 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostId([u8; 32]);

impl PostId {
    /// Create a `PostId` from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation. This is the form used in paths.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostId({})", self.short_hex())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for PostId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PostId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        id.to_hex()
    }
}

/// An immutable post payload.
///
/// Once published the payload never changes; likes and reposts live in side
/// records so the content address stays valid. The `id` is derived from the
/// other fields by the content addresser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author_pub: UserPub,
    pub text: String,
    /// Milliseconds since the UNIX epoch (UTC).
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<PostId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

impl Post {
    /// The timeline shard this post belongs to.
    pub fn day(&self) -> Result<DayBucket, TypeError> {
        DayBucket::from_timestamp_ms(self.timestamp)
    }

    /// Hashtags found in the post text, deduplicated by slug.
    pub fn tags(&self) -> Vec<Tag> {
        extract_tags(&self.text)
    }

    /// Returns `true` if this post replies to another post.
    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Decode a payload node value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TypeError> {
        serde_json::from_value(value).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Encode as a payload node value.
    pub fn to_value(&self) -> Result<serde_json::Value, TypeError> {
        serde_json::to_value(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post {
            id: PostId::from_hash([7; 32]),
            author_pub: UserPub::from_raw([1; 32]),
            text: "hello #world".into(),
            timestamp: 1_700_000_000_000,
            reply_to: None,
            media_ref: None,
        }
    }

    #[test]
    fn hex_roundtrip() {
        let id = PostId::from_hash([0xab; 32]);
        let parsed = PostId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = PostId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            PostId::from_hex("not-hex"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = PostId::from_hash([1; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
    }

    #[test]
    fn payload_uses_camel_case_fields() {
        let value = sample_post().to_value().unwrap();
        assert!(value.get("authorPub").is_some());
        assert!(value.get("replyTo").is_none());
        assert!(value.get("mediaRef").is_none());
    }

    #[test]
    fn payload_value_roundtrip() {
        let mut post = sample_post();
        post.reply_to = Some(PostId::from_hash([2; 32]));
        post.media_ref = Some("media:abc".into());
        let decoded = Post::from_value(post.to_value().unwrap()).unwrap();
        assert_eq!(decoded, post);
        assert!(decoded.is_reply());
    }

    #[test]
    fn day_bucket_is_utc_calendar_day() {
        // 2023-11-14T22:13:20Z
        assert_eq!(sample_post().day().unwrap().to_string(), "2023-11-14");
    }

    #[test]
    fn tags_come_from_text() {
        let tags = sample_post().tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug.as_str(), "world");
    }
}
