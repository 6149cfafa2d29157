//! Likes and reposts for Weft.
//!
//! A post's payload is immutable because its id is its hash, so per-user
//! interactions live in side records next to it:
//! `posts/{id}/likes/{userPub}` and `posts/{id}/reposts/{userPub}`.
//! Undoing an interaction overwrites the record with a tombstone.
//!
//! The repost record is the one source of truth for "has this user
//! reposted this post". A repost also mirrors the post into the reposting
//! user's own post index, marked `reposted`, for feed presentation.

pub mod error;
pub mod store;

pub use error::{InteractError, InteractResult};
pub use store::InteractionStore;
