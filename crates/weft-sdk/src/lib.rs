//! High-level SDK for Weft.
//!
//! [`Weft`] wires a graph store, an identity, and a media uploader into the
//! full protocol stack and exposes the upward API a client builds on.
//! Action-style calls (publish, delete, like, repost, profile update) never
//! fail outright; they return an [`ActionResult`] to branch on. Feed and
//! lookup calls return a
//! [`SubscriptionHandle`](weft_graph::SubscriptionHandle) that must be kept
//! alive for as long as updates are wanted.

pub mod client;
pub mod config;
pub mod error;
pub mod media;
pub mod result;

pub use client::Weft;
pub use config::WeftConfig;
pub use error::{SdkError, SdkResult};
pub use media::{InMemoryMediaUploader, MediaUploader};
pub use result::{ActionError, ActionResult};

// Re-export key types
pub use weft_crypto::{IdentityProvider, KeyIdentity, SigningKey};
pub use weft_graph::{GraphStore, InMemoryGraph, SubscriptionHandle};
pub use weft_posts::{PostDraft, Published};
pub use weft_query::PostView;
pub use weft_types::{
    DayBucket, ErrorKind, InteractionCounts, Post, PostId, Profile, Tag, TagSlug, UserPub,
};
