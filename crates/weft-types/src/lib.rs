//! Foundation types for Weft, a decentralized social-graph protocol.
//!
//! This crate provides the identifiers, payloads, and persisted layout used by
//! every other Weft crate. It has no knowledge of the graph store itself; it
//! only describes *what* is written and *where*.
//!
//! # Key Types
//!
//! - [`PostId`] — Content-addressed post identifier (BLAKE3 hash)
//! - [`UserPub`] — A user's public key, the identity behind every write
//! - [`Post`] — Immutable post payload
//! - [`Tag`] / [`TagSlug`] — Hashtags extracted from post text
//! - [`Profile`] — Mutable, user-owned profile snapshot
//! - [`DayBucket`] — UTC calendar day used to shard the timeline
//! - [`ErrorKind`] — The protocol's failure taxonomy
//!
//! The [`layout`] module defines the path convention shared by all replicas.

pub mod error;
pub mod interaction;
pub mod layout;
pub mod post;
pub mod profile;
pub mod tag;
pub mod temporal;
pub mod user;

pub use error::{ErrorKind, TypeError};
pub use interaction::{InteractionCounts, InteractionKind, RepostMark, UserPostEntry};
pub use post::{Post, PostId};
pub use profile::Profile;
pub use tag::{extract_tags, Tag, TagSlug};
pub use temporal::{now_ms, DayBucket};
pub use user::UserPub;
