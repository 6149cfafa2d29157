//! Cryptographic primitives for Weft.
//!
//! Provides the domain-separated BLAKE3 content addresser that gives posts
//! their identity, and the ed25519 key identity that attributes writes.
//!
//! Hashing and key handling wrap `blake3` and `ed25519-dalek` directly.

pub mod addresser;
pub mod identity;

pub use addresser::{ContentAddresser, PostFields};
pub use identity::{IdentityError, IdentityProvider, KeyIdentity, SigningKey};
