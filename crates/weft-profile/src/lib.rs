//! Profile lookups for Weft.
//!
//! [`ProfileCache`] maps a user's public key to the last profile seen for
//! it. It is an injectable service: each owner decides its lifetime, and
//! nothing expires on its own. Concurrent lookups for one key share a
//! single fetch. A cached value is returned immediately while a refresh
//! runs in the background; subscribers to [`ProfileCache::watch`] hear
//! about profiles that changed.

pub mod cache;
pub mod error;

pub use cache::{ProfileCache, ProfileConfig};
pub use error::{ProfileError, ProfileResult};
