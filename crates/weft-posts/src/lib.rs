//! Post lifecycle for Weft.
//!
//! [`PostStore`] publishes content-addressed posts, reads them back by id,
//! and de-indexes them on delete. A publish writes the immutable payload,
//! a pointer in the content table `postsByHash`, and a pointer in the
//! post's UTC day shard of the timeline, then links authorship, tag, and
//! reply edges through the [`ReferenceIndex`](weft_refs::ReferenceIndex).
//!
//! Nothing here waits for replication. A delete removes the post from
//! every discovery index but leaves the payload reachable by id, because
//! replicated data cannot be recalled.

pub mod draft;
pub mod error;
pub mod store;

pub use draft::{PostDraft, Published};
pub use error::{PostError, PostResult};
pub use store::{PostStore, PostStoreConfig};
