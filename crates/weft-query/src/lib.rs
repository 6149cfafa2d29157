//! Read paths for Weft.
//!
//! [`QueryFacade`] composes the post store, the reference index, the
//! interaction store, and the profile cache into the feeds a client
//! renders. Every feed is a live subscription: it pushes [`PostView`]s to a
//! callback as posts resolve, deduplicates by post id, and runs until the
//! returned [`SubscriptionHandle`](weft_graph::SubscriptionHandle) is
//! cancelled or dropped.
//!
//! Feeds make no promise about order. Posts resolve concurrently and each
//! one is delivered as soon as its payload and enrichment are in.

pub mod error;
pub mod facade;
pub mod feed;
pub mod view;

pub use error::{QueryError, QueryResult};
pub use facade::{QueryConfig, QueryFacade};
pub use view::PostView;
