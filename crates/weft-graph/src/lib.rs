//! Path-addressable graph store for Weft.
//!
//! The protocol runs on top of an eventually-consistent, replicated store
//! with no transactions. This crate pins down the part of that store the
//! protocol relies on ([`GraphStore`]) and ships an in-process replica
//! ([`InMemoryGraph`]) used by tests, the CLI, and embedders.
//!
//! # Delivery Model
//!
//! - Writes are single-path overwrites; a `null` value is a tombstone.
//! - Live subscriptions ([`GraphStore::on`]) replay a node's current
//!   children, then push every later write. Delivery is at-least-once:
//!   consumers deduplicate by key.
//! - Absence is never authoritative. [`resolve`] waits a bounded time for a
//!   value to arrive before reporting it missing.
//! - Long-lived reads are owned by a [`SubscriptionHandle`]; dropping or
//!   cancelling it releases the underlying live queries.

pub mod error;
pub mod memory;
pub mod path;
pub mod resolve;
mod router;
pub mod snapshot;
pub mod subscription;
pub mod traits;

pub use error::{GraphError, GraphResult};
pub use memory::InMemoryGraph;
pub use resolve::{resolve, resolve_pointer};
pub use snapshot::{GraphSnapshot, SnapshotEntry};
pub use subscription::{NodeUpdate, Subscription, SubscriptionHandle};
pub use traits::GraphStore;
