//! Bidirectional reference index for Weft.
//!
//! The graph store has no transactions, so every relation is written twice,
//! once in each direction, as independent writes. Either half can be lost.
//! This crate owns both halves and heals whichever one is missing when it
//! is read.
//!
//! # Architecture
//!
//! - **Edges** ([`Edge`]) are the three relation families: authorship,
//!   tagging, and reply. Each knows its forward and backward path.
//! - **Traversals** ([`EdgeKind`]) walk one direction of one family and
//!   stream what they find, deduplicated, until cancelled.
//! - **Read-repair** falls back to the inverse edge or to the post payload
//!   when an indexed edge is missing, and re-issues the missing write. A
//!   post that is no longer in the content table is never repaired.
//!
//! # Modules
//!
//! - [`error`] — Error types for index operations
//! - [`edge`] — [`Edge`] and [`EdgeKind`]
//! - [`index`] — The [`ReferenceIndex`] itself
//! - [`repair`] — Repairing reads of single-valued back-edges

pub mod edge;
pub mod error;
pub mod index;
pub mod repair;

#[cfg(test)]
mod fixtures;

pub use edge::{Edge, EdgeFamily, EdgeKind, Found};
pub use error::{RefError, RefResult};
pub use index::{IndexConfig, ReferenceIndex};
