//! Senda: the name index cache of a time-series storage engine.
//!
//! Series live in a backing store under hierarchical dotted names
//! (`host.cpu.load1`) keyed by numeric IDs. Senda keeps a lazily
//! refreshed in-memory index of that name table and answers the two
//! questions a query layer asks constantly: exact identifier resolution
//! and filesystem-style pattern search over the hierarchy, without
//! paying a store round-trip per call.

#![warn(missing_docs)]

pub mod cache;
pub mod index;
pub mod model;
pub mod store;
pub mod types;
