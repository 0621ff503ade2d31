//! The Cartographer (Snapshot Ingest)
//!
//! Builds the channel graph from a network snapshot and derives the pruned
//! friend-of-friend view around our node.

mod ego;
mod graph;
pub mod snapshot;

pub use ego::{EgoNetwork, EgoNetworkBuilder};
pub use graph::{ChannelGraph, DuplicatePolicy};
