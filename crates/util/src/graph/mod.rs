//! A small append-only directed graph.
//!
//! [`graph::Graph`] is built in one pass, checked for cycles,
//! and then turned into a [`finalized::FinalizedGraph`] for fast reads.

pub mod finalized;
pub mod graph;
pub mod util;
