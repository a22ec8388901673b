//! Pipeline authoring: node types, the pipeline graph,
//! and the contract every processing node implements.

pub mod base;
pub mod definition;
pub mod graph;
pub mod helpers;
pub mod plugin;
