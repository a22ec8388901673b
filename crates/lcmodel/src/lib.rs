//! Everything needed to run LCModel on a processed dataset.
//!
//! LCModel is an external program. We write its input files,
//! run it once per voxel and collect what it produces.

pub mod control;
pub mod coord;
pub mod install;
pub mod orchestrator;
pub mod raw;
pub mod runner;
pub mod summary;
