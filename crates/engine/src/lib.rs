//! Runs a pipeline over loaded data, one step at a time,
//! and fits the result with LCModel.

pub mod batch;
pub mod context;
pub mod engine;
pub mod errors;
pub mod history;
pub mod output;
pub mod settings;
pub mod worker;

#[cfg(test)]
mod testutil;
