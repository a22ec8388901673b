//! Core pipeline types

mod errors;
mod interaction;
mod labels;
mod node;
mod property;
mod registry;

pub use errors::*;
pub use interaction::*;
pub use labels::*;
pub use node::*;
pub use property::*;
pub use registry::*;
