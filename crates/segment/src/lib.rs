//! Tissue fractions from segmentation images.
//!
//! Reading segmentation images happens in a separate helper process
//! (see `mrs-seghelper`). This crate holds both sides of that boundary:
//! the request and response types, the [`SegmentationHelper`] client,
//! and the computation the helper runs.

mod client;
mod errors;
pub mod nifti;
mod protocol;
mod tissue;

pub use client::*;
pub use errors::*;
pub use protocol::*;
pub use tissue::*;
