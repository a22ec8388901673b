//! The data that flows through a processing chain.
//!
//! A [`Dataset`] is immutable once built. Processing steps
//! read one and produce a new one.

mod adjust;
mod dataset;
mod header;
mod info;
mod loader;
mod nucleus;

pub use adjust::*;
pub use dataset::*;
pub use header::*;
pub use info::*;
pub use loader::*;
pub use nucleus::*;

pub use rustfft::num_complex::Complex64 as Complex;
