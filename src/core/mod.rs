//! Core layer - time codes, the prim collaborator trait, and an in-memory prim.
//!
//! This module provides:
//! - [`TimeCode`] / [`TimeSamples`] - Time selection and sampled values
//! - [`XformPrim`] - Access to a prim's transform ops
//! - [`MemoryPrim`] - A complete in-memory [`XformPrim`] with JSON I/O

mod time;
mod traits;
mod memory;

pub use time::{TimeCode, TimeSamples};
pub use traits::XformPrim;
pub use memory::{MemoryPrim, OpDescription, PrimDescription, RawValue};
