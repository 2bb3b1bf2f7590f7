//! Utility types and functions.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`OpValue`] / [`Precision`] - Typed op values
//! - Math type re-exports from glam plus Euler rotations

mod error;
mod math;
mod value;

pub use error::*;
pub use math::*;
pub use value::*;
