//! # xformstack
//!
//! Reconciles a host application's fixed-shape, decomposed transform with
//! the free-form, ordered transform op stacks authored on scene prims.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (op values, Euler rotations, errors)
//! - [`core`] - Time codes, the prim seam and an in-memory prim
//! - [`stack`] - Xform ops, stack schemas and the classifier
//! - [`transform`] - Decomposition engine, reconciler and op mutator
//! - [`settings`] - Persistent defaults for new transforms
//!
//! ## Example
//!
//! ```ignore
//! use xformstack::prelude::*;
//!
//! let prim = MemoryPrim::load("cube.json")?;
//! let mut xform = TransformationMatrix::new();
//! xform.bind(prim);
//! xform.enable_push_to_prim(true)?;
//! xform.translate_to(DVec3::new(1.0, 2.0, 3.0))?;
//! ```

pub mod util;
pub mod core;
pub mod stack;
pub mod transform;
pub mod settings;

// Re-export commonly used types
pub use util::{Error, Result};
pub use transform::TransformationMatrix;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{
        DMat4, DQuat, DVec3, Error, EulerRotation, OpValue, Precision, Result, RotationOrder,
    };
    pub use crate::core::{MemoryPrim, TimeCode, XformPrim};
    pub use crate::stack::{classify, SchemaRegistry, SemanticSlot, XformOp, XformOpType};
    pub use crate::transform::{Channel, DecomposedTransform, TransformationMatrix};
    pub use crate::settings::Settings;
}
