//! Xform op stacks.
//!
//! - [`XformOp`] / [`XformOpType`] - Ops as authored on a prim
//! - [`StackSchema`] / [`SchemaRegistry`] - Canonical op layouts
//! - [`classify`] - Matching a live op sequence against the layouts

pub mod op;
pub mod schema;
pub mod classify;

pub use op::{XformOp, XformOpType, XFORM_OP_PREFIX, INVERT_PREFIX};
pub use schema::{
    OpClassification, StackSchema, SchemaRegistry, SemanticSlot, SlotKey, SlotSet, IndexPair,
    MAYA_STACK, COMMON_STACK, SINGLE_PIVOT_STACK, MATRIX_STACK,
};
pub use classify::{classify, classify_with, ClassifiedStack};
