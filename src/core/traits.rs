//! Collaborator traits.
//!
//! The reconciler never stores op values itself. It reads and writes them
//! through [`XformPrim`], the seam to whatever scene-description engine
//! actually owns the prim.

use crate::core::TimeCode;
use crate::stack::{XformOp, XformOpType};
use crate::util::{DMat4, Error, OpValue, Precision, Result};

// ============================================================================
// Prim Traits
// ============================================================================

/// Access to one prim's transform ops.
pub trait XformPrim {
    /// Check if the prim is usable. Invalid prims are treated as unbound.
    fn is_valid(&self) -> bool {
        true
    }

    /// Get the prim name.
    fn name(&self) -> &str;

    /// Ops in authored order, plus the "resets inherited transform" flag.
    fn ordered_ops(&self) -> (Vec<XformOp>, bool);

    /// Read an op value at a time code.
    fn get(&self, op: &XformOp, time: TimeCode) -> Option<OpValue>;

    /// Write an op value at a time code.
    fn set(&mut self, op: &XformOp, value: OpValue, time: TimeCode) -> Result<()>;

    /// Number of time samples authored on the op's attribute.
    fn num_time_samples(&self, op: &XformOp) -> usize;

    /// Create (or reuse) the attribute for an op.
    ///
    /// Does not touch the op order; callers follow up with [`set_op_order`].
    ///
    /// [`set_op_order`]: XformPrim::set_op_order
    fn add_op(
        &mut self,
        op_type: XformOpType,
        precision: Precision,
        suffix: Option<&str>,
        inverted: bool,
    ) -> Result<XformOp>;

    /// Replace the authored op order.
    fn set_op_order(&mut self, ops: &[XformOp], resets_xform_stack: bool) -> Result<()>;

    /// Local matrix at a time code, composed from every op in order.
    fn local_transformation(&self, time: TimeCode) -> Result<DMat4> {
        let (ops, _) = self.ordered_ops();
        ops.iter().try_fold(DMat4::IDENTITY, |acc, op| {
            let value = self
                .get(op, time)
                .ok_or_else(|| Error::OpNotFound(op.op_name()))?;
            let m = op
                .local_matrix(&value)
                .ok_or_else(|| Error::mismatch(op.value_kind().name(), value.kind().name()))?;
            Ok(acc * m)
        })
    }
}

impl<P: XformPrim + ?Sized> XformPrim for Box<P> {
    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn ordered_ops(&self) -> (Vec<XformOp>, bool) {
        (**self).ordered_ops()
    }

    fn get(&self, op: &XformOp, time: TimeCode) -> Option<OpValue> {
        (**self).get(op, time)
    }

    fn set(&mut self, op: &XformOp, value: OpValue, time: TimeCode) -> Result<()> {
        (**self).set(op, value, time)
    }

    fn num_time_samples(&self, op: &XformOp) -> usize {
        (**self).num_time_samples(op)
    }

    fn add_op(
        &mut self,
        op_type: XformOpType,
        precision: Precision,
        suffix: Option<&str>,
        inverted: bool,
    ) -> Result<XformOp> {
        (**self).add_op(op_type, precision, suffix, inverted)
    }

    fn set_op_order(&mut self, ops: &[XformOp], resets_xform_stack: bool) -> Result<()> {
        (**self).set_op_order(ops, resets_xform_stack)
    }

    fn local_transformation(&self, time: TimeCode) -> Result<DMat4> {
        (**self).local_transformation(time)
    }
}
