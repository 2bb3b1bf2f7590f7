//! Tweak-tracking reconciler - host channel setters.
//!
//! Every setter follows the same protocol: reject locked channels, edit the
//! host value, recompute the channel's tweak against the last sample, and,
//! when writes are enabled, make sure a backing op exists and push.

use tracing::{debug, warn};

use super::decomposed::DecomposedTransform;
use super::matrix::TransformationMatrix;
use super::Channel;
use crate::core::XformPrim;
use crate::stack::{SemanticSlot, XformOpType, SINGLE_PIVOT_STACK};
use crate::util::{DQuat, DVec3, Error, EulerRotation, Result, RotationOrder};

impl<P: XformPrim> TransformationMatrix<P> {
    // ========================================================================
    // Translation / scale / shear
    // ========================================================================

    pub fn translate_to(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::translate_to {:?}", v);
        self.edit(&[Channel::Translate], |t| t.translate_to(v))
    }

    pub fn translate_by(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::translate_by {:?}", v);
        self.edit(&[Channel::Translate], |t| t.translate_by(v))
    }

    pub fn scale_to(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::scale_to {:?}", v);
        self.edit(&[Channel::Scale], |t| t.scale_to(v))
    }

    pub fn scale_by(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::scale_by {:?}", v);
        self.edit(&[Channel::Scale], |t| t.scale_by(v))
    }

    pub fn shear_to(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::shear_to {:?}", v);
        self.edit(&[Channel::Shear], |t| t.shear_to(v))
    }

    pub fn shear_by(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::shear_by {:?}", v);
        self.edit(&[Channel::Shear], |t| t.shear_by(v))
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    pub fn rotate_to(&mut self, e: EulerRotation) -> Result<()> {
        debug!("TransformationMatrix::rotate_to {:?}", e);
        self.edit(&[Channel::Rotate], |t| t.rotate_to(e))
    }

    pub fn rotate_by(&mut self, e: EulerRotation) -> Result<()> {
        debug!("TransformationMatrix::rotate_by {:?}", e);
        self.edit(&[Channel::Rotate], |t| t.rotate_by(e))
    }

    pub fn rotate_to_quat(&mut self, q: DQuat) -> Result<()> {
        debug!("TransformationMatrix::rotate_to_quat {:?}", q);
        self.edit(&[Channel::Rotate], |t| t.rotate_to_quat(q))
    }

    pub fn rotate_by_quat(&mut self, q: DQuat) -> Result<()> {
        debug!("TransformationMatrix::rotate_by_quat {:?}", q);
        self.edit(&[Channel::Rotate], |t| t.rotate_by_quat(q))
    }

    /// Change the rotation order.
    ///
    /// Fails on a bound prim: authored rotate ops cannot be remapped to a
    /// new order. Unbound, the current orientation is re-expressed.
    pub fn set_rotation_order(&mut self, order: RotationOrder) -> Result<()> {
        if self.prim.is_some() {
            warn!("set_rotation_order: rotation order is fixed while bound");
            return Err(Error::RotationOrderLocked);
        }
        self.current.rotation = self.current.rotation.reorder(order);
        self.sampled.rotation = self.sampled.rotation.reorder(order);
        self.tweak.capture(Channel::Rotate, &self.current, &self.sampled);
        Ok(())
    }

    /// Set the rotate orientation; with `balance` the rotation compensates.
    pub fn set_rotate_orientation(&mut self, q: DQuat, balance: bool) -> Result<()> {
        debug!("TransformationMatrix::set_rotate_orientation {:?}", q);
        let channels: &[Channel] = if balance {
            &[Channel::RotateOrientation, Channel::Rotate]
        } else {
            &[Channel::RotateOrientation]
        };
        self.edit(channels, |t| t.set_rotate_orientation(q, balance))
    }

    pub fn set_rotate_orientation_euler(&mut self, e: EulerRotation, balance: bool) -> Result<()> {
        self.set_rotate_orientation(e.to_quat(), balance)
    }

    // ========================================================================
    // Pivots
    // ========================================================================

    /// Set the rotate pivot; with `balance` the pivot translation compensates.
    pub fn set_rotate_pivot(&mut self, pivot: DVec3, balance: bool) -> Result<()> {
        debug!("TransformationMatrix::set_rotate_pivot {:?}", pivot);
        let channels: &[Channel] = if balance {
            &[Channel::RotatePivot, Channel::RotatePivotTranslate]
        } else {
            &[Channel::RotatePivot]
        };
        self.edit(channels, |t| t.set_rotate_pivot(pivot, balance))
    }

    /// Set the scale pivot; with `balance` the pivot translation compensates.
    pub fn set_scale_pivot(&mut self, pivot: DVec3, balance: bool) -> Result<()> {
        debug!("TransformationMatrix::set_scale_pivot {:?}", pivot);
        let channels: &[Channel] = if balance {
            &[Channel::ScalePivot, Channel::ScalePivotTranslate]
        } else {
            &[Channel::ScalePivot]
        };
        self.edit(channels, |t| t.set_scale_pivot(pivot, balance))
    }

    pub fn set_rotate_pivot_translation(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::set_rotate_pivot_translation {:?}", v);
        self.edit(&[Channel::RotatePivotTranslate], |t| t.set_rotate_pivot_translation(v))
    }

    pub fn set_scale_pivot_translation(&mut self, v: DVec3) -> Result<()> {
        debug!("TransformationMatrix::set_scale_pivot_translation {:?}", v);
        self.edit(&[Channel::ScalePivotTranslate], |t| t.set_scale_pivot_translation(v))
    }

    // ========================================================================
    // Mode toggles
    // ========================================================================

    /// Enable or disable writing host edits into the stack.
    ///
    /// Enabling at the default time resynchronises: every channel that has
    /// an op or a non-default value is committed, so the stack gains the
    /// ops it structurally needs.
    pub fn enable_push_to_prim(&mut self, enabled: bool) -> Result<()> {
        self.external.push_to_prim = enabled;
        if enabled && self.prim.is_some() && self.time.is_default() {
            self.resync()?;
        }
        Ok(())
    }

    /// Enable or disable re-reading animated values; enabling resynchronises.
    pub fn enable_read_animated_values(&mut self, enabled: bool) -> Result<()> {
        self.external.read_animated_values = enabled;
        if enabled && self.prim.is_some() {
            self.resync()?;
        }
        Ok(())
    }

    fn resync(&mut self) -> Result<()> {
        if !self.push_to_prim_enabled() {
            return Ok(());
        }
        debug!("TransformationMatrix::resync");
        if self.derived.push_prim_to_matrix {
            return self.push_to_prim();
        }
        let channels: Vec<Channel> = Channel::ALL
            .into_iter()
            .filter(|&ch| self.has_channel_op(ch) || !self.current.is_default(ch))
            .collect();
        self.commit(&channels)
    }

    // ========================================================================
    // Protocol
    // ========================================================================

    fn edit<F>(&mut self, channels: &[Channel], f: F) -> Result<()>
    where
        F: FnOnce(&mut DecomposedTransform),
    {
        if let Some(&locked) = channels.iter().find(|&&ch| self.external.locks.is_locked(ch)) {
            return Err(Error::Locked(locked));
        }
        f(&mut self.current);
        self.commit(channels)
    }

    /// Refresh tweaks and, when writes are enabled, write the channels back.
    fn commit(&mut self, channels: &[Channel]) -> Result<()> {
        for &ch in channels {
            self.tweak.capture(ch, &self.current, &self.sampled);
        }
        if !self.push_to_prim_enabled() {
            return Ok(());
        }
        for &ch in channels {
            self.ensure_backing_op(ch)?;
        }
        self.push_to_prim()
    }

    /// Make sure an op exists for `channel` if its value needs one.
    fn ensure_backing_op(&mut self, channel: Channel) -> Result<()> {
        if self.derived.push_prim_to_matrix {
            return Ok(());
        }
        if matches!(channel, Channel::RotatePivot | Channel::ScalePivot) && self.derived.has_combined_pivot() {
            self.split_pivot_if_needed()?;
            return Ok(());
        }
        if self.derived.has_slot(channel.slot()) || self.current.is_default(channel) {
            return Ok(());
        }
        if self.derived.has_combined_pivot() && !self.single_pivot_slot(channel.slot()) {
            // the slot only exists in the native layout
            self.split_pivot_forced()?;
            if self.derived.has_slot(channel.slot()) {
                return Ok(());
            }
        }
        self.insert_channel_op(channel)
    }

    fn single_pivot_slot(&self, slot: SemanticSlot) -> bool {
        self.registry
            .get(SINGLE_PIVOT_STACK)
            .is_some_and(|schema| schema.contains(slot))
    }

    fn insert_channel_op(&mut self, channel: Channel) -> Result<()> {
        let precision = self.insert_precision;
        let slot = channel.slot();
        match channel {
            Channel::Translate => self.insert_op(XformOpType::Translate, precision, slot, true),
            Channel::Rotate => {
                let op_type = XformOpType::from_rotation_order(self.current.rotation_order());
                self.insert_op(op_type, precision, slot, false)
            }
            Channel::RotateOrientation => self.insert_op(XformOpType::RotateXYZ, precision, slot, false),
            Channel::Shear => self.insert_op(XformOpType::Transform, precision, slot, false),
            Channel::Scale => self.insert_op(XformOpType::Scale, precision, slot, false),
            Channel::RotatePivot
            | Channel::RotatePivotTranslate
            | Channel::ScalePivot
            | Channel::ScalePivotTranslate => self.insert_op(XformOpType::Translate, precision, slot, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryPrim, TimeCode};
    use crate::stack::{XformOp, MAYA_STACK};
    use crate::util::{approx_eq, OpValue, Precision};

    fn bound(prim: MemoryPrim) -> TransformationMatrix<MemoryPrim> {
        let mut m = TransformationMatrix::new();
        m.bind(prim);
        m.enable_push_to_prim(true).unwrap();
        m
    }

    fn names(m: &TransformationMatrix<MemoryPrim>) -> Vec<String> {
        m.prim().map(MemoryPrim::op_order_names).unwrap_or_default()
    }

    #[test]
    fn test_translate_authors_first() {
        let scale = XformOp::new(XformOpType::Scale, Precision::Float, None);
        let prim = MemoryPrim::new("a")
            .with_op(scale, Some(OpValue::Vec3f(glam::Vec3::splat(2.0))))
            .unwrap();
        let mut m = bound(prim);
        m.translate_to(DVec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(names(&m), ["xformOp:translate", "xformOp:scale"]);
        assert!(m.tweaks().is_zero());
        let value = m.prim().and_then(|p| p.value("xformOp:translate", TimeCode::Default));
        assert_eq!(value, Some(OpValue::Vec3f(glam::Vec3::new(1.0, 2.0, 3.0))));
    }

    #[test]
    fn test_locked_channel_rejected() {
        let mut m = bound(MemoryPrim::new("a"));
        m.lock(Channel::Translate);
        let before = m.translation();
        assert!(matches!(m.translate_by(DVec3::X), Err(Error::Locked(Channel::Translate))));
        assert_eq!(m.translation(), before);
        assert!(names(&m).is_empty());
    }

    #[test]
    fn test_push_disabled_keeps_tweak() {
        let mut m = TransformationMatrix::new();
        m.bind(MemoryPrim::new("a"));
        m.translate_to(DVec3::new(0.0, 5.0, 0.0)).unwrap();
        assert!(names(&m).is_empty());
        assert_eq!(m.tweaks().translation, DVec3::new(0.0, 5.0, 0.0));

        m.enable_push_to_prim(true).unwrap();
        assert_eq!(names(&m), ["xformOp:translate"]);
        assert!(m.tweaks().is_zero());
    }

    #[test]
    fn test_rotation_order_fixed_when_bound() {
        let mut m = bound(MemoryPrim::new("a"));
        assert!(matches!(m.set_rotation_order(RotationOrder::Zyx), Err(Error::RotationOrderLocked)));

        let mut free: TransformationMatrix<MemoryPrim> = TransformationMatrix::new();
        free.rotate_to(EulerRotation::new(0.1, 0.2, 0.3, RotationOrder::Xyz)).unwrap();
        let before = free.as_matrix();
        free.set_rotation_order(RotationOrder::Zyx).unwrap();
        assert_eq!(free.rotation_order(), RotationOrder::Zyx);
        assert!(free.as_matrix().abs_diff_eq(before, 1e-9));
    }

    #[test]
    fn test_rotate_inserts_in_order() {
        let mut m = bound(MemoryPrim::new("a"));
        m.scale_to(DVec3::splat(2.0)).unwrap();
        m.translate_to(DVec3::X).unwrap();
        m.rotate_to(EulerRotation::from_degrees(DVec3::new(0.0, 45.0, 0.0), RotationOrder::Xyz))
            .unwrap();
        assert_eq!(names(&m), ["xformOp:translate", "xformOp:rotateXYZ", "xformOp:scale"]);
        assert_eq!(m.schema(), Some(MAYA_STACK));
    }

    #[test]
    fn test_orientation_roundtrip() {
        let mut m = bound(MemoryPrim::new("a"));
        let q = DQuat::from_rotation_z(0.4);
        m.set_rotate_orientation(q, false).unwrap();
        assert_eq!(names(&m), ["xformOp:rotateXYZ:rotateAxis"]);

        let prim = m.unbind().unwrap();
        let mut again = TransformationMatrix::new();
        again.bind(prim);
        assert!(again.rotate_orientation().abs_diff_eq(q, 1e-6));
        assert!(approx_eq(again.translation(), DVec3::ZERO, 0.0));
    }
}
