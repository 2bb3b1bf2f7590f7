//! Fixed-shape host view of a transform and its algebra.
//!
//! The host model composes, in column-vector form:
//!
//! ```text
//! M = T * RPT * RP * R * RA * RP^-1 * SPT * SP * SH * S * SP^-1
//! ```
//!
//! which is exactly the native op order applied left to right.

use super::Channel;
use crate::util::{shear_mat3, DMat3, DMat4, DQuat, DVec3, EulerRotation, RotationOrder};

/// Scales below this are treated as degenerate during decomposition.
const DEGENERATE_SCALE: f64 = 1e-12;

/// Decomposed transform: every channel the host edits independently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecomposedTransform {
    pub translation: DVec3,
    pub rotate_pivot: DVec3,
    pub rotate_pivot_translation: DVec3,
    /// Rotation in radians.
    pub rotation: EulerRotation,
    pub rotate_orientation: DQuat,
    pub scale_pivot: DVec3,
    pub scale_pivot_translation: DVec3,
    pub scale: DVec3,
    /// Shear `(xy, xz, yz)`.
    pub shear: DVec3,
    /// Set when the values were decomposed from a dense matrix.
    pub from_matrix: bool,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl DecomposedTransform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotate_pivot: DVec3::ZERO,
        rotate_pivot_translation: DVec3::ZERO,
        rotation: EulerRotation::IDENTITY,
        rotate_orientation: DQuat::IDENTITY,
        scale_pivot: DVec3::ZERO,
        scale_pivot_translation: DVec3::ZERO,
        scale: DVec3::ONE,
        shear: DVec3::ZERO,
        from_matrix: false,
    };

    /// Identity with a given rotation order.
    pub fn with_rotation_order(order: RotationOrder) -> Self {
        let mut t = Self::IDENTITY;
        t.rotation.order = order;
        t
    }

    #[inline]
    pub fn rotation_order(&self) -> RotationOrder {
        self.rotation.order
    }

    // ========================================================================
    // Translation
    // ========================================================================

    pub fn translate_to(&mut self, v: DVec3) {
        self.translation = v;
    }

    pub fn translate_by(&mut self, v: DVec3) {
        self.translation += v;
    }

    // ========================================================================
    // Scale / shear
    // ========================================================================

    pub fn scale_to(&mut self, v: DVec3) {
        self.scale = v;
    }

    /// Multiply the scale componentwise.
    pub fn scale_by(&mut self, v: DVec3) {
        self.scale *= v;
    }

    pub fn shear_to(&mut self, v: DVec3) {
        self.shear = v;
    }

    /// Multiply the shear componentwise.
    pub fn shear_by(&mut self, v: DVec3) {
        self.shear *= v;
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Set the rotation. Angles are re-expressed in the current order.
    pub fn rotate_to(&mut self, e: EulerRotation) {
        self.rotation = if e.order == self.rotation.order {
            e
        } else {
            e.reorder(self.rotation.order).closest_to(&self.rotation)
        };
    }

    /// Set the rotation from a quaternion, staying close to the current angles.
    pub fn rotate_to_quat(&mut self, q: DQuat) {
        let order = self.rotation.order;
        self.rotation = EulerRotation::from_quat(q, order).closest_to(&self.rotation);
    }

    /// Apply a further rotation on top of the current one.
    pub fn rotate_by(&mut self, e: EulerRotation) {
        self.rotate_by_quat(e.to_quat());
    }

    pub fn rotate_by_quat(&mut self, q: DQuat) {
        let current = self.rotation.to_quat();
        self.rotate_to_quat(q * current);
    }

    // ========================================================================
    // Pivots
    // ========================================================================

    /// Set the rotate pivot. With `balance`, the pivot translation absorbs
    /// the change so the composed matrix stays put.
    pub fn set_rotate_pivot(&mut self, pivot: DVec3, balance: bool) {
        if balance {
            let delta = self.rotate_pivot - pivot;
            let r = self.rotation_matrix();
            self.rotate_pivot_translation += delta - r * delta;
        }
        self.rotate_pivot = pivot;
    }

    /// Set the scale pivot, optionally balanced like the rotate pivot.
    pub fn set_scale_pivot(&mut self, pivot: DVec3, balance: bool) {
        if balance {
            let delta = self.scale_pivot - pivot;
            let sh_s = shear_mat3(self.shear) * DMat3::from_diagonal(self.scale);
            self.scale_pivot_translation += delta - sh_s * delta;
        }
        self.scale_pivot = pivot;
    }

    pub fn set_rotate_pivot_translation(&mut self, v: DVec3) {
        self.rotate_pivot_translation = v;
    }

    pub fn set_scale_pivot_translation(&mut self, v: DVec3) {
        self.scale_pivot_translation = v;
    }

    /// Set the rotate orientation. With `balance`, the rotation is adjusted
    /// so the combined orientation is unchanged.
    pub fn set_rotate_orientation(&mut self, q: DQuat, balance: bool) {
        let q = q.normalize();
        if balance {
            let combined = self.rotation.to_quat() * self.rotate_orientation;
            self.rotate_to_quat(combined * q.inverse());
        }
        self.rotate_orientation = q;
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Rotation including the orientation offset (`R * RA`).
    fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_quat(self.rotation.to_quat() * self.rotate_orientation)
    }

    /// Compose the full local matrix.
    pub fn as_matrix(&self) -> DMat4 {
        DMat4::from_translation(self.translation)
            * DMat4::from_translation(self.rotate_pivot_translation)
            * DMat4::from_translation(self.rotate_pivot)
            * DMat4::from_mat3(self.rotation_matrix())
            * DMat4::from_translation(-self.rotate_pivot)
            * DMat4::from_translation(self.scale_pivot_translation)
            * DMat4::from_translation(self.scale_pivot)
            * DMat4::from_mat3(shear_mat3(self.shear) * DMat3::from_diagonal(self.scale))
            * DMat4::from_translation(-self.scale_pivot)
    }

    /// Compose the matrix `percent` of the way from identity.
    ///
    /// Translations, shear and Euler angles scale linearly, scale blends from
    /// one, orientation slerps from identity. Pivots are kept as they are.
    pub fn as_matrix_fraction(&self, percent: f64) -> DMat4 {
        let rotation = EulerRotation::new(
            self.rotation.x * percent,
            self.rotation.y * percent,
            self.rotation.z * percent,
            self.rotation.order,
        );
        let partial = Self {
            translation: self.translation * percent,
            rotate_pivot_translation: self.rotate_pivot_translation * percent,
            scale_pivot_translation: self.scale_pivot_translation * percent,
            rotation,
            rotate_orientation: DQuat::IDENTITY.slerp(self.rotate_orientation, percent),
            scale: DVec3::ONE.lerp(self.scale, percent),
            shear: self.shear * percent,
            ..*self
        };
        partial.as_matrix()
    }

    /// Decompose a dense matrix into translation, rotation, shear and scale.
    ///
    /// Pivots come out zero and the orientation identity. A negative
    /// determinant is folded into the Z scale.
    pub fn decompose_matrix(m: &DMat4, order: RotationOrder) -> Self {
        let a0 = m.x_axis.truncate();
        let a1 = m.y_axis.truncate();
        let a2 = m.z_axis.truncate();

        let sx = a0.length();
        let r0 = unit_or(a0, sx, DVec3::X);

        let xy_s = r0.dot(a1);
        let a1 = a1 - r0 * xy_s;
        let sy = a1.length();
        let r1 = unit_or(a1, sy, r0.any_orthonormal_vector());

        let xz_s = r0.dot(a2);
        let yz_s = r1.dot(a2);
        let a2 = a2 - r0 * xz_s - r1 * yz_s;
        let mut sz = a2.length();
        let mut r2 = unit_or(a2, sz, r0.cross(r1));

        let mut shear = DVec3::new(
            ratio(xy_s, sy),
            ratio(xz_s, sz),
            ratio(yz_s, sz),
        );
        if DMat3::from_cols(r0, r1, r2).determinant() < 0.0 {
            sz = -sz;
            r2 = -r2;
            shear.y = -shear.y;
            shear.z = -shear.z;
        }

        let rotation = EulerRotation::from_mat3(&DMat3::from_cols(r0, r1, r2), order);
        Self {
            translation: m.w_axis.truncate(),
            rotation,
            scale: DVec3::new(sx, sy, sz),
            shear,
            from_matrix: true,
            ..Self::with_rotation_order(order)
        }
    }

    /// Check if a channel holds its default value.
    pub fn is_default(&self, channel: Channel) -> bool {
        match channel {
            Channel::Translate => self.translation == DVec3::ZERO,
            Channel::Rotate => self.rotation.is_zero(),
            Channel::Scale => self.scale == DVec3::ONE,
            Channel::Shear => self.shear == DVec3::ZERO,
            Channel::RotatePivot => self.rotate_pivot == DVec3::ZERO,
            Channel::RotatePivotTranslate => self.rotate_pivot_translation == DVec3::ZERO,
            Channel::ScalePivot => self.scale_pivot == DVec3::ZERO,
            Channel::ScalePivotTranslate => self.scale_pivot_translation == DVec3::ZERO,
            Channel::RotateOrientation => {
                self.rotate_orientation.abs_diff_eq(DQuat::IDENTITY, 0.0)
                    || self.rotate_orientation.abs_diff_eq(-DQuat::IDENTITY, 0.0)
            }
        }
    }

    /// Copy one channel from another transform.
    pub fn copy_channel(&mut self, other: &Self, channel: Channel) {
        match channel {
            Channel::Translate => self.translation = other.translation,
            Channel::Rotate => self.rotation = other.rotation,
            Channel::Scale => self.scale = other.scale,
            Channel::Shear => self.shear = other.shear,
            Channel::RotatePivot => self.rotate_pivot = other.rotate_pivot,
            Channel::RotatePivotTranslate => self.rotate_pivot_translation = other.rotate_pivot_translation,
            Channel::ScalePivot => self.scale_pivot = other.scale_pivot,
            Channel::ScalePivotTranslate => self.scale_pivot_translation = other.scale_pivot_translation,
            Channel::RotateOrientation => self.rotate_orientation = other.rotate_orientation,
        }
    }
}

#[inline]
fn unit_or(v: DVec3, len: f64, fallback: DVec3) -> DVec3 {
    if len > DEGENERATE_SCALE {
        v / len
    } else {
        fallback
    }
}

#[inline]
fn ratio(n: f64, d: f64) -> f64 {
    if d.abs() > DEGENERATE_SCALE {
        n / d
    } else {
        0.0
    }
}

/// Host edits not yet folded back into the stack, per channel.
///
/// Vector channels and the Euler rotation are additive. The orientation
/// tweak is a rotation applied on top of the sampled orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelTweaks {
    pub translation: DVec3,
    pub rotate_pivot: DVec3,
    pub rotate_pivot_translation: DVec3,
    pub rotation: DVec3,
    pub rotate_orientation: DQuat,
    pub scale_pivot: DVec3,
    pub scale_pivot_translation: DVec3,
    pub scale: DVec3,
    pub shear: DVec3,
}

impl Default for ChannelTweaks {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotate_pivot: DVec3::ZERO,
            rotate_pivot_translation: DVec3::ZERO,
            rotation: DVec3::ZERO,
            rotate_orientation: DQuat::IDENTITY,
            scale_pivot: DVec3::ZERO,
            scale_pivot_translation: DVec3::ZERO,
            scale: DVec3::ZERO,
            shear: DVec3::ZERO,
        }
    }
}

impl ChannelTweaks {
    /// Record `current - sampled` for one channel.
    pub fn capture(&mut self, channel: Channel, current: &DecomposedTransform, sampled: &DecomposedTransform) {
        match channel {
            Channel::Translate => self.translation = current.translation - sampled.translation,
            Channel::Rotate => {
                self.rotation = current.rotation.as_dvec3() - sampled.rotation.as_dvec3();
            }
            Channel::Scale => self.scale = current.scale - sampled.scale,
            Channel::Shear => self.shear = current.shear - sampled.shear,
            Channel::RotatePivot => self.rotate_pivot = current.rotate_pivot - sampled.rotate_pivot,
            Channel::RotatePivotTranslate => {
                self.rotate_pivot_translation =
                    current.rotate_pivot_translation - sampled.rotate_pivot_translation;
            }
            Channel::ScalePivot => self.scale_pivot = current.scale_pivot - sampled.scale_pivot,
            Channel::ScalePivotTranslate => {
                self.scale_pivot_translation =
                    current.scale_pivot_translation - sampled.scale_pivot_translation;
            }
            Channel::RotateOrientation => {
                self.rotate_orientation = if current.rotate_orientation == sampled.rotate_orientation {
                    DQuat::IDENTITY
                } else {
                    current.rotate_orientation * sampled.rotate_orientation.inverse()
                };
            }
        }
    }

    /// Write `sampled + tweak` for one channel into `current`.
    pub fn apply(&self, channel: Channel, sampled: &DecomposedTransform, current: &mut DecomposedTransform) {
        match channel {
            Channel::Translate => current.translation = sampled.translation + self.translation,
            Channel::Rotate => {
                let v = sampled.rotation.as_dvec3() + self.rotation;
                current.rotation = EulerRotation::new(v.x, v.y, v.z, sampled.rotation.order);
            }
            Channel::Scale => current.scale = sampled.scale + self.scale,
            Channel::Shear => current.shear = sampled.shear + self.shear,
            Channel::RotatePivot => current.rotate_pivot = sampled.rotate_pivot + self.rotate_pivot,
            Channel::RotatePivotTranslate => {
                current.rotate_pivot_translation =
                    sampled.rotate_pivot_translation + self.rotate_pivot_translation;
            }
            Channel::ScalePivot => current.scale_pivot = sampled.scale_pivot + self.scale_pivot,
            Channel::ScalePivotTranslate => {
                current.scale_pivot_translation =
                    sampled.scale_pivot_translation + self.scale_pivot_translation;
            }
            Channel::RotateOrientation => {
                current.rotate_orientation = self.rotate_orientation * sampled.rotate_orientation;
            }
        }
    }

    /// Zero the tweak of one channel.
    pub fn clear(&mut self, channel: Channel) {
        let zero = Self::default();
        match channel {
            Channel::Translate => self.translation = zero.translation,
            Channel::Rotate => self.rotation = zero.rotation,
            Channel::Scale => self.scale = zero.scale,
            Channel::Shear => self.shear = zero.shear,
            Channel::RotatePivot => self.rotate_pivot = zero.rotate_pivot,
            Channel::RotatePivotTranslate => self.rotate_pivot_translation = zero.rotate_pivot_translation,
            Channel::ScalePivot => self.scale_pivot = zero.scale_pivot,
            Channel::ScalePivotTranslate => self.scale_pivot_translation = zero.scale_pivot_translation,
            Channel::RotateOrientation => self.rotate_orientation = zero.rotate_orientation,
        }
    }

    /// Check if `channel` carries a tweak.
    pub fn is_set(&self, channel: Channel) -> bool {
        let zero = Self::default();
        match channel {
            Channel::Translate => self.translation != zero.translation,
            Channel::Rotate => self.rotation != zero.rotation,
            Channel::Scale => self.scale != zero.scale,
            Channel::Shear => self.shear != zero.shear,
            Channel::RotatePivot => self.rotate_pivot != zero.rotate_pivot,
            Channel::RotatePivotTranslate => self.rotate_pivot_translation != zero.rotate_pivot_translation,
            Channel::ScalePivot => self.scale_pivot != zero.scale_pivot,
            Channel::ScalePivotTranslate => self.scale_pivot_translation != zero.scale_pivot_translation,
            Channel::RotateOrientation => self.rotate_orientation != zero.rotate_orientation,
        }
    }

    /// Check if no channel carries a tweak.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
