//! Math type re-exports and transform-specific math utilities.
//!
//! Re-exports the double precision types from `glam` and adds Euler
//! rotations with an explicit [`RotationOrder`] plus the shear helpers used
//! by shear ops.
//!
//! Matrices follow glam's column-vector convention. A glam [`DMat4`] has the
//! same memory layout as a row-major, row-vector 4x4 as stored in scene
//! files, so `row i` of the stored matrix is `col(i)` here.

pub use glam::{DMat3, DMat4, DQuat, DVec3, DVec4, EulerRot};

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, Sub};

/// Order in which the three Euler angles are applied.
///
/// `Xyz` rotates about X first, then Y, then Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationOrder {
    #[default]
    Xyz,
    Yzx,
    Zxy,
    Xzy,
    Yxz,
    Zyx,
}

impl RotationOrder {
    /// All rotation orders.
    pub const ALL: [Self; 6] = [Self::Xyz, Self::Yzx, Self::Zxy, Self::Xzy, Self::Yxz, Self::Zyx];

    /// Axis indices in application order.
    #[inline]
    pub const fn axes(self) -> [usize; 3] {
        match self {
            Self::Xyz => [0, 1, 2],
            Self::Yzx => [1, 2, 0],
            Self::Zxy => [2, 0, 1],
            Self::Xzy => [0, 2, 1],
            Self::Yxz => [1, 0, 2],
            Self::Zyx => [2, 1, 0],
        }
    }

    /// Matching glam sequence. Rotations apply about fixed axes, so the
    /// extrinsic variants are used.
    #[inline]
    pub const fn euler_rot(self) -> EulerRot {
        match self {
            Self::Xyz => EulerRot::XYZEx,
            Self::Yzx => EulerRot::YZXEx,
            Self::Zxy => EulerRot::ZXYEx,
            Self::Xzy => EulerRot::XZYEx,
            Self::Yxz => EulerRot::YXZEx,
            Self::Zyx => EulerRot::ZYXEx,
        }
    }

    /// Short uppercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Xyz => "XYZ",
            Self::Yzx => "YZX",
            Self::Zxy => "ZXY",
            Self::Xzy => "XZY",
            Self::Yxz => "YXZ",
            Self::Zyx => "ZYX",
        }
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Euler rotation in radians with an explicit application order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EulerRotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub order: RotationOrder,
}

impl EulerRotation {
    /// Identity rotation (XYZ order).
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, order: RotationOrder::Xyz };

    /// Create a rotation from radians.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, order: RotationOrder) -> Self {
        Self { x, y, z, order }
    }

    /// Create a rotation from a vector of degrees.
    pub fn from_degrees(deg: DVec3, order: RotationOrder) -> Self {
        Self::new(deg.x.to_radians(), deg.y.to_radians(), deg.z.to_radians(), order)
    }

    /// Angles as a vector of radians.
    #[inline]
    pub fn as_dvec3(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    /// Angles as a vector of degrees.
    #[inline]
    pub fn to_degrees(&self) -> DVec3 {
        DVec3::new(self.x.to_degrees(), self.y.to_degrees(), self.z.to_degrees())
    }

    /// True if all angles are zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn angle(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    fn from_axis_angles(angles: [f64; 3], order: RotationOrder) -> Self {
        // angles are indexed by application step, not by axis
        let [i, j, k] = order.axes();
        let mut v = [0.0; 3];
        v[i] = angles[0];
        v[j] = angles[1];
        v[k] = angles[2];
        Self::new(v[0], v[1], v[2], order)
    }

    /// Angles in application order.
    fn applied_angles(&self) -> (f64, f64, f64) {
        let [i, j, k] = self.order.axes();
        (self.angle(i), self.angle(j), self.angle(k))
    }

    /// Convert to a quaternion.
    pub fn to_quat(&self) -> DQuat {
        let (a, b, c) = self.applied_angles();
        DQuat::from_euler(self.order.euler_rot(), a, b, c)
    }

    /// Convert to a rotation matrix.
    #[inline]
    pub fn to_mat3(&self) -> DMat3 {
        DMat3::from_quat(self.to_quat())
    }

    /// Extract Euler angles in `order` from a pure rotation matrix.
    pub fn from_mat3(m: &DMat3, order: RotationOrder) -> Self {
        let (a, b, c) = m.to_euler(order.euler_rot());
        Self::from_axis_angles([a, b, c], order)
    }

    /// Extract Euler angles in `order` from a quaternion.
    #[inline]
    pub fn from_quat(q: DQuat, order: RotationOrder) -> Self {
        let (a, b, c) = q.normalize().to_euler(order.euler_rot());
        Self::from_axis_angles([a, b, c], order)
    }

    /// Same orientation expressed in another order.
    pub fn reorder(&self, order: RotationOrder) -> Self {
        if order == self.order {
            return *self;
        }
        Self::from_mat3(&self.to_mat3(), order)
    }

    /// Equivalent solution numerically closest to `hint`.
    ///
    /// Considers both Euler solutions and wraps every angle by whole turns.
    pub fn closest_to(&self, hint: &EulerRotation) -> Self {
        let wrap = |v: f64, h: f64| v + TAU * ((h - v) / TAU).round();
        let pick = |angles: [f64; 3]| {
            let e = Self::from_axis_angles(angles, self.order);
            Self::new(wrap(e.x, hint.x), wrap(e.y, hint.y), wrap(e.z, hint.z), self.order)
        };
        let (a, b, c) = self.applied_angles();
        let first = pick([a, b, c]);
        let second = pick([a + PI, PI - b, c + PI]);
        let dist = |e: &Self| (e.as_dvec3() - hint.as_dvec3()).abs().element_sum();
        if dist(&second) < dist(&first) {
            second
        } else {
            first
        }
    }
}

impl Add for EulerRotation {
    type Output = Self;

    /// Componentwise sum, keeping the left-hand order.
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.order)
    }
}

impl Sub for EulerRotation {
    type Output = Self;

    /// Componentwise difference, keeping the left-hand order.
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z, self.order)
    }
}

/// Shear matrix for `(xy, xz, yz)`: `x' = x + xy*y + xz*z`, `y' = y + yz*z`.
pub fn shear_mat3(shear: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::X,
        DVec3::new(shear.x, 1.0, 0.0),
        DVec3::new(shear.y, shear.z, 1.0),
    )
}

/// Shear op matrix as stored in a `transform` op.
#[inline]
pub fn shear_mat4(shear: DVec3) -> DMat4 {
    DMat4::from_mat3(shear_mat3(shear))
}

/// Read `(xy, xz, yz)` back from a shear op matrix.
#[inline]
pub fn shear_from_mat4(m: &DMat4) -> DVec3 {
    DVec3::new(m.y_axis.x, m.z_axis.x, m.z_axis.y)
}

/// Componentwise near-equality.
#[inline]
pub fn approx_eq(a: DVec3, b: DVec3, eps: f64) -> bool {
    (a - b).abs().max_element() <= eps
}
