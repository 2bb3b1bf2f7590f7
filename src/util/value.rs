//! Typed op values - the storage types an xform op can be authored with.
//!
//! Scalars and 3-vectors come in half/float/double/int flavours; values are
//! widened to `f64` for the host and narrowed back to the authored type on
//! write, so an op never changes its declared type.

use glam::{IVec3, Vec3};
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DMat4, DVec3};

/// Component type an op is authored with.
///
/// `transform` ops always hold a double matrix whatever their precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Half,
    #[default]
    Float,
    Double,
    Int,
}

impl Precision {
    /// Returns the name of this precision as a string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
            Self::Int => "int",
        }
    }
}

/// Storage type of an op value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Half,
    Float,
    Double,
    Int,
    Vec3h,
    Vec3f,
    Vec3d,
    Vec3i,
    Matrix4d,
}

impl ValueKind {
    /// Scalar kind for a precision.
    #[inline]
    pub const fn scalar(precision: Precision) -> Self {
        match precision {
            Precision::Half => Self::Half,
            Precision::Float => Self::Float,
            Precision::Double => Self::Double,
            Precision::Int => Self::Int,
        }
    }

    /// 3-vector kind for a precision.
    #[inline]
    pub const fn vec3(precision: Precision) -> Self {
        match precision {
            Precision::Half => Self::Vec3h,
            Precision::Float => Self::Vec3f,
            Precision::Double => Self::Vec3d,
            Precision::Int => Self::Vec3i,
        }
    }

    /// Returns true for single-value kinds.
    #[inline]
    pub const fn is_scalar(self) -> bool {
        matches!(self, Self::Half | Self::Float | Self::Double | Self::Int)
    }

    /// Returns true for 3-vector kinds.
    #[inline]
    pub const fn is_vec3(self) -> bool {
        matches!(self, Self::Vec3h | Self::Vec3f | Self::Vec3d | Self::Vec3i)
    }

    /// Scene-description type name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
            Self::Int => "int",
            Self::Vec3h => "half3",
            Self::Vec3f => "float3",
            Self::Vec3d => "double3",
            Self::Vec3i => "int3",
            Self::Matrix4d => "matrix4d",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single authored op value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OpValue {
    Half(f16),
    Float(f32),
    Double(f64),
    Int(i32),
    Vec3h([f16; 3]),
    Vec3f(Vec3),
    Vec3d(DVec3),
    Vec3i(IVec3),
    Matrix4d(DMat4),
}

impl OpValue {
    /// Storage kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Half(_) => ValueKind::Half,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Int(_) => ValueKind::Int,
            Self::Vec3h(_) => ValueKind::Vec3h,
            Self::Vec3f(_) => ValueKind::Vec3f,
            Self::Vec3d(_) => ValueKind::Vec3d,
            Self::Vec3i(_) => ValueKind::Vec3i,
            Self::Matrix4d(_) => ValueKind::Matrix4d,
        }
    }

    /// Widen a scalar value to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Half(v) => Some(v.to_f64()),
            Self::Float(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Widen a 3-vector value to `DVec3`.
    pub fn as_dvec3(&self) -> Option<DVec3> {
        match *self {
            Self::Vec3h(v) => Some(DVec3::new(v[0].to_f64(), v[1].to_f64(), v[2].to_f64())),
            Self::Vec3f(v) => Some(v.as_dvec3()),
            Self::Vec3d(v) => Some(v),
            Self::Vec3i(v) => Some(v.as_dvec3()),
            _ => None,
        }
    }

    /// Matrix value, if this is one.
    pub fn as_dmat4(&self) -> Option<DMat4> {
        match *self {
            Self::Matrix4d(m) => Some(m),
            _ => None,
        }
    }

    /// Narrow `v` into a scalar of the given kind.
    pub fn from_f64(kind: ValueKind, v: f64) -> Option<Self> {
        match kind {
            ValueKind::Half => Some(Self::Half(f16::from_f64(v))),
            ValueKind::Float => Some(Self::Float(v as f32)),
            ValueKind::Double => Some(Self::Double(v)),
            ValueKind::Int => Some(Self::Int(v.round() as i32)),
            _ => None,
        }
    }

    /// Narrow `v` into a 3-vector of the given kind.
    pub fn from_dvec3(kind: ValueKind, v: DVec3) -> Option<Self> {
        match kind {
            ValueKind::Vec3h => Some(Self::Vec3h([
                f16::from_f64(v.x),
                f16::from_f64(v.y),
                f16::from_f64(v.z),
            ])),
            ValueKind::Vec3f => Some(Self::Vec3f(v.as_vec3())),
            ValueKind::Vec3d => Some(Self::Vec3d(v)),
            ValueKind::Vec3i => Some(Self::Vec3i(v.round().as_ivec3())),
            _ => None,
        }
    }

    /// Linear interpolation between two values of the same kind.
    pub fn lerp(&self, other: &Self, t: f64) -> Option<Self> {
        if self.kind() != other.kind() {
            return None;
        }
        let kind = self.kind();
        if kind.is_scalar() {
            let (a, b) = (self.as_f64()?, other.as_f64()?);
            Self::from_f64(kind, a + (b - a) * t)
        } else if kind.is_vec3() {
            let (a, b) = (self.as_dvec3()?, other.as_dvec3()?);
            Self::from_dvec3(kind, a.lerp(b, t))
        } else {
            let (a, b) = (self.as_dmat4()?, other.as_dmat4()?);
            Some(Self::Matrix4d(a + (b - a) * t))
        }
    }
}
