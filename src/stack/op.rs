//! Xform ops - single named, typed transform operations.
//!
//! An op is identified by its attribute name, `xformOp:<type>[:<suffix>]`.
//! The same attribute may appear in an op order a second time with the
//! `!invert!` prefix, meaning the inverse of that op is applied there.

use std::fmt;

use crate::util::{DMat4, DVec3, Error, EulerRotation, OpValue, Precision, Result, RotationOrder, ValueKind};

/// Namespace prefix of every op attribute.
pub const XFORM_OP_PREFIX: &str = "xformOp:";

/// Prefix marking an inverted op in an op order.
pub const INVERT_PREFIX: &str = "!invert!";

/// Geometric type of an op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XformOpType {
    Translate,
    Scale,
    RotateX,
    RotateY,
    RotateZ,
    RotateXYZ,
    RotateXZY,
    RotateYXZ,
    RotateYZX,
    RotateZXY,
    RotateZYX,
    Transform,
}

impl XformOpType {
    /// Type token as used in attribute names.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Scale => "scale",
            Self::RotateX => "rotateX",
            Self::RotateY => "rotateY",
            Self::RotateZ => "rotateZ",
            Self::RotateXYZ => "rotateXYZ",
            Self::RotateXZY => "rotateXZY",
            Self::RotateYXZ => "rotateYXZ",
            Self::RotateYZX => "rotateYZX",
            Self::RotateZXY => "rotateZXY",
            Self::RotateZYX => "rotateZYX",
            Self::Transform => "transform",
        }
    }

    /// Parse a type token.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "translate" => Self::Translate,
            "scale" => Self::Scale,
            "rotateX" => Self::RotateX,
            "rotateY" => Self::RotateY,
            "rotateZ" => Self::RotateZ,
            "rotateXYZ" => Self::RotateXYZ,
            "rotateXZY" => Self::RotateXZY,
            "rotateYXZ" => Self::RotateYXZ,
            "rotateYZX" => Self::RotateYZX,
            "rotateZXY" => Self::RotateZXY,
            "rotateZYX" => Self::RotateZYX,
            "transform" => Self::Transform,
            _ => return None,
        })
    }

    #[inline]
    pub const fn is_one_axis_rotate(self) -> bool {
        matches!(self, Self::RotateX | Self::RotateY | Self::RotateZ)
    }

    #[inline]
    pub const fn is_three_axis_rotate(self) -> bool {
        matches!(
            self,
            Self::RotateXYZ
                | Self::RotateXZY
                | Self::RotateYXZ
                | Self::RotateYZX
                | Self::RotateZXY
                | Self::RotateZYX
        )
    }

    #[inline]
    pub const fn is_rotate(self) -> bool {
        self.is_one_axis_rotate() || self.is_three_axis_rotate()
    }

    /// Rotation order implied by a rotate op. Single-axis rotates report XYZ.
    pub const fn rotation_order(self) -> Option<RotationOrder> {
        match self {
            Self::RotateX | Self::RotateY | Self::RotateZ | Self::RotateXYZ => Some(RotationOrder::Xyz),
            Self::RotateXZY => Some(RotationOrder::Xzy),
            Self::RotateYXZ => Some(RotationOrder::Yxz),
            Self::RotateYZX => Some(RotationOrder::Yzx),
            Self::RotateZXY => Some(RotationOrder::Zxy),
            Self::RotateZYX => Some(RotationOrder::Zyx),
            _ => None,
        }
    }

    /// Three-axis rotate type for a rotation order.
    pub const fn from_rotation_order(order: RotationOrder) -> Self {
        match order {
            RotationOrder::Xyz => Self::RotateXYZ,
            RotationOrder::Xzy => Self::RotateXZY,
            RotationOrder::Yxz => Self::RotateYXZ,
            RotationOrder::Yzx => Self::RotateYZX,
            RotationOrder::Zxy => Self::RotateZXY,
            RotationOrder::Zyx => Self::RotateZYX,
        }
    }

    /// Storage kind of values of this op type.
    pub const fn value_kind(self, precision: Precision) -> ValueKind {
        match self {
            Self::RotateX | Self::RotateY | Self::RotateZ => ValueKind::scalar(precision),
            Self::Transform => ValueKind::Matrix4d,
            _ => ValueKind::vec3(precision),
        }
    }
}

impl fmt::Display for XformOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single op as it appears in an op order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XformOp {
    pub op_type: XformOpType,
    pub precision: Precision,
    pub suffix: Option<String>,
    pub inverted: bool,
}

impl XformOp {
    /// Create a non-inverted op.
    pub fn new(op_type: XformOpType, precision: Precision, suffix: Option<&str>) -> Self {
        let precision = match op_type {
            XformOpType::Transform => Precision::Double,
            _ => precision,
        };
        Self {
            op_type,
            precision,
            suffix: suffix.filter(|s| !s.is_empty()).map(str::to_owned),
            inverted: false,
        }
    }

    /// Same attribute, with the inversion flag set.
    pub fn inverse(&self) -> Self {
        Self {
            inverted: !self.inverted,
            ..self.clone()
        }
    }

    /// Attribute name, e.g. `xformOp:translate:rotatePivot`.
    pub fn attr_name(&self) -> String {
        match &self.suffix {
            Some(s) => format!("{}{}:{}", XFORM_OP_PREFIX, self.op_type.name(), s),
            None => format!("{}{}", XFORM_OP_PREFIX, self.op_type.name()),
        }
    }

    /// Name as it appears in the op order, with `!invert!` when inverted.
    pub fn op_name(&self) -> String {
        if self.inverted {
            format!("{}{}", INVERT_PREFIX, self.attr_name())
        } else {
            self.attr_name()
        }
    }

    /// Parse an op order entry.
    pub fn parse(name: &str, precision: Precision) -> Result<Self> {
        let (inverted, attr) = match name.strip_prefix(INVERT_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let body = attr
            .strip_prefix(XFORM_OP_PREFIX)
            .ok_or_else(|| Error::UnknownOp(name.to_owned()))?;
        let (type_token, suffix) = match body.split_once(':') {
            Some((t, s)) => (t, Some(s)),
            None => (body, None),
        };
        let op_type = XformOpType::from_name(type_token).ok_or_else(|| Error::UnknownOp(name.to_owned()))?;
        let mut op = Self::new(op_type, precision, suffix);
        op.inverted = inverted;
        Ok(op)
    }

    /// Storage kind of this op's values.
    #[inline]
    pub fn value_kind(&self) -> ValueKind {
        self.op_type.value_kind(self.precision)
    }

    /// Local matrix contributed by this op for `value`, inversion applied.
    pub fn local_matrix(&self, value: &OpValue) -> Option<DMat4> {
        let m = match self.op_type {
            XformOpType::Translate => DMat4::from_translation(value.as_dvec3()?),
            XformOpType::Scale => DMat4::from_scale(value.as_dvec3()?),
            XformOpType::RotateX => DMat4::from_rotation_x(value.as_f64()?.to_radians()),
            XformOpType::RotateY => DMat4::from_rotation_y(value.as_f64()?.to_radians()),
            XformOpType::RotateZ => DMat4::from_rotation_z(value.as_f64()?.to_radians()),
            XformOpType::Transform => value.as_dmat4()?,
            t => {
                let order = t.rotation_order()?;
                let deg: DVec3 = value.as_dvec3()?;
                DMat4::from_mat3(EulerRotation::from_degrees(deg, order).to_mat3())
            }
        };
        Some(if self.inverted { m.inverse() } else { m })
    }
}

impl fmt::Display for XformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_names() {
        let op = XformOp::new(XformOpType::Translate, Precision::Float, Some("rotatePivot"));
        assert_eq!(op.attr_name(), "xformOp:translate:rotatePivot");
        assert_eq!(op.inverse().op_name(), "!invert!xformOp:translate:rotatePivot");

        let plain = XformOp::new(XformOpType::RotateXYZ, Precision::Float, None);
        assert_eq!(plain.op_name(), "xformOp:rotateXYZ");
    }

    #[test]
    fn test_parse() {
        let op = XformOp::parse("!invert!xformOp:translate:pivot", Precision::Double).unwrap();
        assert!(op.inverted);
        assert_eq!(op.op_type, XformOpType::Translate);
        assert_eq!(op.suffix.as_deref(), Some("pivot"));

        let m = XformOp::parse("xformOp:transform", Precision::Float).unwrap();
        assert_eq!(m.precision, Precision::Double);
        assert_eq!(m.value_kind(), ValueKind::Matrix4d);

        assert!(XformOp::parse("xformOp:wobble", Precision::Float).is_err());
        assert!(XformOp::parse("translate", Precision::Float).is_err());
    }

    #[test]
    fn test_local_matrix() {
        let op = XformOp::new(XformOpType::RotateZ, Precision::Float, None);
        let m = op.local_matrix(&OpValue::Float(90.0)).unwrap();
        let v = m.transform_vector3(DVec3::X);
        assert!((v - DVec3::Y).length() < 1e-6);

        let inv = XformOp::new(XformOpType::Translate, Precision::Double, Some("pivot")).inverse();
        let m = inv.local_matrix(&OpValue::Vec3d(DVec3::new(1.0, 2.0, 3.0))).unwrap();
        assert_eq!(m.w_axis.truncate(), DVec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_rotation_order_mapping() {
        for order in RotationOrder::ALL {
            let t = XformOpType::from_rotation_order(order);
            assert_eq!(t.rotation_order(), Some(order));
        }
        assert_eq!(XformOpType::RotateY.rotation_order(), Some(RotationOrder::Xyz));
        assert!(XformOpType::Scale.rotation_order().is_none());
    }
}
