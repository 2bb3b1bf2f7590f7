//! In-memory prim.
//!
//! [`MemoryPrim`] is a complete [`XformPrim`] backed by plain vectors. It
//! serves the CLI and the tests, and loads from / saves to a small JSON
//! description ([`PrimDescription`]).

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::core::{TimeCode, TimeSamples, XformPrim};
use crate::stack::{XformOp, XformOpType};
use crate::util::{DMat4, DVec3, Error, OpValue, Precision, Result, ValueKind};

/// One authored op attribute.
#[derive(Clone, Debug)]
struct OpAttribute {
    op: XformOp,
    samples: TimeSamples<OpValue>,
}

/// A prim held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryPrim {
    name: String,
    attributes: Vec<OpAttribute>,
    order: Vec<XformOp>,
    resets_xform_stack: bool,
    read_only: bool,
    valid: bool,
    rejected: Vec<String>,
    creation_budget: Option<usize>,
    order_rejection: Option<usize>,
}

impl MemoryPrim {
    /// Create an empty prim.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            order: Vec::new(),
            resets_xform_stack: false,
            read_only: false,
            valid: true,
            rejected: Vec::new(),
            creation_budget: None,
            order_rejection: None,
        }
    }

    /// Create a prim that reports itself as invalid.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::new("")
        }
    }

    /// Builder: author `op` with a static value and append it to the op order.
    ///
    /// Inverted ops only append; their attribute must already be authored.
    pub fn with_op(mut self, op: XformOp, value: Option<OpValue>) -> Result<Self> {
        if let Some(value) = value {
            self.author(&op, value)?;
        } else if self.attribute(&op).is_none() {
            return Err(Error::OpNotFound(op.attr_name()));
        }
        self.order.push(op);
        Ok(self)
    }

    /// Create the op's attribute (if needed) and set its static value.
    pub fn author(&mut self, op: &XformOp, value: OpValue) -> Result<()> {
        if op.value_kind() != value.kind() {
            return Err(Error::mismatch(op.value_kind().name(), value.kind().name()));
        }
        let attr_op = XformOp { inverted: false, ..op.clone() };
        match self.attribute_mut(op) {
            Some(attr) => attr.samples.set(TimeCode::Default, value),
            None => self.attributes.push(OpAttribute {
                op: attr_op,
                samples: TimeSamples::constant(value),
            }),
        }
        Ok(())
    }

    /// Author a time sample on an existing attribute.
    pub fn set_sample(&mut self, op: &XformOp, time: f64, value: OpValue) -> Result<()> {
        self.set(op, value, TimeCode::At(time))
    }

    /// Make every write fail with [`Error::ReadOnly`].
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_resets_xform_stack(&mut self, resets: bool) {
        self.resets_xform_stack = resets;
    }

    /// Make creation of the named attribute fail.
    pub fn reject_op_creation(&mut self, attr_name: impl Into<String>) {
        self.rejected.push(attr_name.into());
    }

    /// Let only the next `count` op creations succeed.
    pub fn limit_op_creation(&mut self, count: usize) {
        self.creation_budget = Some(count);
    }

    /// Make one op order write fail, after `skip` successful ones.
    pub fn reject_op_order(&mut self, skip: usize) {
        self.order_rejection = Some(skip);
    }

    /// Authored op order as names.
    pub fn op_order_names(&self) -> Vec<String> {
        self.order.iter().map(XformOp::op_name).collect()
    }

    /// Check if an attribute is authored.
    pub fn has_attribute(&self, attr_name: &str) -> bool {
        self.attributes.iter().any(|a| a.op.attr_name() == attr_name)
    }

    /// Resolve a value by attribute name.
    pub fn value(&self, attr_name: &str, time: TimeCode) -> Option<OpValue> {
        let attr = self.attributes.iter().find(|a| a.op.attr_name() == attr_name)?;
        attr.samples.resolve_with(time, OpValue::lerp)
    }

    fn attribute(&self, op: &XformOp) -> Option<&OpAttribute> {
        let name = op.attr_name();
        self.attributes.iter().find(|a| a.op.attr_name() == name)
    }

    fn attribute_mut(&mut self, op: &XformOp) -> Option<&mut OpAttribute> {
        let name = op.attr_name();
        self.attributes.iter_mut().find(|a| a.op.attr_name() == name)
    }

    // ========================================================================
    // JSON description
    // ========================================================================

    /// Build a prim from its description.
    pub fn from_description(desc: &PrimDescription) -> Result<Self> {
        let mut prim = Self::new(desc.name.clone());
        prim.resets_xform_stack = desc.resets_xform_stack;

        for op_desc in &desc.ops {
            let op = XformOp::parse(&op_desc.name, op_desc.precision)?;
            let kind = op.value_kind();
            let mut samples = TimeSamples::default();
            if let Some(raw) = op_desc.value {
                samples.set(TimeCode::Default, raw.to_value(kind)?);
            }
            for &(t, raw) in &op_desc.samples {
                samples.insert(t, raw.to_value(kind)?);
            }
            prim.attributes.push(OpAttribute { op, samples });
        }

        let order: Vec<String> = match &desc.order {
            Some(names) => names.clone(),
            None => desc.ops.iter().map(|o| o.name.clone()).collect(),
        };
        for name in order {
            let parsed = XformOp::parse(&name, Precision::Float)?;
            let attr = prim
                .attribute(&parsed)
                .ok_or_else(|| Error::OpNotFound(name.clone()))?;
            let op = XformOp {
                inverted: parsed.inverted,
                ..attr.op.clone()
            };
            prim.order.push(op);
        }
        debug!("MemoryPrim::from_description {} ({} ops)", prim.name, prim.order.len());
        Ok(prim)
    }

    /// Describe the prim (attributes, samples and op order).
    pub fn to_description(&self) -> PrimDescription {
        let ops = self
            .attributes
            .iter()
            .map(|a| OpDescription {
                name: a.op.attr_name(),
                precision: a.op.precision,
                value: a.samples.default_value().map(RawValue::from_value),
                samples: a
                    .samples
                    .times()
                    .iter()
                    .filter_map(|&t| {
                        a.samples
                            .resolve_with(TimeCode::At(t), OpValue::lerp)
                            .map(|v| (t, RawValue::from_value(&v)))
                    })
                    .collect(),
            })
            .collect();
        PrimDescription {
            name: self.name.clone(),
            resets_xform_stack: self.resets_xform_stack,
            ops,
            order: Some(self.op_order_names()),
        }
    }

    /// Load a prim from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let desc: PrimDescription = serde_json::from_str(&text)?;
        Self::from_description(&desc)
    }

    /// Save the prim to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_description())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl XformPrim for MemoryPrim {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn ordered_ops(&self) -> (Vec<XformOp>, bool) {
        (self.order.clone(), self.resets_xform_stack)
    }

    fn get(&self, op: &XformOp, time: TimeCode) -> Option<OpValue> {
        self.attribute(op)?.samples.resolve_with(time, OpValue::lerp)
    }

    fn set(&mut self, op: &XformOp, value: OpValue, time: TimeCode) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let attr = self
            .attribute_mut(op)
            .ok_or_else(|| Error::OpNotFound(op.attr_name()))?;
        let expected = attr.op.value_kind();
        if value.kind() != expected {
            return Err(Error::mismatch(expected.name(), value.kind().name()));
        }
        attr.samples.set(time, value);
        Ok(())
    }

    fn num_time_samples(&self, op: &XformOp) -> usize {
        self.attribute(op).map_or(0, |a| a.samples.num_samples())
    }

    fn add_op(
        &mut self,
        op_type: XformOpType,
        precision: Precision,
        suffix: Option<&str>,
        inverted: bool,
    ) -> Result<XformOp> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let op = XformOp::new(op_type, precision, suffix);
        let name = op.attr_name();
        if self.rejected.contains(&name) {
            return Err(Error::OpCreationFailed(name));
        }
        if let Some(budget) = self.creation_budget.as_mut() {
            if *budget == 0 {
                return Err(Error::OpCreationFailed(name));
            }
            *budget -= 1;
        }
        let existing = match self.attribute(&op) {
            Some(attr) if attr.op.op_type != op_type => {
                return Err(Error::OpCreationFailed(format!(
                    "{} exists as {}",
                    name, attr.op.op_type
                )));
            }
            Some(attr) => Some(attr.op.clone()),
            None => None,
        };
        let op = match existing {
            Some(op) => op,
            None => {
                self.attributes.push(OpAttribute {
                    op: op.clone(),
                    samples: TimeSamples::default(),
                });
                op
            }
        };
        Ok(XformOp { inverted, ..op })
    }

    fn set_op_order(&mut self, ops: &[XformOp], resets_xform_stack: bool) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        match self.order_rejection {
            Some(0) => {
                self.order_rejection = None;
                return Err(Error::OpOrderRejected(self.name.clone()));
            }
            Some(skip) => self.order_rejection = Some(skip - 1),
            None => {}
        }
        if let Some(missing) = ops.iter().find(|op| self.attribute(op).is_none()) {
            return Err(Error::OpOrderRejected(missing.op_name()));
        }
        self.order = ops.to_vec();
        self.resets_xform_stack = resets_xform_stack;
        Ok(())
    }
}

// ============================================================================
// Description types
// ============================================================================

/// JSON description of a prim.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PrimDescription {
    pub name: String,
    #[serde(default)]
    pub resets_xform_stack: bool,
    #[serde(default)]
    pub ops: Vec<OpDescription>,
    /// Op order; defaults to `ops` in listed order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
}

/// JSON description of one op attribute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpDescription {
    pub name: String,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<(f64, RawValue)>,
}

/// Untyped value as written in JSON. Matrices are given row by row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Scalar(f64),
    Vec3([f64; 3]),
    Matrix([[f64; 4]; 4]),
}

impl RawValue {
    /// Convert to a typed value of `kind`.
    pub fn to_value(&self, kind: ValueKind) -> Result<OpValue> {
        let value = match *self {
            Self::Scalar(v) => OpValue::from_f64(kind, v),
            Self::Vec3(v) => OpValue::from_dvec3(kind, DVec3::from_array(v)),
            Self::Matrix(rows) if kind == ValueKind::Matrix4d => {
                Some(OpValue::Matrix4d(DMat4::from_cols_array_2d(&rows)))
            }
            Self::Matrix(_) => None,
        };
        value.ok_or_else(|| Error::mismatch(kind.name(), self.kind_name()))
    }

    /// Untyped form of a value.
    pub fn from_value(value: &OpValue) -> Self {
        if let Some(v) = value.as_f64() {
            Self::Scalar(v)
        } else if let Some(v) = value.as_dvec3() {
            Self::Vec3(v.to_array())
        } else {
            Self::Matrix(value.as_dmat4().unwrap_or(DMat4::IDENTITY).to_cols_array_2d())
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Vec3(_) => "vec3",
            Self::Matrix(_) => "matrix",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate() -> XformOp {
        XformOp::new(XformOpType::Translate, Precision::Double, None)
    }

    #[test]
    fn test_author_and_read() {
        let prim = MemoryPrim::new("a")
            .with_op(translate(), Some(OpValue::Vec3d(DVec3::new(1.0, 2.0, 3.0))))
            .unwrap();
        let (ops, resets) = prim.ordered_ops();
        assert_eq!(ops, vec![translate()]);
        assert!(!resets);
        assert_eq!(
            prim.get(&translate(), TimeCode::Default),
            Some(OpValue::Vec3d(DVec3::new(1.0, 2.0, 3.0)))
        );
        let m = prim.local_transformation(TimeCode::Default).unwrap();
        assert_eq!(m.w_axis.truncate(), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_type_checked_writes() {
        let mut prim = MemoryPrim::new("a")
            .with_op(translate(), Some(OpValue::Vec3d(DVec3::ZERO)))
            .unwrap();
        assert!(matches!(
            prim.set(&translate(), OpValue::Double(1.0), TimeCode::Default),
            Err(Error::TypeMismatch { .. })
        ));
        prim.set_read_only(true);
        assert!(matches!(
            prim.set(&translate(), OpValue::Vec3d(DVec3::ONE), TimeCode::Default),
            Err(Error::ReadOnly)
        ));
    }

    #[test]
    fn test_add_op_and_order() {
        let mut prim = MemoryPrim::new("a");
        let rp = prim
            .add_op(XformOpType::Translate, Precision::Float, Some("rotatePivot"), false)
            .unwrap();
        let inv = prim
            .add_op(XformOpType::Translate, Precision::Float, Some("rotatePivot"), true)
            .unwrap();
        assert!(inv.inverted);
        prim.set_op_order(&[rp, inv], true).unwrap();
        assert_eq!(
            prim.op_order_names(),
            ["xformOp:translate:rotatePivot", "!invert!xformOp:translate:rotatePivot"]
        );
        assert!(prim.ordered_ops().1);

        let stray = XformOp::new(XformOpType::Scale, Precision::Float, None);
        assert!(matches!(prim.set_op_order(&[stray], false), Err(Error::OpOrderRejected(_))));

        prim.reject_op_creation("xformOp:scale");
        assert!(prim.add_op(XformOpType::Scale, Precision::Float, None, false).is_err());
    }

    #[test]
    fn test_description_roundtrip() {
        let json = r#"{
            "name": "cube",
            "ops": [
                { "name": "xformOp:translate", "precision": "double", "value": [1, 2, 3] },
                { "name": "xformOp:rotateY", "samples": [[0, 0], [10, 90]] },
                { "name": "xformOp:transform:shear", "value":
                    [[1,0,0,0],[0.25,1,0,0],[0.5,0.75,1,0],[0,0,0,1]] }
            ]
        }"#;
        let desc: PrimDescription = serde_json::from_str(json).unwrap();
        let prim = MemoryPrim::from_description(&desc).unwrap();
        assert_eq!(prim.op_order_names().len(), 3);

        let rot = XformOp::new(XformOpType::RotateY, Precision::Float, None);
        assert_eq!(prim.num_time_samples(&rot), 2);
        assert_eq!(prim.get(&rot, TimeCode::At(5.0)), Some(OpValue::Float(45.0)));

        let again = MemoryPrim::from_description(&prim.to_description()).unwrap();
        assert_eq!(again.op_order_names(), prim.op_order_names());
        assert_eq!(again.value("xformOp:translate", TimeCode::Default), prim.value("xformOp:translate", TimeCode::Default));
    }
}
