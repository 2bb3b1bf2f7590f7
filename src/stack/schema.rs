//! Stack schemas - fixed catalogues of expected op slots.
//!
//! A schema is an ordered list of [`OpClassification`]s plus the pairs of
//! slots that are inverses of each other (pivots). Schemas live in a
//! [`SchemaRegistry`] which is built once and never mutated.

use std::fmt;
use std::sync::OnceLock;

use super::op::{XformOp, XformOpType};

/// Host-native multi-pivot layout.
pub const MAYA_STACK: &str = "MayaStack";
/// Translate / combined pivot / rotate / scale layout.
pub const COMMON_STACK: &str = "CommonStack";
/// Native ordering with a single combined pivot.
pub const SINGLE_PIVOT_STACK: &str = "SinglePivotStack";
/// A single raw 4x4 op.
pub const MATRIX_STACK: &str = "MatrixStack";

/// Semantic meaning of a slot, independent of the schema it appears in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticSlot {
    Translate,
    Pivot,
    RotatePivotTranslate,
    RotatePivot,
    Rotate,
    RotateAxis,
    ScalePivotTranslate,
    ScalePivot,
    Shear,
    Scale,
    Transform,
}

impl SemanticSlot {
    pub const ALL: [Self; 11] = [
        Self::Translate,
        Self::Pivot,
        Self::RotatePivotTranslate,
        Self::RotatePivot,
        Self::Rotate,
        Self::RotateAxis,
        Self::ScalePivotTranslate,
        Self::ScalePivot,
        Self::Shear,
        Self::Scale,
        Self::Transform,
    ];

    /// Token used as the op name suffix.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Pivot => "pivot",
            Self::RotatePivotTranslate => "rotatePivotTranslate",
            Self::RotatePivot => "rotatePivot",
            Self::Rotate => "rotate",
            Self::RotateAxis => "rotateAxis",
            Self::ScalePivotTranslate => "scalePivotTranslate",
            Self::ScalePivot => "scalePivot",
            Self::Shear => "shear",
            Self::Scale => "scale",
            Self::Transform => "transform",
        }
    }

    #[inline]
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl fmt::Display for SemanticSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lookup key shared by all schemas: the slot and whether it is the inverted twin.
pub type SlotKey = (SemanticSlot, bool);

/// Set of semantic slots.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SlotSet(u16);

impl SlotSet {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn insert(&mut self, slot: SemanticSlot) {
        self.0 |= slot.bit();
    }

    #[inline]
    pub fn remove(&mut self, slot: SemanticSlot) {
        self.0 &= !slot.bit();
    }

    #[inline]
    pub fn contains(&self, slot: SemanticSlot) -> bool {
        self.0 & slot.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = SemanticSlot> + '_ {
        SemanticSlot::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl fmt::Debug for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Identity of one canonical slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpClassification {
    pub slot: SemanticSlot,
    pub op_type: XformOpType,
    pub inverted: bool,
}

impl OpClassification {
    pub const fn new(slot: SemanticSlot, op_type: XformOpType) -> Self {
        Self { slot, op_type, inverted: false }
    }

    /// Inverted twin of a pivot slot.
    pub const fn twin(slot: SemanticSlot, op_type: XformOpType) -> Self {
        Self { slot, op_type, inverted: true }
    }

    #[inline]
    pub fn key(&self) -> SlotKey {
        (self.slot, self.inverted)
    }

    #[inline]
    pub fn is_inverted_twin(&self) -> bool {
        self.inverted
    }

    /// Check if a live op can fill this slot.
    ///
    /// Names match on the op suffix, or on the type-derived token for
    /// unsuffixed ops (`xformOp:translate` is the `translate` slot, any
    /// unsuffixed rotate is the `rotate` slot). Three-axis rotate slots
    /// accept every rotate type.
    pub fn is_compatible(&self, op: &XformOp) -> bool {
        if op.inverted != self.inverted {
            return false;
        }
        let type_ok = if self.op_type.is_three_axis_rotate() {
            op.op_type.is_rotate()
        } else {
            op.op_type == self.op_type
        };
        type_ok && op_token(op) == self.slot.name()
    }
}

fn op_token(op: &XformOp) -> &str {
    match &op.suffix {
        Some(s) => s.as_str(),
        None if op.op_type.is_rotate() => "rotate",
        None => op.op_type.name(),
    }
}

/// Slot indices of an op and its optional inverted twin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexPair {
    pub first: usize,
    pub second: Option<usize>,
}

/// An ordered catalogue of expected op slots.
#[derive(Clone, Debug)]
pub struct StackSchema {
    name: &'static str,
    ops: Vec<OpClassification>,
    twins: Vec<(usize, usize)>,
}

impl StackSchema {
    /// Create a schema. Twin pairs are `(op, inverted twin)` indices.
    pub fn new(name: &'static str, ops: Vec<OpClassification>, twins: Vec<(usize, usize)>) -> Self {
        debug_assert!(twins.iter().all(|&(a, b)| a < b && b < ops.len() && ops[b].inverted));
        Self { name, ops, twins }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn ops(&self) -> &[OpClassification] {
        &self.ops
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn twins(&self) -> &[(usize, usize)] {
        &self.twins
    }

    /// Index of the slot with the given key.
    pub fn find_index(&self, key: SlotKey) -> Option<usize> {
        self.ops.iter().position(|c| c.key() == key)
    }

    /// Indices of a slot and its twin, if the slot exists.
    pub fn find_index_pair(&self, slot: SemanticSlot) -> Option<IndexPair> {
        let first = self.find_index((slot, false))?;
        let second = self.twin_of(first);
        Some(IndexPair { first, second })
    }

    /// The other half of a twin pair.
    pub fn twin_of(&self, index: usize) -> Option<usize> {
        self.twins.iter().find_map(|&(a, b)| match index {
            i if i == a => Some(b),
            i if i == b => Some(a),
            _ => None,
        })
    }

    /// Check if the schema has a slot for `slot`.
    #[inline]
    pub fn contains(&self, slot: SemanticSlot) -> bool {
        self.ops.iter().any(|c| c.slot == slot)
    }
}

/// Immutable, process-wide catalogue of schemas in classification priority.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: Vec<StackSchema>,
}

impl SchemaRegistry {
    /// Build the standard catalogue.
    pub fn new() -> Self {
        use SemanticSlot as S;
        use XformOpType as T;

        let maya = StackSchema::new(
            MAYA_STACK,
            vec![
                OpClassification::new(S::Translate, T::Translate),
                OpClassification::new(S::RotatePivotTranslate, T::Translate),
                OpClassification::new(S::RotatePivot, T::Translate),
                OpClassification::new(S::Rotate, T::RotateXYZ),
                OpClassification::new(S::RotateAxis, T::RotateXYZ),
                OpClassification::twin(S::RotatePivot, T::Translate),
                OpClassification::new(S::ScalePivotTranslate, T::Translate),
                OpClassification::new(S::ScalePivot, T::Translate),
                OpClassification::new(S::Shear, T::Transform),
                OpClassification::new(S::Scale, T::Scale),
                OpClassification::twin(S::ScalePivot, T::Translate),
            ],
            vec![(2, 5), (7, 10)],
        );

        let common = StackSchema::new(
            COMMON_STACK,
            vec![
                OpClassification::new(S::Translate, T::Translate),
                OpClassification::new(S::Pivot, T::Translate),
                OpClassification::new(S::Rotate, T::RotateXYZ),
                OpClassification::new(S::Scale, T::Scale),
                OpClassification::twin(S::Pivot, T::Translate),
            ],
            vec![(1, 4)],
        );

        let single_pivot = StackSchema::new(
            SINGLE_PIVOT_STACK,
            vec![
                OpClassification::new(S::Translate, T::Translate),
                OpClassification::new(S::Pivot, T::Translate),
                OpClassification::new(S::Rotate, T::RotateXYZ),
                OpClassification::new(S::RotateAxis, T::RotateXYZ),
                OpClassification::new(S::Shear, T::Transform),
                OpClassification::new(S::Scale, T::Scale),
                OpClassification::twin(S::Pivot, T::Translate),
            ],
            vec![(1, 6)],
        );

        let matrix = StackSchema::new(
            MATRIX_STACK,
            vec![OpClassification::new(S::Transform, T::Transform)],
            Vec::new(),
        );

        Self {
            schemas: vec![maya, common, single_pivot, matrix],
        }
    }

    /// The shared registry, built on first use.
    pub fn global() -> &'static SchemaRegistry {
        static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SchemaRegistry::new)
    }

    /// Schemas in classification priority.
    #[inline]
    pub fn schemas(&self) -> &[StackSchema] {
        &self.schemas
    }

    /// The host-native schema (first in priority).
    #[inline]
    pub fn native(&self) -> &StackSchema {
        &self.schemas[0]
    }

    /// Find a schema by name.
    pub fn get(&self, name: &str) -> Option<&StackSchema> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    /// Position of a slot in native canonical order.
    ///
    /// Slots without a native counterpart take the rank of the native slot
    /// they stand in for: the combined pivot ranks as the rotate pivot, its
    /// twin as the scale pivot twin, and a raw transform after everything.
    pub fn native_rank(&self, key: SlotKey) -> usize {
        let native = self.native();
        if let Some(i) = native.find_index(key) {
            return i;
        }
        let stand_in = match key {
            (SemanticSlot::Pivot, false) => native.find_index((SemanticSlot::RotatePivot, false)),
            (SemanticSlot::Pivot, true) => native.find_index((SemanticSlot::ScalePivot, true)),
            _ => None,
        };
        stand_in.unwrap_or(native.len())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
