//! Stack classifier - matches a live op sequence against stack schemas.

use super::op::XformOp;
use super::schema::{OpClassification, SchemaRegistry, SemanticSlot, StackSchema};
use crate::util::RotationOrder;

/// A live op sequence matched against one schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedStack {
    /// Name of the matched schema.
    pub schema: &'static str,
    /// One classification per live op, in live order.
    pub classes: Vec<OpClassification>,
    /// Rotation order implied by the rotate op, XYZ if there is none.
    pub rotation_order: RotationOrder,
}

/// Classify `ops` against the registry's schemas in priority order.
pub fn classify(registry: &SchemaRegistry, ops: &[XformOp]) -> Option<ClassifiedStack> {
    classify_with(registry.schemas(), ops)
}

/// Classify `ops` against an explicit priority-ordered candidate list.
///
/// Returns the first schema whose slots can be matched to the ops in
/// strictly increasing slot order. An empty sequence matches the first
/// candidate.
pub fn classify_with<'a, I>(candidates: I, ops: &[XformOp]) -> Option<ClassifiedStack>
where
    I: IntoIterator<Item = &'a StackSchema>,
{
    let mut candidates = candidates.into_iter();
    if ops.is_empty() {
        return candidates.next().map(|schema| ClassifiedStack {
            schema: schema.name(),
            classes: Vec::new(),
            rotation_order: RotationOrder::Xyz,
        });
    }

    candidates.find_map(|schema| {
        let classes = match_schema(schema, ops)?;
        let rotation_order = ops
            .iter()
            .zip(&classes)
            .find(|(_, c)| c.slot == SemanticSlot::Rotate)
            .and_then(|(op, _)| op.op_type.rotation_order())
            .unwrap_or_default();
        Some(ClassifiedStack {
            schema: schema.name(),
            classes,
            rotation_order,
        })
    })
}

fn match_schema(schema: &StackSchema, ops: &[XformOp]) -> Option<Vec<OpClassification>> {
    let slots = schema.ops();
    let mut matched = vec![false; slots.len()];
    let mut classes = Vec::with_capacity(ops.len());
    let mut next = 0;

    for op in ops {
        let found = (next..slots.len()).find(|&i| slots[i].is_compatible(op))?;
        if slots[found].inverted {
            // an inverted op only closes a pair that is already open
            let partner = schema.twin_of(found)?;
            if !matched[partner] {
                return None;
            }
        }
        matched[found] = true;
        classes.push(slots[found]);
        next = found + 1;
    }

    // pivots must come balanced
    if schema.twins().iter().any(|&(a, b)| matched[a] != matched[b]) {
        return None;
    }
    Some(classes)
}
