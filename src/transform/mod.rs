//! Transform layer - the host's decomposed view and its reconciliation with
//! an op stack.
//!
//! This module provides:
//! - [`DecomposedTransform`] - Fixed-shape host transform and its algebra
//! - [`ChannelTweaks`] - Host edits not yet folded back into the stack
//! - [`ExternallyDrivenState`] / [`StackDerivedState`] - Reconciler flags
//! - [`TransformationMatrix`] - Decomposition engine, reconciler and op mutator

mod decomposed;
mod state;
mod matrix;
mod reconcile;
mod mutate;

pub use decomposed::{ChannelTweaks, DecomposedTransform};
pub use state::{ChannelLocks, ExternallyDrivenState, StackDerivedState};
pub use matrix::{StackEntry, TransformationMatrix};
pub use mutate::SplitOutcome;

use crate::stack::SemanticSlot;

/// One independently editable component of the host transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Translate,
    Rotate,
    Scale,
    Shear,
    RotatePivot,
    RotatePivotTranslate,
    ScalePivot,
    ScalePivotTranslate,
    RotateOrientation,
}

impl Channel {
    /// All channels, in the order a resync visits them.
    pub const ALL: [Self; 9] = [
        Self::Translate,
        Self::Scale,
        Self::Shear,
        Self::ScalePivot,
        Self::ScalePivotTranslate,
        Self::RotatePivot,
        Self::RotatePivotTranslate,
        Self::Rotate,
        Self::RotateOrientation,
    ];

    /// Native slot holding this channel.
    pub const fn slot(self) -> SemanticSlot {
        match self {
            Self::Translate => SemanticSlot::Translate,
            Self::Rotate => SemanticSlot::Rotate,
            Self::Scale => SemanticSlot::Scale,
            Self::Shear => SemanticSlot::Shear,
            Self::RotatePivot => SemanticSlot::RotatePivot,
            Self::RotatePivotTranslate => SemanticSlot::RotatePivotTranslate,
            Self::ScalePivot => SemanticSlot::ScalePivot,
            Self::ScalePivotTranslate => SemanticSlot::ScalePivotTranslate,
            Self::RotateOrientation => SemanticSlot::RotateAxis,
        }
    }

    /// Channels fed by a slot.
    pub fn for_slot(slot: SemanticSlot) -> &'static [Channel] {
        match slot {
            SemanticSlot::Translate => &[Self::Translate],
            SemanticSlot::Pivot => &[Self::RotatePivot, Self::ScalePivot],
            SemanticSlot::RotatePivotTranslate => &[Self::RotatePivotTranslate],
            SemanticSlot::RotatePivot => &[Self::RotatePivot],
            SemanticSlot::Rotate => &[Self::Rotate],
            SemanticSlot::RotateAxis => &[Self::RotateOrientation],
            SemanticSlot::ScalePivotTranslate => &[Self::ScalePivotTranslate],
            SemanticSlot::ScalePivot => &[Self::ScalePivot],
            SemanticSlot::Shear => &[Self::Shear],
            SemanticSlot::Scale => &[Self::Scale],
            SemanticSlot::Transform => &Self::ALL,
        }
    }

    #[inline]
    pub(crate) const fn bit(self) -> u16 {
        1 << self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_mapping() {
        for ch in Channel::ALL {
            assert!(Channel::for_slot(ch.slot()).contains(&ch), "{ch:?}");
        }
        assert_eq!(Channel::for_slot(SemanticSlot::Pivot).len(), 2);
        assert_eq!(Channel::for_slot(SemanticSlot::Transform).len(), 9);
    }
}
