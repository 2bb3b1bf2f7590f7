//! Reconciler flags, split by who owns them.
//!
//! [`ExternallyDrivenState`] is set by the host and survives rebinding to a
//! different prim. [`StackDerivedState`] is recomputed from the op stack on
//! every (re)initialisation.

use std::fmt;

use super::Channel;
use crate::stack::{SemanticSlot, SlotSet};
use crate::util::DVec3;

/// Set of host-locked channels.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelLocks(u16);

impl ChannelLocks {
    pub const NONE: Self = Self(0);

    #[inline]
    pub fn lock(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    #[inline]
    pub fn unlock(&mut self, channel: Channel) {
        self.0 &= !channel.bit();
    }

    #[inline]
    pub fn is_locked(&self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }
}

impl fmt::Debug for ChannelLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(Channel::ALL.into_iter().filter(|c| self.is_locked(*c)))
            .finish()
    }
}

/// Host-authoritative settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExternallyDrivenState {
    /// Write host edits back into the op stack.
    pub push_to_prim: bool,
    /// Re-read animated ops on time changes.
    pub read_animated_values: bool,
    pub locks: ChannelLocks,
    /// Constant local-space offset added on top of the composed matrix.
    pub local_translate_offset: DVec3,
}

impl Default for ExternallyDrivenState {
    fn default() -> Self {
        Self {
            push_to_prim: false,
            read_animated_values: true,
            locks: ChannelLocks::NONE,
            local_translate_offset: DVec3::ZERO,
        }
    }
}

/// Facts derived from the bound prim's op stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StackDerivedState {
    /// Matched schema, `None` when the stack fell back to a raw matrix.
    pub schema: Option<&'static str>,
    pub inherits_transform: bool,
    /// Values were decomposed from a dense matrix.
    pub from_matrix: bool,
    /// Edits are written as one whole matrix into a `transform` op.
    pub push_prim_to_matrix: bool,
    pub present: SlotSet,
    pub animated: SlotSet,
    /// Slots whose op was authored by an insertion and holds no value yet.
    pub unwritten: SlotSet,
}

impl Default for StackDerivedState {
    fn default() -> Self {
        Self {
            schema: None,
            inherits_transform: true,
            from_matrix: false,
            push_prim_to_matrix: false,
            present: SlotSet::EMPTY,
            animated: SlotSet::EMPTY,
            unwritten: SlotSet::EMPTY,
        }
    }
}

impl StackDerivedState {
    #[inline]
    pub fn has_animation(&self) -> bool {
        !self.animated.is_empty()
    }

    #[inline]
    pub fn has_slot(&self, slot: SemanticSlot) -> bool {
        self.present.contains(slot)
    }

    #[inline]
    pub fn is_animated(&self, slot: SemanticSlot) -> bool {
        self.animated.contains(slot)
    }

    /// Check if the stack carries a single combined pivot.
    #[inline]
    pub fn has_combined_pivot(&self) -> bool {
        self.present.contains(SemanticSlot::Pivot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locks() {
        let mut locks = ChannelLocks::default();
        locks.lock(Channel::Rotate);
        locks.lock(Channel::Scale);
        assert!(locks.is_locked(Channel::Rotate));
        assert!(!locks.is_locked(Channel::Translate));
        locks.unlock(Channel::Rotate);
        assert!(!locks.is_locked(Channel::Rotate));
        assert_eq!(format!("{locks:?}"), "{Scale}");
    }

    #[test]
    fn test_derived_defaults() {
        let s = StackDerivedState::default();
        assert!(s.inherits_transform);
        assert!(!s.has_animation());
        assert!(!s.has_combined_pivot());
    }
}
