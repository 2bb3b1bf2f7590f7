//! Op mutator - structural edits to the live op stack.
//!
//! Insertions land at the native-schema position using a lazily built
//! per-entry canonical rank. Every edit is written to the prim as a new op
//! order, and a failed edit leaves both the entries and the prim's order as
//! they were.

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::matrix::{StackEntry, TransformationMatrix};
use super::Channel;
use crate::core::XformPrim;
use crate::stack::{classify, OpClassification, SemanticSlot, XformOp, XformOpType};
use crate::util::{approx_eq, Error, Precision, Result};

/// Outcome of [`TransformationMatrix::split_pivot_if_needed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitOutcome {
    /// The stack has no combined pivot.
    NoCombinedPivot,
    /// Rotate and scale pivots still agree; the combined op stays.
    StillEqual,
    /// The combined op was replaced by separate pivot ops.
    Split,
}

impl SplitOutcome {
    /// Check if the caller should skip inserting its own pivot op.
    #[inline]
    pub fn skips_insert(self) -> bool {
        !matches!(self, Self::NoCombinedPivot)
    }
}

/// Attribute suffix used when authoring an op for `slot`.
fn op_suffix(slot: SemanticSlot) -> Option<&'static str> {
    match slot {
        SemanticSlot::Translate | SemanticSlot::Rotate | SemanticSlot::Scale | SemanticSlot::Transform => None,
        s => Some(s.name()),
    }
}

impl<P: XformPrim> TransformationMatrix<P> {
    /// Author the op(s) for a native slot at their canonical position.
    ///
    /// Slots with an inverted twin author both ops. With
    /// `insert_at_beginning` the ops go to the front of the stack instead of
    /// being placed by rank.
    pub fn insert_op(
        &mut self,
        op_type: XformOpType,
        precision: Precision,
        slot: SemanticSlot,
        insert_at_beginning: bool,
    ) -> Result<()> {
        if self.prim.is_none() {
            return Err(Error::Unbound);
        }
        let registry = self.registry;
        let native = registry.native();
        let pair = native
            .find_index_pair(slot)
            .ok_or_else(|| Error::OpCreationFailed(format!("{} has no native slot", slot)))?;
        debug!("TransformationMatrix::insert_op {} ({})", slot, op_type);
        let cached = self.canonical_cached;
        if !insert_at_beginning {
            self.build_canonical_cache();
        }

        let mut inserted: SmallVec<[usize; 2]> = SmallVec::new();
        // twin first, so that two front insertions keep their relative order
        for index in pair.second.into_iter().chain(Some(pair.first)) {
            match self.add_entry(op_type, precision, native.ops()[index], insert_at_beginning) {
                Ok(pos) => {
                    for p in inserted.iter_mut().filter(|p| **p >= pos) {
                        *p += 1;
                    }
                    inserted.push(pos);
                }
                Err(e) => {
                    warn!("insert_op: could not author {} op: {}", slot, e);
                    self.remove_entries(&inserted);
                    self.restore_canonical_cache(cached);
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.write_op_order() {
            warn!("insert_op: op order rejected: {}", e);
            self.remove_entries(&inserted);
            self.restore_canonical_cache(cached);
            return Err(e);
        }
        self.derived.present.insert(slot);
        self.derived.unwritten.insert(slot);
        self.refresh_schema();
        Ok(())
    }

    /// Remove the op(s) classified as `slot`, including an inverted twin.
    pub fn remove_op(&mut self, slot: SemanticSlot) -> Result<()> {
        if self.prim.is_none() {
            return Err(Error::Unbound);
        }
        debug!("TransformationMatrix::remove_op {}", slot);

        let mut removed: SmallVec<[(usize, StackEntry); 2]> = SmallVec::new();
        let mut i = 0;
        while i < self.entries.len() && removed.len() < 2 {
            if self.entries[i].class.slot == slot {
                let original = i + removed.len();
                removed.push((original, self.entries.remove(i)));
            } else {
                i += 1;
            }
        }
        if removed.is_empty() {
            warn!("remove_op: no {} op in the stack", slot);
            return Err(Error::OpNotFound(slot.name().to_owned()));
        }

        if let Err(e) = self.write_op_order() {
            warn!("remove_op: op order rejected: {}", e);
            for (pos, entry) in removed {
                self.entries.insert(pos, entry);
            }
            return Err(e);
        }
        self.derived.present.remove(slot);
        self.derived.animated.remove(slot);
        self.derived.unwritten.remove(slot);
        self.refresh_schema();
        Ok(())
    }

    /// Split a combined pivot once the rotate and scale pivots diverge.
    ///
    /// Split pivots are never merged back, even if they become equal again.
    pub fn split_pivot_if_needed(&mut self) -> Result<SplitOutcome> {
        if !self.derived.has_combined_pivot() {
            return Ok(SplitOutcome::NoCombinedPivot);
        }
        if approx_eq(self.current.rotate_pivot, self.current.scale_pivot, self.pivot_tolerance) {
            return Ok(SplitOutcome::StillEqual);
        }
        self.split_pivot_forced()?;
        Ok(SplitOutcome::Split)
    }

    /// Replace a combined pivot by separate rotate and scale pivot ops,
    /// whether or not they differ. Pivots at the origin get no op.
    pub(super) fn split_pivot_forced(&mut self) -> Result<()> {
        let Some(precision) = self
            .entries
            .iter()
            .find(|e| e.class.slot == SemanticSlot::Pivot)
            .map(|e| e.op.precision)
        else {
            return Ok(());
        };
        debug!(
            "TransformationMatrix::split_pivot rotate {:?} scale {:?}",
            self.current.rotate_pivot, self.current.scale_pivot
        );

        let entries = self.entries.clone();
        let derived = self.derived;
        let cached = self.canonical_cached;
        if let Err(e) = self.replace_combined_pivot(precision) {
            warn!("split_pivot: {}, restoring the stack", e);
            self.entries = entries;
            self.derived = derived;
            self.canonical_cached = cached;
            if let Err(restore) = self.write_op_order() {
                warn!("split_pivot: could not restore op order: {}", restore);
            }
            return Err(e);
        }
        Ok(())
    }

    fn replace_combined_pivot(&mut self, precision: Precision) -> Result<()> {
        self.remove_op(SemanticSlot::Pivot)?;
        for channel in [Channel::RotatePivot, Channel::ScalePivot] {
            if !self.current.is_default(channel) {
                self.insert_op(XformOpType::Translate, precision, channel.slot(), false)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Author one op and place it in the entries. Returns its position.
    fn add_entry(
        &mut self,
        op_type: XformOpType,
        precision: Precision,
        class: OpClassification,
        at_beginning: bool,
    ) -> Result<usize> {
        let prim = self.prim.as_mut().ok_or(Error::Unbound)?;
        let op = prim.add_op(op_type, precision, op_suffix(class.slot), class.inverted)?;
        let rank = self.registry.native_rank(class.key());
        let pos = if at_beginning {
            0
        } else {
            self.entries
                .partition_point(|e| e.canonical.is_some_and(|c| c < rank))
        };
        trace!("add_entry {} at {} (rank {})", op, pos, rank);
        self.entries.insert(
            pos,
            StackEntry {
                op,
                class,
                canonical: self.canonical_cached.then_some(rank),
            },
        );
        Ok(pos)
    }

    fn remove_entries(&mut self, positions: &[usize]) {
        let mut positions: SmallVec<[usize; 2]> = positions.iter().copied().collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        for pos in positions {
            self.entries.remove(pos);
        }
    }

    fn build_canonical_cache(&mut self) {
        if self.canonical_cached {
            return;
        }
        for entry in &mut self.entries {
            entry.canonical = Some(self.registry.native_rank(entry.class.key()));
        }
        self.canonical_cached = true;
    }

    /// Drop a cache built by a failed edit.
    fn restore_canonical_cache(&mut self, cached: bool) {
        if cached {
            return;
        }
        for entry in &mut self.entries {
            entry.canonical = None;
        }
        self.canonical_cached = false;
    }

    fn write_op_order(&mut self) -> Result<()> {
        let ops: Vec<XformOp> = self.entries.iter().map(|e| e.op.clone()).collect();
        let resets = !self.derived.inherits_transform;
        let prim = self.prim.as_mut().ok_or(Error::Unbound)?;
        prim.set_op_order(&ops, resets)
    }

    fn refresh_schema(&mut self) {
        let ops: Vec<XformOp> = self.entries.iter().map(|e| e.op.clone()).collect();
        match classify(self.registry, &ops) {
            Some(stack) => {
                if self.derived.schema != Some(stack.schema) {
                    debug!("refresh_schema: stack is now {}", stack.schema);
                }
                self.derived.schema = Some(stack.schema);
                for (entry, class) in self.entries.iter_mut().zip(stack.classes) {
                    entry.class = class;
                }
            }
            None => warn!("refresh_schema: edited stack matches no schema"),
        }
    }
}
