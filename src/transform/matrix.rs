//! Decomposition engine.
//!
//! [`TransformationMatrix`] binds to one prim, classifies its op stack and
//! keeps three views of the transform: the values last sampled from the
//! stack, the host edits not yet written back (tweaks), and the current
//! host-visible values (`sampled + tweak`). Channel setters live in
//! `reconcile.rs`, structural stack edits in `mutate.rs`.

use tracing::{debug, trace, warn};

use super::decomposed::{ChannelTweaks, DecomposedTransform};
use super::state::{ExternallyDrivenState, StackDerivedState};
use super::Channel;
use crate::core::{TimeCode, XformPrim};
use crate::settings::Settings;
use crate::stack::{classify, OpClassification, SchemaRegistry, SemanticSlot, XformOp, XformOpType};
use crate::util::{
    shear_from_mat4, shear_mat4, DMat4, DQuat, DVec3, Error, EulerRotation, OpValue, Precision, Result,
    RotationOrder,
};

/// Default distance below which rotate and scale pivots count as equal.
pub(crate) const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-6;

/// One live op with its classification.
#[derive(Clone, Debug, PartialEq)]
pub struct StackEntry {
    pub op: XformOp,
    pub class: OpClassification,
    /// Native-schema rank, filled lazily before the first insertion.
    pub canonical: Option<usize>,
}

/// Reconciles one prim's op stack with a fixed decomposed transform.
pub struct TransformationMatrix<P: XformPrim> {
    pub(super) registry: &'static SchemaRegistry,
    pub(super) prim: Option<P>,
    pub(super) entries: Vec<StackEntry>,
    pub(super) canonical_cached: bool,
    pub(super) time: TimeCode,
    pub(super) sampled: DecomposedTransform,
    pub(super) tweak: ChannelTweaks,
    pub(super) current: DecomposedTransform,
    pub(super) external: ExternallyDrivenState,
    pub(super) derived: StackDerivedState,
    pub(super) insert_precision: Precision,
    pub(super) pivot_tolerance: f64,
}

impl<P: XformPrim> Default for TransformationMatrix<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: XformPrim> TransformationMatrix<P> {
    /// Create an unbound transform using the shared schema registry.
    pub fn new() -> Self {
        Self::with_registry(SchemaRegistry::global())
    }

    /// Create an unbound transform classifying against `registry`.
    pub fn with_registry(registry: &'static SchemaRegistry) -> Self {
        Self {
            registry,
            prim: None,
            entries: Vec::new(),
            canonical_cached: false,
            time: TimeCode::Default,
            sampled: DecomposedTransform::IDENTITY,
            tweak: ChannelTweaks::default(),
            current: DecomposedTransform::IDENTITY,
            external: ExternallyDrivenState::default(),
            derived: StackDerivedState::default(),
            insert_precision: Precision::Float,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }

    /// Create an unbound transform configured from settings.
    pub fn with_settings(settings: &Settings) -> Self {
        let mut m = Self::new();
        m.external.push_to_prim = settings.push_to_prim;
        m.external.read_animated_values = settings.read_animated_values;
        m.insert_precision = settings.insert_precision;
        m.pivot_tolerance = settings.pivot_tolerance;
        m
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Bind to a prim and read its stack. Returns the previously bound prim.
    ///
    /// Invalid prims leave the transform unbound.
    pub fn bind(&mut self, prim: P) -> Option<P> {
        let previous = self.unbind();
        if prim.is_valid() {
            debug!("TransformationMatrix::bind {}", prim.name());
            self.prim = Some(prim);
            self.initialise_to_prim(true);
        } else {
            warn!("TransformationMatrix::bind: invalid prim {}, staying unbound", prim.name());
        }
        previous
    }

    /// Bind or unbind.
    pub fn set_prim(&mut self, prim: Option<P>) -> Option<P> {
        match prim {
            Some(prim) => self.bind(prim),
            None => self.unbind(),
        }
    }

    /// Drop the binding, keeping host values and host-driven state.
    pub fn unbind(&mut self) -> Option<P> {
        self.entries.clear();
        self.canonical_cached = false;
        self.derived = StackDerivedState::default();
        self.time = TimeCode::Default;
        self.prim.take()
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.prim.is_some()
    }

    #[inline]
    pub fn prim(&self) -> Option<&P> {
        self.prim.as_ref()
    }

    /// Mutable access for external re-authoring. Call
    /// [`initialise_to_prim`](Self::initialise_to_prim) afterwards.
    #[inline]
    pub fn prim_mut(&mut self) -> Option<&mut P> {
        self.prim.as_mut()
    }

    /// Classify the bound prim's stack and rebuild the derived state.
    ///
    /// With `read_from_prim`, the sampled and current values are replaced
    /// by the stack's values and all tweaks are dropped. Otherwise host
    /// values are kept and become tweaks against the last sample.
    pub fn initialise_to_prim(&mut self, read_from_prim: bool) {
        let Some(prim) = self.prim.as_ref() else {
            return;
        };
        debug!("TransformationMatrix::initialise_to_prim {}", prim.name());

        let (ops, resets_xform_stack) = prim.ordered_ops();
        let mut derived = StackDerivedState {
            inherits_transform: !resets_xform_stack,
            ..StackDerivedState::default()
        };
        let mut sampled = DecomposedTransform::with_rotation_order(self.current.rotation_order());
        self.canonical_cached = false;

        match classify(self.registry, &ops) {
            Some(stack) => {
                derived.schema = Some(stack.schema);
                if stack.classes.iter().any(|c| c.slot == SemanticSlot::Rotate) {
                    sampled.rotation.order = stack.rotation_order;
                }
                self.entries = ops
                    .into_iter()
                    .zip(stack.classes)
                    .map(|(op, class)| StackEntry { op, class, canonical: None })
                    .collect();

                for entry in self.entries.iter().filter(|e| !e.class.inverted) {
                    let slot = entry.class.slot;
                    derived.present.insert(slot);
                    if prim.num_time_samples(&entry.op) > 1 {
                        derived.animated.insert(slot);
                    }
                    if slot == SemanticSlot::Transform {
                        derived.from_matrix = true;
                        derived.push_prim_to_matrix = true;
                    }
                    if read_from_prim {
                        let time = read_time(prim, &entry.op, self.time);
                        if !read_entry(prim, entry, time, &mut sampled) {
                            warn!("initialise_to_prim: could not read {} on {}", entry.op, prim.name());
                        }
                    }
                }
                debug!(
                    "initialise_to_prim: {} matched {} (present {:?}, animated {:?})",
                    prim.name(),
                    stack.schema,
                    derived.present,
                    derived.animated
                );
            }
            None => {
                warn!(
                    "initialise_to_prim: {} matches no stack schema, falling back to its local matrix",
                    prim.name()
                );
                self.entries.clear();
                derived.from_matrix = true;
                if ops.iter().any(|op| prim.num_time_samples(op) > 1) {
                    derived.animated.insert(SemanticSlot::Transform);
                }
                if read_from_prim {
                    let time = match self.time {
                        TimeCode::Default => TimeCode::EarliestTime,
                        t => t,
                    };
                    match prim.local_transformation(time) {
                        Ok(m) => sampled = DecomposedTransform::decompose_matrix(&m, sampled.rotation_order()),
                        Err(e) => warn!("initialise_to_prim: local transformation of {} failed: {}", prim.name(), e),
                    }
                }
            }
        }

        if read_from_prim {
            self.sampled = sampled;
            self.current = sampled;
            self.tweak = ChannelTweaks::default();
        } else {
            for ch in Channel::ALL {
                self.tweak.capture(ch, &self.current, &self.sampled);
            }
        }
        if derived.has_animation() && self.external.push_to_prim {
            debug!("initialise_to_prim: {} is animated, writes to the prim are disabled", prim.name());
        }
        self.derived = derived;
    }

    /// Move to a new time, re-reading only animated ops.
    ///
    /// Tweaks are re-applied on top of the fresh samples. Calling with the
    /// current time does nothing.
    pub fn update_to_time(&mut self, time: TimeCode) {
        let Some(prim) = self.prim.as_ref() else {
            return;
        };
        if self.time == time {
            return;
        }
        debug!("TransformationMatrix::update_to_time {:?}", time);
        self.time = time;
        if !self.derived.has_animation() {
            return;
        }

        if self.derived.schema.is_none() {
            let read = match time {
                TimeCode::Default => TimeCode::EarliestTime,
                t => t,
            };
            match prim.local_transformation(read) {
                Ok(m) => {
                    self.sampled = DecomposedTransform::decompose_matrix(&m, self.sampled.rotation_order());
                    for ch in Channel::ALL {
                        self.tweak.apply(ch, &self.sampled, &mut self.current);
                    }
                }
                Err(e) => warn!("update_to_time: local transformation of {} failed: {}", prim.name(), e),
            }
            return;
        }

        for entry in &self.entries {
            let slot = entry.class.slot;
            if entry.class.inverted || !self.derived.is_animated(slot) {
                continue;
            }
            let read = read_time(prim, &entry.op, time);
            if read_entry(prim, entry, read, &mut self.sampled) {
                for &ch in Channel::for_slot(slot) {
                    self.tweak.apply(ch, &self.sampled, &mut self.current);
                }
            }
        }
    }

    // ========================================================================
    // Write-back
    // ========================================================================

    /// Check if host edits are currently written into the stack.
    ///
    /// Requires a bound, classified, non-animated prim and push-to-prim
    /// enabled by the host.
    pub fn push_to_prim_enabled(&self) -> bool {
        self.prim.is_some()
            && self.external.push_to_prim
            && self.derived.schema.is_some()
            && !self.derived.has_animation()
    }

    /// Check if animated ops are re-read on time changes.
    pub fn read_animated_values_enabled(&self) -> bool {
        self.external.read_animated_values || self.derived.has_animation()
    }

    /// Write the current value of every edited slot into its op.
    ///
    /// A slot is written when one of its channels carries a tweak or its op
    /// was just authored. Successfully written channels fold their tweak
    /// into the sampled value. Does nothing while writes are disabled.
    pub fn push_to_prim(&mut self) -> Result<()> {
        if !self.push_to_prim_enabled() {
            return Ok(());
        }
        let Some(prim) = self.prim.as_mut() else {
            return Ok(());
        };
        debug!("TransformationMatrix::push_to_prim {}", prim.name());

        let time = TimeCode::EarliestTime;
        let cur = &self.current;
        let mut failed = None;
        for entry in self.entries.iter().filter(|e| !e.class.inverted) {
            let op = &entry.op;
            let slot = entry.class.slot;
            let edited = Channel::for_slot(slot).iter().any(|&ch| self.tweak.is_set(ch));
            if !edited && !self.derived.unwritten.contains(slot) {
                continue;
            }
            let ok = match slot {
                SemanticSlot::Translate => push_vector(prim, op, cur.translation, time),
                SemanticSlot::Pivot | SemanticSlot::RotatePivot => push_vector(prim, op, cur.rotate_pivot, time),
                SemanticSlot::RotatePivotTranslate => push_vector(prim, op, cur.rotate_pivot_translation, time),
                SemanticSlot::Rotate => push_rotation(prim, op, &cur.rotation, time),
                SemanticSlot::RotateAxis => push_orientation(prim, op, cur.rotate_orientation, time),
                SemanticSlot::ScalePivotTranslate => push_vector(prim, op, cur.scale_pivot_translation, time),
                SemanticSlot::ScalePivot => push_vector(prim, op, cur.scale_pivot, time),
                SemanticSlot::Shear => push_matrix(prim, op, shear_mat4(cur.shear), time),
                SemanticSlot::Scale => push_vector(prim, op, cur.scale, time),
                SemanticSlot::Transform => {
                    if !self.derived.push_prim_to_matrix {
                        continue;
                    }
                    push_matrix(prim, op, cur.as_matrix(), time)
                }
            };

            if !ok {
                failed.get_or_insert_with(|| op.op_name());
                continue;
            }
            self.derived.unwritten.remove(slot);
            if slot == SemanticSlot::Pivot {
                // the stack holds one point for both pivots
                self.sampled.rotate_pivot = cur.rotate_pivot;
                self.sampled.scale_pivot = cur.rotate_pivot;
                self.tweak.clear(Channel::RotatePivot);
                self.tweak.capture(Channel::ScalePivot, cur, &self.sampled);
            } else {
                for &ch in Channel::for_slot(slot) {
                    self.sampled.copy_channel(cur, ch);
                    self.tweak.clear(ch);
                }
            }
        }

        match failed {
            Some(name) => Err(Error::WriteFailed(name)),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Composed local matrix including the local translate offset.
    pub fn as_matrix(&self) -> DMat4 {
        apply_offset(self.current.as_matrix(), self.external.local_translate_offset)
    }

    /// Composed matrix `percent` of the way from identity.
    pub fn as_matrix_fraction(&self, percent: f64) -> DMat4 {
        apply_offset(
            self.current.as_matrix_fraction(percent),
            self.external.local_translate_offset * percent,
        )
    }

    /// Move to `time` and compose the matrix there.
    pub fn as_matrix_at(&mut self, time: TimeCode) -> DMat4 {
        self.update_to_time(time);
        self.as_matrix()
    }

    /// Current host-visible values.
    #[inline]
    pub fn decomposed(&self) -> &DecomposedTransform {
        &self.current
    }

    /// Values last read from or written to the stack.
    #[inline]
    pub fn sampled(&self) -> &DecomposedTransform {
        &self.sampled
    }

    #[inline]
    pub fn tweaks(&self) -> &ChannelTweaks {
        &self.tweak
    }

    #[inline]
    pub fn translation(&self) -> DVec3 {
        self.current.translation
    }

    #[inline]
    pub fn rotation(&self) -> EulerRotation {
        self.current.rotation
    }

    #[inline]
    pub fn rotation_order(&self) -> RotationOrder {
        self.current.rotation_order()
    }

    #[inline]
    pub fn scale(&self) -> DVec3 {
        self.current.scale
    }

    #[inline]
    pub fn shear(&self) -> DVec3 {
        self.current.shear
    }

    #[inline]
    pub fn rotate_pivot(&self) -> DVec3 {
        self.current.rotate_pivot
    }

    #[inline]
    pub fn rotate_pivot_translation(&self) -> DVec3 {
        self.current.rotate_pivot_translation
    }

    #[inline]
    pub fn scale_pivot(&self) -> DVec3 {
        self.current.scale_pivot
    }

    #[inline]
    pub fn scale_pivot_translation(&self) -> DVec3 {
        self.current.scale_pivot_translation
    }

    #[inline]
    pub fn rotate_orientation(&self) -> DQuat {
        self.current.rotate_orientation
    }

    #[inline]
    pub fn time(&self) -> TimeCode {
        self.time
    }

    /// Name of the matched schema, `None` when unbound or unclassified.
    #[inline]
    pub fn schema(&self) -> Option<&'static str> {
        self.derived.schema
    }

    #[inline]
    pub fn derived_state(&self) -> &StackDerivedState {
        &self.derived
    }

    #[inline]
    pub fn external_state(&self) -> &ExternallyDrivenState {
        &self.external
    }

    /// Live ops with their classification, in stack order.
    #[inline]
    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    #[inline]
    pub fn has_animation(&self) -> bool {
        self.derived.has_animation()
    }

    /// Check if the slot holding `channel` is animated.
    pub fn has_animated(&self, channel: Channel) -> bool {
        let slot = channel.slot();
        self.derived.is_animated(slot)
            || self.derived.is_animated(SemanticSlot::Transform)
            || (matches!(channel, Channel::RotatePivot | Channel::ScalePivot)
                && self.derived.is_animated(SemanticSlot::Pivot))
    }

    #[inline]
    pub fn has_animated_matrix(&self) -> bool {
        self.derived.is_animated(SemanticSlot::Transform)
    }

    /// Check if the stack has an op for `channel`.
    pub fn has_channel_op(&self, channel: Channel) -> bool {
        self.derived.has_slot(channel.slot())
            || (matches!(channel, Channel::RotatePivot | Channel::ScalePivot) && self.derived.has_combined_pivot())
    }

    // ========================================================================
    // Host-driven state
    // ========================================================================

    pub fn set_local_translate_offset(&mut self, offset: DVec3) {
        self.external.local_translate_offset = offset;
    }

    #[inline]
    pub fn local_translate_offset(&self) -> DVec3 {
        self.external.local_translate_offset
    }

    pub fn lock(&mut self, channel: Channel) {
        self.external.locks.lock(channel);
    }

    pub fn unlock(&mut self, channel: Channel) {
        self.external.locks.unlock(channel);
    }

    #[inline]
    pub fn is_locked(&self, channel: Channel) -> bool {
        self.external.locks.is_locked(channel)
    }
}

/// Time to read `op` at: animated ops follow `time`, static ops resolve to
/// their single authored value.
pub(super) fn read_time<P: XformPrim>(prim: &P, op: &XformOp, time: TimeCode) -> TimeCode {
    if prim.num_time_samples(op) > 1 && !time.is_default() {
        time
    } else {
        TimeCode::EarliestTime
    }
}

/// Route one op's value into its decomposed field(s).
pub(super) fn read_entry<P: XformPrim>(
    prim: &P,
    entry: &StackEntry,
    time: TimeCode,
    out: &mut DecomposedTransform,
) -> bool {
    let op = &entry.op;
    match entry.class.slot {
        SemanticSlot::Translate => read_vector(prim, op, time, &mut out.translation),
        SemanticSlot::Pivot => {
            let ok = read_vector(prim, op, time, &mut out.rotate_pivot);
            out.scale_pivot = out.rotate_pivot;
            ok
        }
        SemanticSlot::RotatePivotTranslate => read_vector(prim, op, time, &mut out.rotate_pivot_translation),
        SemanticSlot::RotatePivot => read_vector(prim, op, time, &mut out.rotate_pivot),
        SemanticSlot::Rotate => read_rotation(prim, op, time, &mut out.rotation),
        SemanticSlot::RotateAxis => {
            let mut deg = DVec3::ZERO;
            let ok = read_vector(prim, op, time, &mut deg);
            if ok {
                out.rotate_orientation = EulerRotation::from_degrees(deg, RotationOrder::Xyz).to_quat();
            }
            ok
        }
        SemanticSlot::ScalePivotTranslate => read_vector(prim, op, time, &mut out.scale_pivot_translation),
        SemanticSlot::ScalePivot => read_vector(prim, op, time, &mut out.scale_pivot),
        SemanticSlot::Shear => {
            let mut m = DMat4::IDENTITY;
            let ok = read_matrix(prim, op, time, &mut m);
            if ok {
                out.shear = shear_from_mat4(&m);
            }
            ok
        }
        SemanticSlot::Scale => read_vector(prim, op, time, &mut out.scale),
        SemanticSlot::Transform => {
            let mut m = DMat4::IDENTITY;
            let ok = read_matrix(prim, op, time, &mut m);
            if ok {
                *out = DecomposedTransform::decompose_matrix(&m, out.rotation_order());
            }
            ok
        }
    }
}

fn read_vector<P: XformPrim>(prim: &P, op: &XformOp, time: TimeCode, out: &mut DVec3) -> bool {
    match prim.get(op, time).and_then(|v| v.as_dvec3()) {
        Some(v) => {
            trace!("read_vector {} = {:?}", op, v);
            *out = v;
            true
        }
        None => false,
    }
}

fn read_matrix<P: XformPrim>(prim: &P, op: &XformOp, time: TimeCode, out: &mut DMat4) -> bool {
    match prim.get(op, time).and_then(|v| v.as_dmat4()) {
        Some(m) => {
            trace!("read_matrix {}", op);
            *out = m;
            true
        }
        None => false,
    }
}

/// Read a rotate op into `out`, keeping `out`'s rotation order.
fn read_rotation<P: XformPrim>(prim: &P, op: &XformOp, time: TimeCode, out: &mut EulerRotation) -> bool {
    let Some(value) = prim.get(op, time) else {
        return false;
    };
    let order = out.order;
    let rotation = match op.op_type {
        XformOpType::RotateX => value.as_f64().map(|a| EulerRotation::new(a.to_radians(), 0.0, 0.0, order)),
        XformOpType::RotateY => value.as_f64().map(|a| EulerRotation::new(0.0, a.to_radians(), 0.0, order)),
        XformOpType::RotateZ => value.as_f64().map(|a| EulerRotation::new(0.0, 0.0, a.to_radians(), order)),
        t => value
            .as_dvec3()
            .zip(t.rotation_order())
            .map(|(deg, op_order)| EulerRotation::from_degrees(deg, op_order)),
    };
    match rotation {
        Some(r) => {
            trace!("read_rotation {} = {:?}", op, r);
            *out = if r.order == order { r } else { r.reorder(order) };
            true
        }
        None => false,
    }
}

fn write_value<P: XformPrim>(prim: &mut P, op: &XformOp, value: OpValue, time: TimeCode) -> bool {
    match prim.set(op, value, time) {
        Ok(()) => {
            trace!("write {} = {:?}", op, value);
            true
        }
        Err(e) => {
            warn!("write {} failed: {}", op, e);
            false
        }
    }
}

fn push_vector<P: XformPrim>(prim: &mut P, op: &XformOp, v: DVec3, time: TimeCode) -> bool {
    match OpValue::from_dvec3(op.value_kind(), v) {
        Some(value) => write_value(prim, op, value, time),
        None => {
            warn!("push_vector: {} does not hold a vector", op);
            false
        }
    }
}

/// Write an orientation as XYZ degrees, picking the Euler solution closest
/// to the angles already stored in the op.
fn push_orientation<P: XformPrim>(prim: &mut P, op: &XformOp, q: DQuat, time: TimeCode) -> bool {
    let mut rotation = EulerRotation::from_quat(q, RotationOrder::Xyz);
    if let Some(stored) = prim.get(op, time).and_then(|v| v.as_dvec3()) {
        rotation = rotation.closest_to(&EulerRotation::from_degrees(stored, RotationOrder::Xyz));
    }
    push_vector(prim, op, rotation.to_degrees(), time)
}

fn push_matrix<P: XformPrim>(prim: &mut P, op: &XformOp, m: DMat4, time: TimeCode) -> bool {
    if op.op_type != XformOpType::Transform {
        warn!("push_matrix: {} does not hold a matrix", op);
        return false;
    }
    write_value(prim, op, OpValue::Matrix4d(m), time)
}

/// Write a rotation in the op's own order, in degrees.
fn push_rotation<P: XformPrim>(prim: &mut P, op: &XformOp, rotation: &EulerRotation, time: TimeCode) -> bool {
    let axis = match op.op_type {
        XformOpType::RotateX => Some(0),
        XformOpType::RotateY => Some(1),
        XformOpType::RotateZ => Some(2),
        _ => None,
    };
    let value = match (axis, op.op_type.rotation_order()) {
        (Some(axis), _) => {
            let deg = rotation.to_degrees();
            let mut others = deg;
            others[axis] = 0.0;
            if others != DVec3::ZERO {
                warn!("push_rotation: {} only stores one axis, dropping {:?}", op, others);
            }
            OpValue::from_f64(op.value_kind(), deg[axis])
        }
        (None, Some(order)) => OpValue::from_dvec3(op.value_kind(), rotation.reorder(order).to_degrees()),
        (None, None) => None,
    };
    match value {
        Some(value) => write_value(prim, op, value, time),
        None => {
            warn!("push_rotation: {} is not a rotate op", op);
            false
        }
    }
}

fn apply_offset(mut m: DMat4, offset: DVec3) -> DMat4 {
    let shift = m.x_axis.truncate() * offset.x + m.y_axis.truncate() * offset.y + m.z_axis.truncate() * offset.z;
    m.w_axis += shift.extend(0.0);
    m
}
