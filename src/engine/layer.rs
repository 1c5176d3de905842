//! Layer Engine State Machine
//!
//! One engine per declared layer. Exclusive-crossfade layers own a
//! transition state machine (Idle → Transitioning → Steady) whose
//! interruption primitive is the snapshot: every new target captures the
//! layer's *live* output as the new crossfade start, so repeated
//! interruptions chain smoothly instead of popping. Additive layers carry no
//! transition state at all; their output is recomputed from the accumulation
//! set every tick.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::{clamp01, ChannelBuffer};
use crate::engine::curve::{compute_blend_weight, Curve};
use crate::engine::resolve;

/// How a layer combines the expressions targeted at it
///
/// Closed set: the engine special-cases exactly these two policies and no
/// third one is added dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    /// Only one expression is active at a time; switching crossfades.
    ExclusiveCrossfade,
    /// Multiple expressions sum, saturating per channel.
    AdditiveBlend,
}

impl fmt::Display for ExclusionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionPolicy::ExclusiveCrossfade => write!(f, "exclusive-crossfade"),
            ExclusionPolicy::AdditiveBlend => write!(f, "additive-blend"),
        }
    }
}

/// Observable state of a layer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerState {
    /// Output all zero, no active expression
    #[default]
    Idle,
    /// Crossfading from the last snapshot toward the target
    Transitioning,
    /// Transition complete; output pinned to the target
    Steady,
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerState::Idle => write!(f, "Idle"),
            LayerState::Transitioning => write!(f, "Transitioning"),
            LayerState::Steady => write!(f, "Steady"),
        }
    }
}

/// Crossfade bookkeeping for an exclusive layer
#[derive(Debug, Clone)]
struct CrossfadeState {
    /// Snapshot taken when the current transition started
    from: ChannelBuffer,
    /// Target weights of the active expression
    to: ChannelBuffer,
    elapsed: f32,
    duration: f32,
    curve: Curve,
    state: LayerState,
    active_id: Option<String>,
    /// Set while fading toward zero; `active_id` clears only once Steady
    deactivating: bool,
}

impl CrossfadeState {
    fn new(channel_count: usize) -> Self {
        Self {
            from: ChannelBuffer::new(channel_count),
            to: ChannelBuffer::new(channel_count),
            elapsed: 0.0,
            duration: 0.0,
            curve: Curve::Linear,
            state: LayerState::Idle,
            active_id: None,
            deactivating: false,
        }
    }
}

/// One entry of an additive layer's accumulation set
#[derive(Debug, Clone)]
struct BlendEntry {
    id: String,
    values: ChannelBuffer,
    weight: f32,
}

/// Accumulation set for an additive layer
#[derive(Debug, Clone)]
struct AdditiveState {
    /// Insertion-ordered; id lookup is linear, like an effect chain
    entries: Vec<BlendEntry>,
}

/// Per-policy internal state
#[derive(Debug, Clone)]
enum LayerMode {
    Crossfade(CrossfadeState),
    Additive(AdditiveState),
}

/// Per-layer blending engine
///
/// Owns the layer's output buffer and all transition/accumulation state.
/// Buffers are allocated once at construction (from the session channel
/// count) and reused every tick; no operation here allocates on the tick
/// path.
///
/// # Example
/// ```
/// use visage::engine::{ChannelBuffer, Curve, ExclusionPolicy, LayerEngine};
///
/// let mut layer = LayerEngine::new(ExclusionPolicy::ExclusiveCrossfade, 2);
/// let target = ChannelBuffer::from_weights(vec![1.0, 0.0]);
/// layer.set_target_expression("smile", &target, 1.0, Curve::Linear);
/// layer.update_transition(0.5);
/// assert_eq!(layer.output().get(0), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct LayerEngine {
    output: ChannelBuffer,
    mode: LayerMode,
}

impl LayerEngine {
    /// Create a new layer engine for the given policy and channel count
    pub fn new(policy: ExclusionPolicy, channel_count: usize) -> Self {
        let mode = match policy {
            ExclusionPolicy::ExclusiveCrossfade => {
                LayerMode::Crossfade(CrossfadeState::new(channel_count))
            }
            ExclusionPolicy::AdditiveBlend => LayerMode::Additive(AdditiveState {
                entries: Vec::new(),
            }),
        };
        Self {
            output: ChannelBuffer::new(channel_count),
            mode,
        }
    }

    /// Get the exclusion policy this engine was built with
    pub fn policy(&self) -> ExclusionPolicy {
        match &self.mode {
            LayerMode::Crossfade(_) => ExclusionPolicy::ExclusiveCrossfade,
            LayerMode::Additive(_) => ExclusionPolicy::AdditiveBlend,
        }
    }

    /// Get the number of channels this engine was sized for
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.output.len()
    }

    /// Get the layer's current output buffer
    #[inline]
    pub fn output(&self) -> &ChannelBuffer {
        &self.output
    }

    // ========================================================================
    // Exclusive crossfade operations
    // ========================================================================

    /// Start a transition toward a new target expression
    ///
    /// With `duration <= 0` the output jumps to the target immediately.
    /// Otherwise the layer snapshots its *current* output (whether idle,
    /// steady, or mid-transition) as the new crossfade start, which is what
    /// keeps repeated interruptions continuous.
    ///
    /// # Panics
    /// Panics on an additive layer, or if the target buffer length does not
    /// match the session channel count.
    pub fn set_target_expression(
        &mut self,
        id: &str,
        target: &ChannelBuffer,
        duration: f32,
        curve: Curve,
    ) {
        assert_eq!(
            target.len(),
            self.output.len(),
            "target buffer length mismatch: {} != {}",
            target.len(),
            self.output.len()
        );
        let cs = match &mut self.mode {
            LayerMode::Crossfade(cs) => cs,
            LayerMode::Additive(_) => {
                panic!("set_target_expression called on an additive layer")
            }
        };

        if duration <= 0.0 {
            self.output.copy_from(target);
            cs.to.copy_from(target);
            cs.elapsed = 0.0;
            cs.duration = 0.0;
            cs.state = LayerState::Steady;
            log::debug!("layer target {:?} applied instantly", id);
        } else {
            cs.from.copy_from(&self.output);
            cs.to.copy_from(target);
            cs.elapsed = 0.0;
            cs.duration = duration;
            cs.state = LayerState::Transitioning;
            log::debug!("layer target {:?} transitioning over {:.3}s", id, duration);
        }
        cs.curve = curve;
        cs.active_id = Some(id.to_string());
        cs.deactivating = false;
    }

    /// Advance an in-flight transition by `delta_time` seconds
    ///
    /// No-op unless the layer is Transitioning. Negative delta time is
    /// clamped to zero. On completion the output is pinned to the target
    /// exactly, not re-derived from the final curve weight, so no
    /// floating-point residue leaks into the steady value.
    pub fn update_transition(&mut self, delta_time: f32) {
        let cs = match &mut self.mode {
            LayerMode::Crossfade(cs) => cs,
            LayerMode::Additive(_) => return,
        };
        if cs.state != LayerState::Transitioning {
            return;
        }

        cs.elapsed += delta_time.max(0.0);
        let weight = compute_blend_weight(&cs.curve, cs.elapsed, cs.duration);
        resolve::resolve_exclusive_crossfade(&cs.from, &cs.to, weight, &mut self.output);

        if cs.elapsed >= cs.duration {
            cs.elapsed = cs.duration;
            self.output.copy_from(&cs.to);
            if cs.deactivating {
                cs.active_id = None;
                cs.deactivating = false;
                cs.state = LayerState::Idle;
            } else {
                cs.state = LayerState::Steady;
            }
        }
    }

    /// Fade the layer's output toward all-zero
    ///
    /// Uses the same snapshot mechanism as any other interruption, keeping
    /// the current curve. The active id keeps reporting the outgoing
    /// expression until the fade completes, then clears.
    ///
    /// # Panics
    /// Panics on an additive layer.
    pub fn deactivate(&mut self, duration: f32) {
        let cs = match &mut self.mode {
            LayerMode::Crossfade(cs) => cs,
            LayerMode::Additive(_) => panic!("deactivate called on an additive layer"),
        };

        if duration <= 0.0 {
            self.output.fill_zero();
            cs.to.fill_zero();
            cs.elapsed = 0.0;
            cs.duration = 0.0;
            cs.state = LayerState::Idle;
            cs.active_id = None;
            cs.deactivating = false;
        } else {
            cs.from.copy_from(&self.output);
            cs.to.fill_zero();
            cs.elapsed = 0.0;
            cs.duration = duration;
            cs.state = LayerState::Transitioning;
            cs.deactivating = true;
        }
    }

    // ========================================================================
    // Additive blend operations
    // ========================================================================

    /// Add or replace an accumulation entry
    ///
    /// Re-adding an existing id updates that entry in place (keeping its
    /// insertion position). The output is not recomputed here; that happens
    /// in [`LayerEngine::compute_blend_output`].
    ///
    /// # Panics
    /// Panics on an exclusive-crossfade layer, or on a values-buffer length
    /// mismatch.
    pub fn add_blend_expression(&mut self, id: &str, values: &ChannelBuffer, weight: f32) {
        assert_eq!(
            values.len(),
            self.output.len(),
            "blend values length mismatch: {} != {}",
            values.len(),
            self.output.len()
        );
        let entries = match &mut self.mode {
            LayerMode::Additive(state) => &mut state.entries,
            LayerMode::Crossfade(_) => {
                panic!("add_blend_expression called on an exclusive-crossfade layer")
            }
        };

        let weight = clamp01(weight);
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.values.copy_from(values);
            entry.weight = weight;
        } else {
            entries.push(BlendEntry {
                id: id.to_string(),
                values: values.clone(),
                weight,
            });
        }
    }

    /// Remove an accumulation entry by id
    ///
    /// Returns whether an entry was removed. Unknown ids are tolerated;
    /// callers add and remove independently of each other.
    ///
    /// # Panics
    /// Panics on an exclusive-crossfade layer.
    pub fn remove_blend_expression(&mut self, id: &str) -> bool {
        let entries = match &mut self.mode {
            LayerMode::Additive(state) => &mut state.entries,
            LayerMode::Crossfade(_) => {
                panic!("remove_blend_expression called on an exclusive-crossfade layer")
            }
        };

        match entries.iter().position(|e| e.id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => {
                log::debug!("remove_blend_expression: unknown id {:?}", id);
                false
            }
        }
    }

    /// Recompute an additive layer's output from its accumulation set
    ///
    /// Zero-fills the output, then folds every entry in insertion order,
    /// saturating per addition. No-op on crossfade layers.
    pub fn compute_blend_output(&mut self) {
        let entries = match &self.mode {
            LayerMode::Additive(state) => &state.entries,
            LayerMode::Crossfade(_) => return,
        };

        resolve::clear_output(&mut self.output);
        for entry in entries {
            resolve::resolve_additive_blend(&entry.values, entry.weight, &mut self.output);
        }
    }

    /// Advance this layer by one tick, whichever policy it runs
    pub fn advance(&mut self, delta_time: f32) {
        match self.policy() {
            ExclusionPolicy::ExclusiveCrossfade => self.update_transition(delta_time),
            ExclusionPolicy::AdditiveBlend => self.compute_blend_output(),
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Get the observable state of this layer
    ///
    /// Additive layers report Idle while their accumulation set is empty and
    /// Steady otherwise; they are never Transitioning.
    pub fn state(&self) -> LayerState {
        match &self.mode {
            LayerMode::Crossfade(cs) => cs.state,
            LayerMode::Additive(state) => {
                if state.entries.is_empty() {
                    LayerState::Idle
                } else {
                    LayerState::Steady
                }
            }
        }
    }

    /// Get the id of the active expression, if any
    ///
    /// Always `None` for additive layers; their contributions are queried
    /// through the accumulation set instead.
    pub fn active_id(&self) -> Option<&str> {
        match &self.mode {
            LayerMode::Crossfade(cs) => cs.active_id.as_deref(),
            LayerMode::Additive(_) => None,
        }
    }

    /// Check if a crossfade is currently in flight
    pub fn is_transitioning(&self) -> bool {
        self.state() == LayerState::Transitioning
    }

    /// Number of entries in an additive layer's accumulation set (0 for
    /// crossfade layers)
    pub fn blend_expression_count(&self) -> usize {
        match &self.mode {
            LayerMode::Additive(state) => state.entries.len(),
            LayerMode::Crossfade(_) => 0,
        }
    }

    /// Check whether an additive layer currently carries the given id
    pub fn has_blend_expression(&self, id: &str) -> bool {
        match &self.mode {
            LayerMode::Additive(state) => state.entries.iter().any(|e| e.id == id),
            LayerMode::Crossfade(_) => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn buf(values: &[f32]) -> ChannelBuffer {
        ChannelBuffer::from_weights(values.to_vec())
    }

    fn crossfade_layer(channels: usize) -> LayerEngine {
        LayerEngine::new(ExclusionPolicy::ExclusiveCrossfade, channels)
    }

    fn additive_layer(channels: usize) -> LayerEngine {
        LayerEngine::new(ExclusionPolicy::AdditiveBlend, channels)
    }

    // ------------------------------------------------------------------------
    // Crossfade state machine
    // ------------------------------------------------------------------------

    #[test]
    fn test_new_layer_is_idle() {
        let layer = crossfade_layer(3);
        assert_eq!(layer.state(), LayerState::Idle);
        assert!(layer.output().is_zero());
        assert!(layer.active_id().is_none());
        assert!(!layer.is_transitioning());
    }

    #[test]
    fn test_instant_target() {
        let mut layer = crossfade_layer(2);
        let target = buf(&[0.8, 0.3]);

        layer.set_target_expression("smile", &target, 0.0, Curve::Linear);

        assert_eq!(layer.output().as_slice(), target.as_slice());
        assert_eq!(layer.state(), LayerState::Steady);
        assert!(!layer.is_transitioning());
        assert_eq!(layer.active_id(), Some("smile"));
    }

    #[test]
    fn test_negative_duration_is_instant() {
        let mut layer = crossfade_layer(1);
        layer.set_target_expression("x", &buf(&[1.0]), -0.5, Curve::Linear);
        assert_eq!(layer.state(), LayerState::Steady);
        assert_eq!(layer.output().get(0), 1.0);
    }

    #[test]
    fn test_transition_midpoint() {
        let mut layer = crossfade_layer(2);
        layer.set_target_expression("x", &buf(&[1.0, 0.0]), 1.0, Curve::Linear);
        assert!(layer.is_transitioning());

        layer.update_transition(0.5);
        assert_relative_eq!(layer.output().get(0), 0.5);
        assert_relative_eq!(layer.output().get(1), 0.0);
        assert!(layer.is_transitioning());
    }

    #[test]
    fn test_transition_completion_pins_target() {
        let mut layer = crossfade_layer(2);
        let target = buf(&[0.7, 0.2]);
        layer.set_target_expression("x", &target, 1.0, Curve::EaseInOut);

        layer.update_transition(5.0);

        assert_eq!(layer.output().as_slice(), target.as_slice());
        assert_eq!(layer.state(), LayerState::Steady);
        assert_eq!(layer.active_id(), Some("x"));
    }

    #[test]
    fn test_interrupt_chains_from_live_output() {
        // The canonical interrupt walkthrough: 0 -> [1,0] over 1s, interrupt
        // at the midpoint toward [0,1], advance half of the new transition.
        let mut layer = crossfade_layer(2);
        layer.set_target_expression("x1", &buf(&[1.0, 0.0]), 1.0, Curve::Linear);
        layer.update_transition(0.5);
        assert_relative_eq!(layer.output().get(0), 0.5);

        layer.set_target_expression("x2", &buf(&[0.0, 1.0]), 1.0, Curve::Linear);
        assert_eq!(layer.active_id(), Some("x2"));
        layer.update_transition(0.5);

        // Snapshot [0.5, 0] lerped 50% toward [0, 1]
        assert_relative_eq!(layer.output().get(0), 0.25);
        assert_relative_eq!(layer.output().get(1), 0.5);
    }

    #[test]
    fn test_update_is_noop_when_steady() {
        let mut layer = crossfade_layer(1);
        layer.set_target_expression("x", &buf(&[0.6]), 0.0, Curve::Linear);
        layer.update_transition(1.0);
        assert_eq!(layer.output().get(0), 0.6);
        assert_eq!(layer.state(), LayerState::Steady);
    }

    #[test]
    fn test_negative_delta_time_clamps() {
        let mut layer = crossfade_layer(1);
        layer.set_target_expression("x", &buf(&[1.0]), 1.0, Curve::Linear);
        layer.update_transition(0.25);
        let before = layer.output().get(0);
        layer.update_transition(-0.5);
        assert_relative_eq!(layer.output().get(0), before);
        assert!(layer.is_transitioning());
    }

    #[test]
    fn test_deactivate_fades_to_zero() {
        let mut layer = crossfade_layer(2);
        layer.set_target_expression("x", &buf(&[1.0, 0.5]), 0.0, Curve::Linear);

        layer.deactivate(1.0);
        assert!(layer.is_transitioning());
        // Outgoing id still reported mid-fade
        assert_eq!(layer.active_id(), Some("x"));

        layer.update_transition(0.5);
        assert_relative_eq!(layer.output().get(0), 0.5);
        assert_relative_eq!(layer.output().get(1), 0.25);

        layer.update_transition(0.5);
        assert!(layer.output().is_zero());
        assert_eq!(layer.state(), LayerState::Idle);
        assert!(layer.active_id().is_none());
    }

    #[test]
    fn test_deactivate_instant() {
        let mut layer = crossfade_layer(2);
        layer.set_target_expression("x", &buf(&[1.0, 1.0]), 0.0, Curve::Linear);
        layer.deactivate(0.0);
        assert!(layer.output().is_zero());
        assert_eq!(layer.state(), LayerState::Idle);
        assert!(layer.active_id().is_none());
    }

    #[test]
    fn test_retarget_after_deactivate_mid_fade() {
        let mut layer = crossfade_layer(1);
        layer.set_target_expression("x", &buf(&[1.0]), 0.0, Curve::Linear);
        layer.deactivate(1.0);
        layer.update_transition(0.5);
        assert_relative_eq!(layer.output().get(0), 0.5);

        // New target interrupts the fade-out; snapshot is the half-faded value
        layer.set_target_expression("y", &buf(&[1.0]), 1.0, Curve::Linear);
        layer.update_transition(0.5);
        assert_relative_eq!(layer.output().get(0), 0.75);
        assert_eq!(layer.active_id(), Some("y"));
    }

    #[test]
    #[should_panic(expected = "additive layer")]
    fn test_set_target_on_additive_panics() {
        let mut layer = additive_layer(1);
        layer.set_target_expression("x", &buf(&[1.0]), 0.0, Curve::Linear);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn test_target_length_mismatch_panics() {
        let mut layer = crossfade_layer(2);
        layer.set_target_expression("x", &buf(&[1.0]), 0.0, Curve::Linear);
    }

    // ------------------------------------------------------------------------
    // Additive accumulation
    // ------------------------------------------------------------------------

    #[test]
    fn test_additive_accumulates_and_saturates() {
        let mut layer = additive_layer(2);
        layer.add_blend_expression("a", &buf(&[0.5, 0.8]), 1.0);
        layer.add_blend_expression("b", &buf(&[0.5, 0.8]), 1.0);

        layer.compute_blend_output();
        assert_relative_eq!(layer.output().get(0), 1.0);
        assert_relative_eq!(layer.output().get(1), 1.0);
    }

    #[test]
    fn test_additive_weight_scales() {
        let mut layer = additive_layer(1);
        layer.add_blend_expression("a", &buf(&[0.8]), 0.5);
        layer.compute_blend_output();
        assert_relative_eq!(layer.output().get(0), 0.4);
    }

    #[test]
    fn test_additive_readd_replaces_entry() {
        let mut layer = additive_layer(1);
        layer.add_blend_expression("a", &buf(&[0.3]), 1.0);
        layer.add_blend_expression("a", &buf(&[0.6]), 1.0);
        assert_eq!(layer.blend_expression_count(), 1);

        layer.compute_blend_output();
        assert_relative_eq!(layer.output().get(0), 0.6);
    }

    #[test]
    fn test_additive_remove() {
        let mut layer = additive_layer(1);
        layer.add_blend_expression("a", &buf(&[0.5]), 1.0);
        layer.add_blend_expression("b", &buf(&[0.25]), 1.0);

        assert!(layer.remove_blend_expression("a"));
        assert!(!layer.remove_blend_expression("a"));

        layer.compute_blend_output();
        assert_relative_eq!(layer.output().get(0), 0.25);
    }

    #[test]
    fn test_additive_mutation_defers_recompute() {
        let mut layer = additive_layer(1);
        layer.add_blend_expression("a", &buf(&[0.5]), 1.0);
        // Output stays stale until compute_blend_output runs
        assert!(layer.output().is_zero());
        layer.compute_blend_output();
        assert_relative_eq!(layer.output().get(0), 0.5);
    }

    #[test]
    fn test_additive_state_reporting() {
        let mut layer = additive_layer(1);
        assert_eq!(layer.state(), LayerState::Idle);
        assert!(layer.active_id().is_none());

        layer.add_blend_expression("a", &buf(&[0.5]), 1.0);
        assert_eq!(layer.state(), LayerState::Steady);
        assert!(!layer.is_transitioning());
        assert!(layer.has_blend_expression("a"));
    }

    #[test]
    fn test_additive_empty_set_outputs_zero() {
        let mut layer = additive_layer(2);
        layer.add_blend_expression("a", &buf(&[1.0, 1.0]), 1.0);
        layer.compute_blend_output();
        layer.remove_blend_expression("a");
        layer.compute_blend_output();
        assert!(layer.output().is_zero());
    }

    #[test]
    #[should_panic(expected = "exclusive-crossfade layer")]
    fn test_add_blend_on_crossfade_panics() {
        let mut layer = crossfade_layer(1);
        layer.add_blend_expression("a", &buf(&[0.5]), 1.0);
    }

    #[test]
    fn test_advance_dispatches_by_policy() {
        let mut fade = crossfade_layer(1);
        fade.set_target_expression("x", &buf(&[1.0]), 1.0, Curve::Linear);
        fade.advance(0.5);
        assert_relative_eq!(fade.output().get(0), 0.5);

        let mut add = additive_layer(1);
        add.add_blend_expression("a", &buf(&[0.3]), 1.0);
        add.advance(0.5);
        assert_relative_eq!(add.output().get(0), 0.3);
    }
}
