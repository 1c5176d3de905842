//! Frame Mixer
//!
//! The top-level per-tick orchestrator. Owns every registered layer engine,
//! the session channel map, the active override list, and the published
//! combined output buffer. One `prepare_frame` call per animation tick
//! advances all in-flight transitions, folds the layer outputs by priority,
//! applies overrides, and leaves the result ready to read.
//!
//! All buffers are sized once from the channel count. The blend order index
//! is rebuilt only when registration changes, so the tick path allocates
//! nothing.

use crate::engine::blend::{self, LayerSlotOverride};
use crate::engine::buffer::{clamp01, ChannelBuffer, ChannelMap};
use crate::engine::layer::{ExclusionPolicy, LayerEngine, LayerState};

/// One registered layer: declaration plus its engine
#[derive(Debug)]
struct LayerSlot {
    name: String,
    priority: i32,
    weight: f32,
    engine: LayerEngine,
}

/// Diagnostic snapshot of one registered layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStatus {
    pub name: String,
    pub priority: i32,
    pub weight: f32,
    pub policy: ExclusionPolicy,
    pub state: LayerState,
    pub active_id: Option<String>,
    pub is_transitioning: bool,
}

/// Per-tick blending orchestrator
///
/// # Example
/// ```
/// use visage::engine::{
///     ChannelBuffer, ChannelMap, Curve, ExclusionPolicy, LayerEngine, Mixer,
/// };
///
/// let channels = ChannelMap::new(vec!["jawOpen".into(), "mouthSmile".into()]).unwrap();
/// let mut mixer = Mixer::new(channels);
/// mixer.register_layer(
///     "emotion",
///     0,
///     1.0,
///     LayerEngine::new(ExclusionPolicy::ExclusiveCrossfade, 2),
/// );
///
/// let target = ChannelBuffer::from_weights(vec![0.0, 1.0]);
/// mixer
///     .layer_mut("emotion")
///     .unwrap()
///     .set_target_expression("smile", &target, 0.0, Curve::Linear);
/// mixer.prepare_frame(1.0 / 60.0);
/// assert_eq!(mixer.output().get(1), 1.0);
/// ```
#[derive(Debug)]
pub struct Mixer {
    channels: ChannelMap,
    /// Registration order; blend order is derived from it
    slots: Vec<LayerSlot>,
    /// Slot indices in ascending (priority, registration) order
    order: Vec<usize>,
    order_dirty: bool,
    overrides: Vec<LayerSlotOverride>,
    combined: ChannelBuffer,
}

impl Mixer {
    /// Create a mixer for a fixed channel map
    ///
    /// The channel count is locked in here; every registered engine must
    /// match it. Reconfiguring the channel set means building a new mixer.
    pub fn new(channels: ChannelMap) -> Self {
        let combined = channels.new_buffer();
        Self {
            channels,
            slots: Vec::new(),
            order: Vec::new(),
            order_dirty: false,
            overrides: Vec::new(),
            combined,
        }
    }

    /// Get the session channel map
    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    // ========================================================================
    // Layer registration
    // ========================================================================

    /// Register a layer engine under a name and priority
    ///
    /// Re-registering an existing name replaces its slot wholesale and moves
    /// it to the end of registration order, so it wins priority ties against
    /// earlier registrations. Ordering is refreshed lazily before the next
    /// blend.
    ///
    /// # Panics
    /// Panics if the engine's channel count does not match the session's.
    pub fn register_layer(
        &mut self,
        name: &str,
        priority: i32,
        initial_weight: f32,
        engine: LayerEngine,
    ) {
        assert_eq!(
            engine.channel_count(),
            self.channels.len(),
            "layer engine channel count mismatch: {} != {}",
            engine.channel_count(),
            self.channels.len()
        );

        if let Some(index) = self.slot_index(name) {
            log::debug!("re-registering layer {:?}", name);
            self.slots.remove(index);
        }
        self.slots.push(LayerSlot {
            name: name.to_string(),
            priority,
            weight: clamp01(initial_weight),
            engine,
        });
        self.order_dirty = true;
    }

    /// Remove a layer by name
    ///
    /// Returns whether a layer was removed. Unknown names are tolerated.
    pub fn unregister_layer(&mut self, name: &str) -> bool {
        match self.slot_index(name) {
            Some(index) => {
                self.slots.remove(index);
                self.order_dirty = true;
                true
            }
            None => {
                log::debug!("unregister_layer: unknown layer {:?}", name);
                false
            }
        }
    }

    /// Set the blend weight used for a layer in the cross-layer fold
    ///
    /// Unknown names are a tolerated no-op: layers register and unregister
    /// independently of the call sites that push weights.
    pub fn set_layer_weight(&mut self, name: &str, weight: f32) {
        match self.slot_index(name) {
            Some(index) => self.slots[index].weight = clamp01(weight),
            None => log::debug!("set_layer_weight: unknown layer {:?}", name),
        }
    }

    /// Borrow a registered layer engine
    pub fn layer(&self, name: &str) -> Option<&LayerEngine> {
        self.slot_index(name).map(|i| &self.slots[i].engine)
    }

    /// Mutably borrow a registered layer engine
    ///
    /// This is how callers drive expressions: set crossfade targets, add or
    /// remove additive contributions, deactivate.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut LayerEngine> {
        self.slot_index(name).map(|i| &mut self.slots[i].engine)
    }

    /// Number of registered layers
    pub fn layer_count(&self) -> usize {
        self.slots.len()
    }

    fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    /// Replace the active override list wholesale
    pub fn set_active_layer_slots(&mut self, overrides: Vec<LayerSlotOverride>) {
        self.overrides = overrides;
    }

    /// Drop all active overrides
    pub fn clear_active_layer_slots(&mut self) {
        self.overrides.clear();
    }

    /// Get the active override list
    pub fn active_layer_slots(&self) -> &[LayerSlotOverride] {
        &self.overrides
    }

    // ========================================================================
    // Per-tick orchestration
    // ========================================================================

    /// Advance the whole session by one tick
    ///
    /// Advances every layer engine (crossfade transitions or additive
    /// recomputation), then publishes a fresh combined output.
    pub fn prepare_frame(&mut self, delta_time: f32) {
        for slot in &mut self.slots {
            slot.engine.advance(delta_time);
        }
        self.compute_output();
    }

    /// Recompute the combined output from current layer state
    ///
    /// Idempotent: calling twice with no intervening state change produces
    /// an identical buffer.
    pub fn compute_output(&mut self) {
        self.refresh_order();

        let slots = &self.slots;
        let order = &self.order;
        blend::blend_layers(
            order.iter().map(|&i| {
                let slot = &slots[i];
                (slot.weight, slot.engine.output())
            }),
            &mut self.combined,
        );
        blend::apply_overrides(&self.channels, &self.overrides, &mut self.combined);
    }

    fn refresh_order(&mut self) {
        if !self.order_dirty {
            return;
        }
        self.order.clear();
        self.order.extend(0..self.slots.len());
        // Stable sort: priority ties keep registration order, so the later
        // registration lands later in the fold and wins.
        let slots = &self.slots;
        self.order.sort_by_key(|&i| slots[i].priority);
        self.order_dirty = false;
    }

    // ========================================================================
    // Published output & diagnostics
    // ========================================================================

    /// Get the published combined output buffer
    pub fn output(&self) -> &ChannelBuffer {
        &self.combined
    }

    /// Look up one published channel value by name
    pub fn channel_value(&self, name: &str) -> Option<f32> {
        self.channels.index_of(name).map(|i| self.combined.get(i))
    }

    /// Snapshot per-layer diagnostic state, in registration order
    pub fn layer_states(&self) -> Vec<LayerStatus> {
        self.slots
            .iter()
            .map(|slot| LayerStatus {
                name: slot.name.clone(),
                priority: slot.priority,
                weight: slot.weight,
                policy: slot.engine.policy(),
                state: slot.engine.state(),
                active_id: slot.engine.active_id().map(str::to_string),
                is_transitioning: slot.engine.is_transitioning(),
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
