//! Cross-layer blending and layer-slot overrides.
//!
//! The blender merges every layer's output into one combined buffer with a
//! single fold: ascending priority order, each layer lerped in by its own
//! weight. There is no special case for the first layer. It lerps in from
//! zero, so a lowest-priority layer with weight below 1 is itself attenuated
//! toward zero, and a top layer at weight 1 fully replaces everything under
//! it. Overrides then punch named-channel values straight into the combined
//! result, bypassing priority order.

use serde::{Deserialize, Serialize};

use crate::engine::buffer::{ChannelBuffer, ChannelMap};
use crate::engine::resolve::crossfade_in_place;

/// One named-channel replacement inside a layer-slot override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelOverride {
    pub channel: String,
    pub value: f32,
}

/// Replace-in-place overrides sourced from an active expression
///
/// `target_layer` records which layer the authoring expression aimed at; it
/// is carried for round-tripping but application goes by channel name into
/// the combined buffer, independent of layer priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSlotOverride {
    pub target_layer: String,
    pub overrides: Vec<ChannelOverride>,
}

/// Fold layer outputs into the combined buffer.
///
/// `layers` must already be in ascending priority order (the mixer owns the
/// ordering); each item is the layer's blend weight and its output buffer.
/// The combined buffer is zeroed first, so with no layers the result is the
/// neutral face.
///
/// # Panics
/// Panics if any layer buffer length differs from the combined buffer.
pub fn blend_layers<'a>(
    layers: impl IntoIterator<Item = (f32, &'a ChannelBuffer)>,
    combined: &mut ChannelBuffer,
) {
    combined.fill_zero();
    for (weight, output) in layers {
        crossfade_in_place(combined, output, weight);
    }
}

/// Apply layer-slot overrides to the combined buffer.
///
/// Overrides apply in list order, later entries winning on conflicting
/// channel names. Values replace (not blend) and clamp to [0, 1]. Unknown
/// channel names skip silently: profiles and sessions may disagree on the
/// channel set across versions, and a live session must keep ticking.
pub fn apply_overrides(
    channels: &ChannelMap,
    overrides: &[LayerSlotOverride],
    combined: &mut ChannelBuffer,
) {
    for slot in overrides {
        for entry in &slot.overrides {
            match channels.index_of(&entry.channel) {
                Some(index) => combined.set(index, entry.value),
                None => log::debug!("override skipped, unknown channel {:?}", entry.channel),
            }
        }
    }
}
