//! Expression Blending Engine
//!
//! The per-tick core: curve evaluation, exclusion resolution, per-layer
//! transition state machines, cross-layer blending, overrides, and the
//! frame mixer that orchestrates them.

pub mod blend;
pub mod buffer;
pub mod curve;
pub mod layer;
pub mod mixer;
pub mod resolve;

pub use blend::{apply_overrides, blend_layers, ChannelOverride, LayerSlotOverride};
pub use buffer::{clamp01, lerp, ChannelBuffer, ChannelMap};
pub use curve::{compute_blend_weight, compute_progress, Curve, CurveKeyframe};
pub use layer::{ExclusionPolicy, LayerEngine, LayerState};
pub use mixer::{LayerStatus, Mixer};
pub use resolve::{
    clear_output, crossfade_in_place, resolve_additive_blend, resolve_exclusive_crossfade,
    take_snapshot,
};
