//! Transition Curves
//!
//! Maps normalized transition time to normalized blend progress. The four
//! builtin shapes cover the common cases; `Custom` carries an authored
//! keyframe sequence evaluated with a cubic Hermite spline, so profiles can
//! ship arbitrary easing.

use serde::{Deserialize, Serialize};

use crate::engine::buffer::clamp01;

/// One keyframe of a custom transition curve
///
/// Tangents are expressed in value-per-normalized-time and get scaled by the
/// time span of the segment they act on during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKeyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl CurveKeyframe {
    /// Create a keyframe with explicit tangents
    pub fn new(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }

    /// Create a keyframe with flat tangents
    pub fn flat(time: f32, value: f32) -> Self {
        Self::new(time, value, 0.0, 0.0)
    }
}

/// Shape of a transition curve
///
/// All builtin shapes are monotonically non-decreasing on [0, 1] and hit 0
/// at `t == 0` and 1 at `t == 1`. A `Custom` curve with a single keyframe is
/// constant; with no keyframes it falls back to `Linear`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Curve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Custom(Vec<CurveKeyframe>),
}

impl Curve {
    /// Build a custom curve, sorting keyframes by time
    ///
    /// Out-of-order input is tolerated (sorted, not rejected) since keyframes
    /// arrive from authoring tools that do not guarantee ordering.
    pub fn custom(mut keyframes: Vec<CurveKeyframe>) -> Self {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Curve::Custom(keyframes)
    }

    /// Evaluate the curve at normalized time `t`
    ///
    /// `t` is clamped to [0, 1] before evaluation.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = clamp01(t);
        match self {
            Curve::Linear => t,
            Curve::EaseIn => t * t,
            Curve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Curve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - 2.0 * (1.0 - t) * (1.0 - t)
                }
            }
            Curve::Custom(keyframes) => evaluate_keyframes(keyframes, t),
        }
    }
}

/// Evaluate a keyframe sequence at time `t`
///
/// Empty sequence: linear fallback. Single keyframe: constant. Otherwise `t`
/// clamps to the keyframe time range and the bracketing segment interpolates
/// with a cubic Hermite spline.
fn evaluate_keyframes(keyframes: &[CurveKeyframe], t: f32) -> f32 {
    match keyframes.len() {
        0 => return t,
        1 => return keyframes[0].value,
        _ => {}
    }

    let first = &keyframes[0];
    let last = &keyframes[keyframes.len() - 1];

    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }

    for window in keyframes.windows(2) {
        let (k0, k1) = (&window[0], &window[1]);
        if t >= k0.time && t < k1.time {
            return hermite(k0, k1, t);
        }
    }

    // Unreachable with sorted keyframes; keep the boundary value regardless.
    last.value
}

/// Cubic Hermite interpolation within one segment
///
/// Tangents are scaled by the segment's time span; a zero-span segment steps
/// to the later keyframe's value.
fn hermite(k0: &CurveKeyframe, k1: &CurveKeyframe, t: f32) -> f32 {
    let span = k1.time - k0.time;
    if span <= f32::EPSILON {
        return k1.value;
    }

    let u = (t - k0.time) / span;
    let m0 = k0.out_tangent * span;
    let m1 = k1.in_tangent * span;

    let u2 = u * u;
    let u3 = u2 * u;

    (2.0 * u3 - 3.0 * u2 + 1.0) * k0.value
        + (u3 - 2.0 * u2 + u) * m0
        + (-2.0 * u3 + 3.0 * u2) * k1.value
        + (u3 - u2) * m1
}

/// Compute normalized transition progress
///
/// A non-positive duration means an instantaneous transition: progress is
/// complete immediately. Elapsed time outside [0, duration] clamps rather
/// than erroring, since it arrives from upstream timing that may carry
/// floating-point noise.
pub fn compute_progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    clamp01(elapsed / duration)
}

/// Compute the blend weight for a transition at the given elapsed time
pub fn compute_blend_weight(curve: &Curve, elapsed: f32, duration: f32) -> f32 {
    curve.evaluate(compute_progress(elapsed, duration))
}

// ============================================================================
// Tests
// ============================================================================
