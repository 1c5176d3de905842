//! Exclusion resolution primitives.
//!
//! Pure per-channel combination policies: exclusive crossfade (lerp-replace)
//! and additive accumulation (sum, saturating per call). Plus the snapshot
//! copy used to interrupt a crossfade mid-flight without popping.

use crate::engine::buffer::{clamp01, lerp, ChannelBuffer};

/// Crossfade `from` toward `to` by `weight`, writing into `output`.
///
/// Weight clamps to [0, 1]; each channel clamps after interpolation. Safe on
/// zero-length buffers.
///
/// # Panics
/// Panics if the three buffers differ in length.
pub fn resolve_exclusive_crossfade(
    from: &ChannelBuffer,
    to: &ChannelBuffer,
    weight: f32,
    output: &mut ChannelBuffer,
) {
    assert_eq!(
        from.len(),
        to.len(),
        "crossfade endpoint length mismatch: {} != {}",
        from.len(),
        to.len()
    );
    assert_eq!(
        from.len(),
        output.len(),
        "crossfade output length mismatch: {} != {}",
        from.len(),
        output.len()
    );

    let weight = clamp01(weight);
    let from = from.as_slice();
    let to = to.as_slice();
    for (i, out) in output.as_mut_slice().iter_mut().enumerate() {
        *out = clamp01(lerp(from[i], to[i], weight));
    }
}

/// Crossfade `output` toward `to` in place by `weight`.
///
/// The in-place form of [`resolve_exclusive_crossfade`], used by the
/// cross-layer fold where the running combined buffer is its own `from`.
///
/// # Panics
/// Panics if the buffers differ in length.
pub fn crossfade_in_place(output: &mut ChannelBuffer, to: &ChannelBuffer, weight: f32) {
    assert_eq!(
        output.len(),
        to.len(),
        "crossfade output length mismatch: {} != {}",
        output.len(),
        to.len()
    );

    let weight = clamp01(weight);
    let to = to.as_slice();
    for (i, out) in output.as_mut_slice().iter_mut().enumerate() {
        *out = clamp01(lerp(*out, to[i], weight));
    }
}

/// Accumulate `values * weight` into `output`, saturating per channel.
///
/// This adds on top of whatever `output` already holds; repeated calls
/// accumulate and clamp after each call, so overshoot saturates at 1 instead
/// of the raw sum being clamped once at the end.
///
/// # Panics
/// Panics if the buffers differ in length.
pub fn resolve_additive_blend(values: &ChannelBuffer, weight: f32, output: &mut ChannelBuffer) {
    assert_eq!(
        values.len(),
        output.len(),
        "additive blend length mismatch: {} != {}",
        values.len(),
        output.len()
    );

    let weight = clamp01(weight);
    let values = values.as_slice();
    for (i, out) in output.as_mut_slice().iter_mut().enumerate() {
        *out = clamp01(*out + values[i] * weight);
    }
}

/// Copy the live values of `current` into `snapshot`.
///
/// The snapshot decouples from later mutation of `current`, which is what
/// lets an interrupted transition restart from its live interpolated value.
///
/// # Panics
/// Panics if the buffers differ in length.
pub fn take_snapshot(current: &ChannelBuffer, snapshot: &mut ChannelBuffer) {
    snapshot.copy_from(current);
}

/// Zero-fill a buffer before summing a fresh set of additive contributions.
pub fn clear_output(buffer: &mut ChannelBuffer) {
    buffer.fill_zero();
}
