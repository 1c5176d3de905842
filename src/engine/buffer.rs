//! Channel Buffer Management
//!
//! Provides the core weight buffer type and the session channel map.
//! Each output channel holds one normalized weight in [0, 1]. Buffer length
//! is fixed when a blending session starts (from the channel-name list) and
//! never changes for the lifetime of the session.

use std::collections::HashMap;

use crate::error::{Result, VisageError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Clamp a weight to the normalized [0, 1] range
///
/// # Arguments
/// * `value` - Raw weight value
///
/// # Returns
/// The value clamped to [0, 1]
#[inline]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Linear interpolation between two weights
///
/// # Arguments
/// * `a` - Start value (returned at `t == 0`)
/// * `b` - End value (returned at `t == 1`)
/// * `t` - Interpolation factor
///
/// # Returns
/// The interpolated value
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ============================================================================
// Channel Buffer
// ============================================================================

/// Fixed-length buffer of normalized channel weights
///
/// One slot per named output channel, in channel-map order. All writes going
/// through [`ChannelBuffer::set`] clamp to [0, 1], so a published buffer
/// never carries an out-of-range weight.
///
/// # Example
/// ```
/// use visage::engine::ChannelBuffer;
///
/// let mut buffer = ChannelBuffer::new(3);
/// assert_eq!(buffer.len(), 3);
/// buffer.set(1, 0.75);
/// assert_eq!(buffer.get(1), 0.75);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    weights: Vec<f32>,
}

impl ChannelBuffer {
    /// Create a new buffer with the specified channel count
    ///
    /// All weights are initialized to 0.0 (neutral face).
    ///
    /// # Arguments
    /// * `channel_count` - Number of output channels
    pub fn new(channel_count: usize) -> Self {
        Self {
            weights: vec![0.0; channel_count],
        }
    }

    /// Create a buffer from raw weight values
    ///
    /// Each value is clamped to [0, 1] on the way in.
    pub fn from_weights(weights: Vec<f32>) -> Self {
        Self {
            weights: weights.into_iter().map(clamp01).collect(),
        }
    }

    /// Get the number of channels
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Check if the buffer has zero channels
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Get the weight at the specified channel index
    ///
    /// # Panics
    /// Panics if the index is out of bounds
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.weights[index]
    }

    /// Set the weight at the specified channel index, clamped to [0, 1]
    ///
    /// # Panics
    /// Panics if the index is out of bounds
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        self.weights[index] = clamp01(value);
    }

    /// Get read access to all weights
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    /// Mutable access for the resolver functions
    ///
    /// Crate-private: all public writes go through [`ChannelBuffer::set`] so
    /// the [0, 1] invariant holds on every published buffer.
    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    /// Reset every channel to 0.0
    pub fn fill_zero(&mut self) {
        self.weights.fill(0.0);
    }

    /// Copy all weights from another buffer of the same length
    ///
    /// # Panics
    /// Panics if the buffer lengths differ; a session that mixes buffer
    /// lengths was built inconsistently and must not keep ticking.
    pub fn copy_from(&mut self, other: &ChannelBuffer) {
        assert_eq!(
            self.len(),
            other.len(),
            "channel buffer length mismatch: {} != {}",
            self.len(),
            other.len()
        );
        self.weights.copy_from_slice(&other.weights);
    }

    /// Check if every channel is at 0.0
    pub fn is_zero(&self) -> bool {
        self.weights.iter().all(|&w| w == 0.0)
    }
}

// ============================================================================
// Channel Map
// ============================================================================

/// The session's ordered channel-name list with hashed name lookup
///
/// Built once when a blending session starts; the position of each name
/// defines the buffer slot for that channel. Lookups by name are used by the
/// override applicator and by sparse expression resolution.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ChannelMap {
    /// Build a channel map from an ordered name list
    ///
    /// # Arguments
    /// * `names` - Channel names in output-slot order
    ///
    /// # Returns
    /// The map, or [`VisageError::DuplicateChannel`] if a name repeats;
    /// duplicate slots would make name-based writes ambiguous.
    pub fn new(names: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(VisageError::DuplicateChannel { name: name.clone() });
            }
        }
        Ok(Self { names, index })
    }

    /// Get the number of channels
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the session has zero channels
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up a channel's buffer slot by name
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Get the channel name at a buffer slot
    ///
    /// # Panics
    /// Panics if the index is out of bounds
    #[inline]
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Get all channel names in slot order
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Allocate a zeroed buffer sized for this session
    pub fn new_buffer(&self) -> ChannelBuffer {
        ChannelBuffer::new(self.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_map(names: &[&str]) -> ChannelMap {
        ChannelMap::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.0), 0.0);
        assert_eq!(clamp01(0.5), 0.5);
        assert_eq!(clamp01(1.0), 1.0);
        assert_eq!(clamp01(1.5), 1.0);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 1.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 1.0, 1.0), 1.0);
        assert_eq!(lerp(0.0, 1.0, 0.5), 0.5);
        assert_eq!(lerp(0.2, 0.6, 0.5), 0.4);
    }

    #[test]
    fn test_buffer_new_zeroed() {
        let buffer = ChannelBuffer::new(4);
        assert_eq!(buffer.len(), 4);
        assert!(buffer.is_zero());
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_buffer_from_weights_clamps() {
        let buffer = ChannelBuffer::from_weights(vec![-1.0, 0.5, 2.0]);
        assert_eq!(buffer.as_slice(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_buffer_set_clamps() {
        let mut buffer = ChannelBuffer::new(2);
        buffer.set(0, 1.5);
        buffer.set(1, -0.25);
        assert_eq!(buffer.get(0), 1.0);
        assert_eq!(buffer.get(1), 0.0);
    }

    #[test]
    fn test_buffer_copy_from() {
        let source = ChannelBuffer::from_weights(vec![0.1, 0.2, 0.3]);
        let mut dest = ChannelBuffer::new(3);
        dest.copy_from(&source);
        assert_eq!(dest.as_slice(), source.as_slice());
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn test_buffer_copy_from_mismatch_panics() {
        let source = ChannelBuffer::new(3);
        let mut dest = ChannelBuffer::new(2);
        dest.copy_from(&source);
    }

    #[test]
    fn test_buffer_zero_length() {
        let mut buffer = ChannelBuffer::new(0);
        assert!(buffer.is_empty());
        assert!(buffer.is_zero());
        buffer.fill_zero();
        let other = ChannelBuffer::new(0);
        buffer.copy_from(&other);
    }

    #[test]
    fn test_channel_map_lookup() {
        let map = make_map(&["browInnerUp", "eyeBlinkLeft", "jawOpen"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.index_of("eyeBlinkLeft"), Some(1));
        assert_eq!(map.index_of("mouthSmile"), None);
        assert_eq!(map.name(2), "jawOpen");
    }

    #[test]
    fn test_channel_map_duplicate_rejected() {
        let result = ChannelMap::new(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert!(matches!(
            result,
            Err(VisageError::DuplicateChannel { name }) if name == "a"
        ));
    }

    #[test]
    fn test_channel_map_new_buffer() {
        let map = make_map(&["a", "b"]);
        let buffer = map.new_buffer();
        assert_eq!(buffer.len(), 2);
        assert!(buffer.is_zero());
    }
}
