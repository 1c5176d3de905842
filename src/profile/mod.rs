//! Expression Profiles
//!
//! The serde data model for what collaborators feed the engine: the channel
//! list, layer declarations, and authored expressions with their transition
//! metadata and layer-slot overrides. Profiles load from JSON; the engine
//! itself only ever sees the resolved plain data (dense buffers, curves,
//! durations).

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{
    ChannelBuffer, ChannelMap, Curve, ExclusionPolicy, LayerEngine, LayerSlotOverride, Mixer,
};
use crate::error::{Result, VisageError};

fn default_weight() -> f32 {
    1.0
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Declaration of one blending layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    pub priority: i32,
    pub policy: ExclusionPolicy,
    /// Blend weight used in the cross-layer fold
    #[serde(default = "default_weight")]
    pub weight: f32,
}

/// One authored expression
///
/// Channel values are sparse (name → value); channels an expression does not
/// mention stay at zero in its resolved target buffer. Expressions without
/// an explicit id get a generated UUID so they can still be addressed in an
/// additive accumulation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionDef {
    #[serde(default = "generate_id")]
    pub id: String,
    /// Name of the layer this expression targets
    pub layer: String,
    #[serde(default)]
    pub channels: BTreeMap<String, f32>,
    /// Crossfade duration in seconds; 0 applies instantly
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub curve: Curve,
    /// Contribution weight on additive layers
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub overrides: Vec<LayerSlotOverride>,
}

/// A complete expression profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Channel names in output-slot order; fixed for the session
    pub channels: Vec<String>,
    pub layers: Vec<LayerDef>,
    #[serde(default)]
    pub expressions: Vec<ExpressionDef>,
}

impl Profile {
    /// Parse and validate a profile from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Profile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VisageError::ProfileNotFound {
                    path: path.display().to_string(),
                    source: Some(e),
                }
            } else {
                VisageError::Io(e)
            }
        })?;
        Self::from_json(&contents)
    }

    /// Check profile-internal consistency
    ///
    /// Layer names must be unique, expression ids must be unique, and every
    /// expression must target a declared layer. Channel-name consistency is
    /// deliberately *not* checked here: expressions and overrides referring
    /// to channels the session does not have are tolerated at apply time
    /// (version skew), not rejected at load time.
    pub fn validate(&self) -> Result<()> {
        let mut layer_names = HashSet::new();
        for layer in &self.layers {
            if !layer_names.insert(layer.name.as_str()) {
                return Err(VisageError::InvalidProfile {
                    reason: format!("duplicate layer name: {}", layer.name),
                });
            }
        }

        let mut expression_ids = HashSet::new();
        for expression in &self.expressions {
            if !expression_ids.insert(expression.id.as_str()) {
                return Err(VisageError::InvalidProfile {
                    reason: format!("duplicate expression id: {}", expression.id),
                });
            }
            if !layer_names.contains(expression.layer.as_str()) {
                return Err(VisageError::UnknownLayer {
                    name: expression.layer.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build a live mixer with every declared layer registered
    pub fn build_mixer(&self) -> Result<Mixer> {
        let channels = ChannelMap::new(self.channels.clone())?;
        let channel_count = channels.len();
        let mut mixer = Mixer::new(channels);
        for layer in &self.layers {
            mixer.register_layer(
                &layer.name,
                layer.priority,
                layer.weight,
                LayerEngine::new(layer.policy, channel_count),
            );
        }
        Ok(mixer)
    }

    /// Find an expression by id
    pub fn expression(&self, id: &str) -> Option<&ExpressionDef> {
        self.expressions.iter().find(|e| e.id == id)
    }

    /// Find a layer declaration by name
    pub fn layer(&self, name: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.name == name)
    }
}

impl ExpressionDef {
    /// Densify the sparse channel targets into a session-sized buffer
    ///
    /// Channel names the session does not know are skipped (debug-logged):
    /// a newer profile driving an older session must not crash it.
    pub fn resolve_values(&self, channels: &ChannelMap) -> ChannelBuffer {
        let mut buffer = channels.new_buffer();
        for (name, value) in &self.channels {
            match channels.index_of(name) {
                Some(index) => buffer.set(index, *value),
                None => log::debug!(
                    "expression {:?}: unknown channel {:?} skipped",
                    self.id,
                    name
                ),
            }
        }
        buffer
    }

    /// Activate this expression on its target layer
    ///
    /// Crossfade layers get it as the new transition target; additive layers
    /// get it as an accumulation entry. The mixer's active override list is
    /// replaced wholesale with this expression's overrides (cleared if it
    /// has none), since overrides follow the active expression.
    pub fn apply_to(&self, mixer: &mut Mixer) -> Result<()> {
        let values = self.resolve_values(mixer.channels());
        let engine = mixer
            .layer_mut(&self.layer)
            .ok_or_else(|| VisageError::UnknownLayer {
                name: self.layer.clone(),
            })?;

        match engine.policy() {
            ExclusionPolicy::ExclusiveCrossfade => {
                engine.set_target_expression(&self.id, &values, self.duration, self.curve.clone());
            }
            ExclusionPolicy::AdditiveBlend => {
                engine.add_blend_expression(&self.id, &values, self.weight);
            }
        }

        mixer.set_active_layer_slots(self.overrides.clone());
        Ok(())
    }

    /// Retire this expression from its target layer
    ///
    /// Crossfade layers fade back to neutral over this expression's own
    /// duration; additive layers drop the accumulation entry. Any active
    /// overrides are cleared.
    pub fn remove_from(&self, mixer: &mut Mixer) -> Result<()> {
        let engine = mixer
            .layer_mut(&self.layer)
            .ok_or_else(|| VisageError::UnknownLayer {
                name: self.layer.clone(),
            })?;

        match engine.policy() {
            ExclusionPolicy::ExclusiveCrossfade => engine.deactivate(self.duration),
            ExclusionPolicy::AdditiveBlend => {
                engine.remove_blend_expression(&self.id);
            }
        }

        mixer.clear_active_layer_slots();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
