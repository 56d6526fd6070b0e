//! Per-model playback configuration.

use serde::{Deserialize, Serialize};

/// Playback configuration owned by a [`crate::model::Model`], injected at
/// construction. Replaces the process-wide mutable defaults of earlier
/// designs: nothing here is ambient global state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Tick cadence. `tick` reports `1.0 / frame_rate` back to the host as
    /// the recommended sleep interval.
    pub frame_rate: f32,

    /// Duration used by `transition_to` when the caller passes a
    /// non-positive duration.
    pub default_transition_seconds: f32,

    /// Fade duration used by `set_expression` when the caller does not
    /// supply one.
    pub default_fade_seconds: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            default_transition_seconds: 1.0,
            default_fade_seconds: 1.0,
        }
    }
}
