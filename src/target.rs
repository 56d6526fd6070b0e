//! The externally owned render target the scheduler writes into every tick.

use serde::{Deserialize, Serialize};

/// How a written value combines with the target's current one.
///
/// The engine only ever issues [`BlendOp::Overwrite`]; expression `Add`
/// blending is resolved against the persistent expression map before the
/// call reaches the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendOp {
    Overwrite,
    Add,
}

/// Interface to the host rendering surface. Assumed synchronous and
/// non-blocking from the engine's perspective.
pub trait RenderTarget {
    /// Write a model parameter value.
    fn blend_parameter(&mut self, id: &str, op: BlendOp, value: f32);

    /// Write a part opacity value.
    fn blend_opacity(&mut self, id: &str, op: BlendOp, value: f32);

    /// Read-only default for a parameter, consulted lazily the first time an
    /// expression touches it.
    fn parameter_default(&self, id: &str) -> f32;
}
