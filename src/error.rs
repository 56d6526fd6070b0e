//! Error types for the motion scheduler.

use serde::{Deserialize, Serialize};

/// Error type covering curve evaluation and scheduler misuse.
///
/// Lookup and validation failures are raised synchronously to the caller of
/// the violated operation; the only silent failsafes in the crate are the
/// time clamps documented on [`crate::sampling::evaluate_clip`] and the
/// inclusive-layer window arithmetic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MotionError {
    /// A call parameter had the wrong shape or range
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Clip name not present in the model's clip table
    #[error("No clip named '{name}' associated with model '{model}'")]
    UnknownClip { model: String, name: String },

    /// Expression name not present in the model's expression table
    #[error("No expression named '{name}' associated with model '{model}'")]
    UnknownExpression { model: String, name: String },

    /// Stepped / inverse-stepped curve segments cannot be evaluated
    #[error("Unsupported segment kind: {kind}")]
    UnsupportedSegmentKind { kind: String },

    /// Inconsistent or degenerate curve segment run
    #[error("Malformed curve: {reason}")]
    MalformedCurve { reason: String },

    /// Expression directive blend is neither Add nor Overwrite
    #[error("Expression blend must be \"Add\" or \"Overwrite\", got \"{found}\"")]
    InvalidBlendMode { found: String },
}

impl MotionError {
    /// Get error category for logging/metrics
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "validation",
            Self::UnknownClip { .. } | Self::UnknownExpression { .. } => "lookup",
            Self::UnsupportedSegmentKind { .. } | Self::MalformedCurve { .. } => "curve",
            Self::InvalidBlendMode { .. } => "expression",
        }
    }

    /// Whether the error indicates malformed authored data rather than caller
    /// misuse. Authored-data errors should reach the embedding application's
    /// error channel; caller errors are fixable at the call site.
    #[inline]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSegmentKind { .. }
                | Self::MalformedCurve { .. }
                | Self::InvalidBlendMode { .. }
        )
    }
}
