//! Expressions: named target poses applied independently of the motion lanes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// How an expression directive combines with the parameter's current resting
/// value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    /// Add the directive value to the resting value.
    Add,
    /// Replace the resting value outright.
    Overwrite,
}

impl FromStr for BlendMode {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Add" => Ok(Self::Add),
            "Overwrite" => Ok(Self::Overwrite),
            other => Err(MotionError::InvalidBlendMode {
                found: other.to_string(),
            }),
        }
    }
}

/// One parameter directive of an expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDirective {
    pub id: String,
    pub value: f32,
    pub blend: BlendMode,
}

/// A named target pose. Immutable after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Unique within a model's expression table.
    pub name: String,
    pub directives: Vec<ExpressionDirective>,
}

impl Expression {
    #[inline]
    pub fn new(name: impl Into<String>, directives: Vec<ExpressionDirective>) -> Self {
        Self {
            name: name.into(),
            directives,
        }
    }
}
