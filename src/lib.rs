//! rig-motion-core
//!
//! Motion scheduling and curve evaluation for parametrized 2D rigs. The
//! crate drives a set of named numeric parameters over time from time-keyed
//! clips and facial expressions: an exclusive FIFO lane with a single
//! playhead, concurrently looping inclusive layers with randomized
//! re-trigger delays, a cross-fading expression layer, and a persistence
//! store that keeps finished clips from snapping the rig back to its rest
//! pose. Transition and fade clips are synthesized on the fly from the rig's
//! current pose.
//!
//! Asset parsing, file discovery, and the rendering surface itself are the
//! host's responsibility: the loader hands a [`Model`] already-parsed clip
//! and expression tables, and the scheduler writes into a [`RenderTarget`]
//! once per [`Model::tick`]. The engine is single-threaded, cooperative, and
//! tick-driven; it performs no blocking operations.

pub mod clip;
pub mod config;
pub mod error;
pub mod exclusive;
pub mod expression;
pub mod expression_layer;
pub mod inclusive;
pub mod model;
pub mod sampling;
pub mod target;

// Re-export common types for convenience
pub use clip::{Clip, ControlPoint, Curve, CurveTarget, Segment};
pub use config::ModelConfig;
pub use error::MotionError;
pub use exclusive::{ActionState, ExclusiveLane, QueueEntry};
pub use expression::{BlendMode, Expression, ExpressionDirective};
pub use expression_layer::{ExpressionLayer, FadeState, PendingExpression};
pub use inclusive::{InclusiveEntry, InclusiveSet};
pub use model::{ActiveSet, Model, ParamKey, TransitionKind};
pub use sampling::{evaluate_clip, sample_curve, CurveSample};
pub use target::{BlendOp, RenderTarget};

/// Motion scheduler result type
pub type Result<T> = std::result::Result<T, MotionError>;
