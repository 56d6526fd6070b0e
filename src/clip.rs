//! Clip data model: named fixed-duration sets of per-parameter curves.

use serde::{Deserialize, Serialize};

use crate::error::MotionError;
use crate::Result;

/// Which slot of the rig a curve writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveTarget {
    /// Whole-model opacity. Persisted for transition synthesis but not
    /// forwarded to the render target (the host exposes no channel for it).
    ModelOpacity,
    /// A named model parameter.
    Parameter,
    /// A named part's opacity.
    PartOpacity,
}

/// A single `(time, value)` control point on a curve. Times are seconds
/// relative to the clip start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub time: f32,
    pub value: f32,
}

impl ControlPoint {
    #[inline]
    pub fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// One curve segment. The start point is implicit: the previous segment's
/// end point, or the curve header for the first segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Linear {
        end: ControlPoint,
    },
    /// Cubic Bézier on the value axis with two interior control points.
    Bezier {
        c1: ControlPoint,
        c2: ControlPoint,
        end: ControlPoint,
    },
    /// Present in authored data but not evaluable; rejected during sampling.
    Stepped {
        end: ControlPoint,
    },
    InverseStepped {
        end: ControlPoint,
    },
}

impl Segment {
    /// The segment's end point, which is also the next segment's start.
    #[inline]
    pub fn end(&self) -> ControlPoint {
        match self {
            Self::Linear { end }
            | Self::Bezier { end, .. }
            | Self::Stepped { end }
            | Self::InverseStepped { end } => *end,
        }
    }
}

/// One parameter's value trajectory across a clip, expressed as a run of
/// typed segments over a monotonically increasing time axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub target: CurveTarget,
    /// Parameter identifier; unique per curve within a clip for a given
    /// target, though duplicates are tolerated (last write wins).
    pub id: String,
    /// First control point of the run.
    pub start: ControlPoint,
    pub segments: Vec<Segment>,
}

impl Curve {
    #[inline]
    pub fn new(
        target: CurveTarget,
        id: impl Into<String>,
        start: ControlPoint,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            target,
            id: id.into(),
            start,
            segments,
        }
    }

    /// Parse the flat segment-run encoding used by authored motion data and
    /// by transition/fade synthesis: two header values for the first control
    /// point, then tag-prefixed runs.
    ///
    /// Tag `0` is a linear segment (end point, 3 slots), tag `1` a cubic
    /// Bézier (two interior points plus end point, 7 slots), tags `2`/`3`
    /// stepped / inverse-stepped (3 slots; these parse but fail at
    /// evaluation). Any other tag is a [`MotionError::MalformedCurve`].
    pub fn from_flat_run(target: CurveTarget, id: impl Into<String>, run: &[f32]) -> Result<Self> {
        let id = id.into();
        if run.len() < 2 {
            return Err(MotionError::MalformedCurve {
                reason: format!("curve '{id}': segment run shorter than its header"),
            });
        }
        let start = ControlPoint::new(run[0], run[1]);
        let mut segments = Vec::new();
        let mut i = 2;
        while i < run.len() {
            let tag = run[i];
            let (segment, width) = if tag == 0.0 {
                let end = Self::point_at(&id, run, i + 1)?;
                (Segment::Linear { end }, 3)
            } else if tag == 1.0 {
                let c1 = Self::point_at(&id, run, i + 1)?;
                let c2 = Self::point_at(&id, run, i + 3)?;
                let end = Self::point_at(&id, run, i + 5)?;
                (Segment::Bezier { c1, c2, end }, 7)
            } else if tag == 2.0 {
                let end = Self::point_at(&id, run, i + 1)?;
                (Segment::Stepped { end }, 3)
            } else if tag == 3.0 {
                let end = Self::point_at(&id, run, i + 1)?;
                (Segment::InverseStepped { end }, 3)
            } else {
                return Err(MotionError::MalformedCurve {
                    reason: format!("curve '{id}': unknown segment tag {tag}"),
                });
            };
            segments.push(segment);
            i += width;
        }
        Ok(Self {
            target,
            id,
            start,
            segments,
        })
    }

    fn point_at(id: &str, run: &[f32], at: usize) -> Result<ControlPoint> {
        if at + 1 >= run.len() {
            return Err(MotionError::MalformedCurve {
                reason: format!("curve '{id}': truncated segment run"),
            });
        }
        Ok(ControlPoint::new(run[at], run[at + 1]))
    }
}

/// A named, fixed-duration set of per-parameter curves. Immutable after
/// construction; synthetic transition/fade clips are built at runtime and
/// live in the same clip table as authored ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique within a model's clip table.
    pub name: String,
    /// Seconds, >= 0.
    pub duration: f32,
    pub curves: Vec<Curve>,
}

impl Clip {
    #[inline]
    pub fn new(name: impl Into<String>, duration: f32, curves: Vec<Curve>) -> Self {
        Self {
            name: name.into(),
            duration,
            curves,
        }
    }

    /// Validate authored invariants: finite non-negative duration, at least
    /// one segment per curve, a strictly increasing time axis, finite
    /// control values, and every curve reaching the clip duration.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(MotionError::InvalidArgument {
                reason: format!("clip '{}': duration must be finite and >= 0", self.name),
            });
        }
        for curve in &self.curves {
            if curve.segments.is_empty() {
                return Err(MotionError::MalformedCurve {
                    reason: format!("curve '{}' has no segments", curve.id),
                });
            }
            if !curve.start.time.is_finite() || !curve.start.value.is_finite() {
                return Err(MotionError::MalformedCurve {
                    reason: format!("curve '{}': non-finite control point", curve.id),
                });
            }
            let mut last = curve.start.time;
            for segment in &curve.segments {
                let end = segment.end();
                if !end.time.is_finite() || !end.value.is_finite() {
                    return Err(MotionError::MalformedCurve {
                        reason: format!("curve '{}': non-finite control point", curve.id),
                    });
                }
                if end.time <= last {
                    return Err(MotionError::MalformedCurve {
                        reason: format!(
                            "curve '{}': segment time axis not increasing at t={}",
                            curve.id, end.time
                        ),
                    });
                }
                last = end.time;
            }
            if last < self.duration {
                return Err(MotionError::MalformedCurve {
                    reason: format!(
                        "curve '{}' ends at t={last} before the clip duration {}",
                        curve.id, self.duration
                    ),
                });
            }
        }
        Ok(())
    }
}
