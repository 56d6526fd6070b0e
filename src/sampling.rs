//! Curve evaluation: interpolated parameter values for a clip at an instant.

use crate::clip::{Clip, ControlPoint, Curve, CurveTarget, Segment};
use crate::error::MotionError;
use crate::Result;

/// One evaluated parameter value.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveSample {
    pub target: CurveTarget,
    pub id: String,
    pub value: f32,
}

/// Evaluate every curve of `clip` at `relative_time` seconds.
///
/// Times outside `[0, clip.duration]` are clamped, never rejected: drift
/// between the scheduler's notion of elapsed time and the external clock is
/// expected, so `evaluate_clip(clip, t)` for any `t` past the end equals
/// `evaluate_clip(clip, clip.duration)`.
///
/// Output preserves curve iteration order. Duplicate `(target, id)` entries
/// are legal; the caller applies last-write-wins.
pub fn evaluate_clip(clip: &Clip, relative_time: f32) -> Result<Vec<CurveSample>> {
    let t = relative_time.min(clip.duration).max(0.0);
    let mut samples = Vec::with_capacity(clip.curves.len());
    for curve in &clip.curves {
        samples.push(CurveSample {
            target: curve.target,
            id: curve.id.clone(),
            value: sample_curve(curve, t)?,
        });
    }
    Ok(samples)
}

/// Walk the segment run until the target time falls at or before a segment's
/// end, or the run is exhausted (the last segment then governs), and
/// interpolate within that segment.
pub fn sample_curve(curve: &Curve, t: f32) -> Result<f32> {
    if curve.segments.is_empty() {
        return Err(MotionError::MalformedCurve {
            reason: format!("curve '{}' has no segments", curve.id),
        });
    }
    let mut start = curve.start;
    for (idx, segment) in curve.segments.iter().enumerate() {
        match segment {
            Segment::Stepped { .. } => {
                return Err(MotionError::UnsupportedSegmentKind {
                    kind: "stepped".to_string(),
                })
            }
            Segment::InverseStepped { .. } => {
                return Err(MotionError::UnsupportedSegmentKind {
                    kind: "inverse-stepped".to_string(),
                })
            }
            _ => {}
        }
        let end = segment.end();
        if t < end.time || idx + 1 == curve.segments.len() {
            return match segment {
                Segment::Linear { end } => linear(t, start, *end),
                Segment::Bezier { c1, c2, end } => bezier(t, start, *c1, *c2, *end),
                _ => unreachable!("stepped segments rejected above"),
            };
        }
        start = end;
    }
    unreachable!("the last segment always governs")
}

/// `y = t·(v1 − v0) + v0` with `t` normalized over the segment span.
fn linear(st: f32, p0: ControlPoint, p1: ControlPoint) -> Result<f32> {
    let span = p1.time - p0.time;
    if span <= 0.0 {
        return Err(zero_length(p0));
    }
    let t = (st - p0.time) / span;
    Ok(t * (p1.value - p0.value) + p0.value)
}

/// Cubic Bézier on the value axis, parametrized by the normalized elapsed
/// time between segment start and end.
fn bezier(st: f32, p0: ControlPoint, p1: ControlPoint, p2: ControlPoint, p3: ControlPoint) -> Result<f32> {
    let span = p3.time - p0.time;
    if span <= 0.0 {
        return Err(zero_length(p0));
    }
    let t = (st - p0.time) / span;
    let u = 1.0 - t;
    Ok(u * u * u * p0.value
        + 3.0 * t * u * u * p1.value
        + 3.0 * u * t * t * p2.value
        + t * t * t * p3.value)
}

fn zero_length(p0: ControlPoint) -> MotionError {
    MotionError::MalformedCurve {
        reason: format!("zero-length segment at t={}", p0.time),
    }
}
