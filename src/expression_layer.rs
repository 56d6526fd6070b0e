//! Expression layer bookkeeping: a single-slot pending activation, the set of
//! resident expression names, and the in-flight cross-fade.
//!
//! The actual blended parameter values live in the model's persistent
//! expression map; the resident set exists for introspection only.

use std::collections::BTreeSet;

/// A requested activation waiting to be consumed on the next tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingExpression {
    pub name: String,
    pub fade_in_seconds: f32,
}

/// An in-flight cross-fade driven by a synthesized fade clip.
#[derive(Clone, Debug, PartialEq)]
pub struct FadeState {
    pub clip_name: String,
    pub start_time: f32,
    pub end_time: f32,
}

#[derive(Debug, Default)]
pub struct ExpressionLayer {
    pending: Option<PendingExpression>,
    resident: BTreeSet<String>,
    fade: Option<FadeState>,
}

impl ExpressionLayer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an activation. The last request wins; there is no queue.
    #[inline]
    pub fn request(&mut self, name: impl Into<String>, fade_in_seconds: f32) {
        self.pending = Some(PendingExpression {
            name: name.into(),
            fade_in_seconds,
        });
    }

    #[inline]
    pub fn take_pending(&mut self) -> Option<PendingExpression> {
        self.pending.take()
    }

    #[inline]
    pub fn mark_resident(&mut self, name: &str) {
        self.resident.insert(name.to_string());
    }

    #[inline]
    pub fn remove_resident(&mut self, name: &str) -> bool {
        self.resident.remove(name)
    }

    #[inline]
    pub fn clear_residents(&mut self) {
        self.resident.clear();
    }

    /// Resident expression names in sorted order.
    #[inline]
    pub fn residents(&self) -> impl Iterator<Item = &str> {
        self.resident.iter().map(|s| s.as_str())
    }

    #[inline]
    pub fn fade(&self) -> Option<&FadeState> {
        self.fade.as_ref()
    }

    #[inline]
    pub fn begin_fade(&mut self, clip_name: impl Into<String>, start_time: f32, end_time: f32) {
        self.fade = Some(FadeState {
            clip_name: clip_name.into(),
            start_time,
            end_time,
        });
    }

    /// Idempotent: clearing an already-cleared fade is a no-op.
    #[inline]
    pub fn clear_fade(&mut self) {
        self.fade = None;
    }

    /// Drop all layer state: pending request, residents, and fade.
    #[inline]
    pub fn reset(&mut self) {
        self.pending = None;
        self.resident.clear();
        self.fade = None;
    }
}
