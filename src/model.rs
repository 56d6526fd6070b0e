//! Model: the per-rig scheduler. Owns the clip and expression tables, the
//! exclusive lane, the inclusive set, the expression layer, and the
//! persistence stores, and advances all of them once per tick.
//!
//! Per-tick write order is load-bearing: persistence replay, then the
//! exclusive lane, then inclusive layers, then the expression layer (flat
//! resting-pose replay before the in-flight fade override). Last write wins
//! when two layers touch the same parameter in the same tick.

use std::collections::HashMap;
use std::fmt;

use log::{debug, trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clip::{Clip, Curve, CurveTarget};
use crate::config::ModelConfig;
use crate::error::MotionError;
use crate::exclusive::{ActionState, ExclusiveLane, QueueEntry};
use crate::expression::{BlendMode, Expression};
use crate::expression_layer::ExpressionLayer;
use crate::inclusive::InclusiveSet;
use crate::sampling::{evaluate_clip, CurveSample};
use crate::target::{BlendOp, RenderTarget};
use crate::Result;

/// Interpolation shape for synthesized transition and fade clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    Linear,
    /// Ease-in/ease-out via repeated endpoints as Bézier control points.
    Bezier,
}

/// Names of everything currently playing or queued, per layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveSet {
    pub exclusive: Vec<String>,
    pub inclusive: Vec<String>,
    pub expressions: Vec<String>,
}

/// Key of the persistence store: which slot of the rig a value was written to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamKey {
    pub target: CurveTarget,
    pub id: String,
}

/// The per-rig motion scheduler. Constructed once at load time, mutated every
/// frame through [`Model::tick`].
pub struct Model {
    name: String,
    cfg: ModelConfig,
    clips: HashMap<String, Clip>,
    expressions: HashMap<String, Expression>,
    exclusive: ExclusiveLane,
    action: Option<ActionState>,
    inclusive: InclusiveSet,
    expression_layer: ExpressionLayer,
    /// Last value written to each slot; re-applied every tick so finished
    /// clips do not snap the rig back to its rest pose.
    persistent: HashMap<ParamKey, f32>,
    /// Expression-layer resting values, seeded lazily from the render
    /// target's defaults at most once per parameter for the model lifetime.
    persistent_expression: HashMap<String, f32>,
    current_time: f32,
    /// Monotone counter for synthetic clip names; never reused.
    synth_counter: u64,
}

impl Model {
    pub fn new(name: impl Into<String>, cfg: ModelConfig) -> Self {
        Self {
            name: name.into(),
            cfg,
            clips: HashMap::new(),
            expressions: HashMap::new(),
            exclusive: ExclusiveLane::new(),
            action: None,
            inclusive: InclusiveSet::new(),
            expression_layer: ExpressionLayer::new(),
            persistent: HashMap::new(),
            persistent_expression: HashMap::new(),
            current_time: 0.0,
            synth_counter: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &ModelConfig {
        &self.cfg
    }

    #[inline]
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Insert a parsed clip into the table, returning any displaced clip.
    pub fn insert_clip(&mut self, clip: Clip) -> Option<Clip> {
        self.clips.insert(clip.name.clone(), clip)
    }

    /// Remove a clip from the table. Inclusive registrations referencing it
    /// will fail loudly on the next tick.
    pub fn remove_clip(&mut self, name: &str) -> Option<Clip> {
        self.clips.remove(name)
    }

    pub fn insert_expression(&mut self, expression: Expression) -> Option<Expression> {
        self.expressions.insert(expression.name.clone(), expression)
    }

    #[inline]
    pub fn clip(&self, name: &str) -> Option<&Clip> {
        self.clips.get(name)
    }

    #[inline]
    pub fn expression(&self, name: &str) -> Option<&Expression> {
        self.expressions.get(name)
    }

    #[inline]
    pub fn has_clip(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    #[inline]
    pub fn has_expression(&self, name: &str) -> bool {
        self.expressions.contains_key(name)
    }

    pub fn clip_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clips.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn expression_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.expressions.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn require_clip(&self, name: &str) -> Result<()> {
        if self.clips.contains_key(name) {
            Ok(())
        } else {
            Err(MotionError::UnknownClip {
                model: self.name.clone(),
                name: name.to_string(),
            })
        }
    }

    fn require_expression(&self, name: &str) -> Result<()> {
        if self.expressions.contains_key(name) {
            Ok(())
        } else {
            Err(MotionError::UnknownExpression {
                model: self.name.clone(),
                name: name.to_string(),
            })
        }
    }

    /// Queue a clip on the exclusive lane.
    pub fn play_exclusive(
        &mut self,
        clip_name: &str,
        wait_seconds: f32,
        skip_seconds: f32,
        looping: bool,
    ) -> Result<()> {
        self.require_clip(clip_name)?;
        if !wait_seconds.is_finite() || wait_seconds < 0.0 {
            return Err(MotionError::InvalidArgument {
                reason: format!("wait_seconds must be finite and >= 0, got {wait_seconds}"),
            });
        }
        if !skip_seconds.is_finite() {
            return Err(MotionError::InvalidArgument {
                reason: format!("skip_seconds must be finite, got {skip_seconds}"),
            });
        }
        self.exclusive.push(QueueEntry {
            clip_name: clip_name.to_string(),
            wait_seconds,
            skip_seconds,
            looping,
        });
        Ok(())
    }

    /// Abandon the current action and start the next queued clip, or go idle
    /// when the queue is empty.
    pub fn skip_current(&mut self) -> Result<()> {
        match self.exclusive.pop() {
            None => {
                self.action = None;
                Ok(())
            }
            Some(entry) => self.begin_action(entry),
        }
    }

    /// Drain the queue and clear the action state.
    pub fn skip_all(&mut self) {
        self.exclusive.clear();
        self.action = None;
    }

    fn begin_action(&mut self, entry: QueueEntry) -> Result<()> {
        let clip = self
            .clips
            .get(&entry.clip_name)
            .ok_or_else(|| MotionError::UnknownClip {
                model: self.name.clone(),
                name: entry.clip_name.clone(),
            })?;
        let skip = entry.skip_seconds.clamp(0.0, clip.duration);
        if skip != entry.skip_seconds {
            warn!(
                "model '{}': skip {}s clamped to {skip}s for clip '{}'",
                self.name, entry.skip_seconds, entry.clip_name
            );
        }
        let start_time = self.current_time + entry.wait_seconds;
        debug!(
            "model '{}': exclusive clip '{}' scheduled at t={start_time}",
            self.name, entry.clip_name
        );
        self.action = Some(ActionState {
            end_time: start_time + clip.duration - skip,
            clip_name: entry.clip_name,
            start_time,
            skip_time: skip,
            looping: entry.looping,
        });
        Ok(())
    }

    /// Register an inclusive clip with a re-trigger delay drawn uniformly
    /// from `[min_seconds, max_seconds]` each cycle.
    pub fn add_inclusive(
        &mut self,
        clip_name: &str,
        min_seconds: f32,
        max_seconds: f32,
    ) -> Result<()> {
        self.require_clip(clip_name)?;
        if !min_seconds.is_finite() || !max_seconds.is_finite() || min_seconds < 0.0 {
            return Err(MotionError::InvalidArgument {
                reason: format!(
                    "inclusive delay bounds must be finite and >= 0, got [{min_seconds}, {max_seconds}]"
                ),
            });
        }
        if max_seconds < min_seconds {
            return Err(MotionError::InvalidArgument {
                reason: format!(
                    "inclusive max_seconds {max_seconds} is below min_seconds {min_seconds}"
                ),
            });
        }
        self.inclusive.insert(clip_name, min_seconds, max_seconds);
        Ok(())
    }

    pub fn remove_inclusive(&mut self, clip_name: &str) -> bool {
        self.inclusive.remove(clip_name)
    }

    pub fn clear_all_inclusive(&mut self) {
        self.inclusive.clear();
    }

    /// Request an expression activation; consumed on the next tick. `None`
    /// fade falls back to the configured default. The last request before a
    /// tick wins.
    pub fn set_expression(
        &mut self,
        expression_name: &str,
        fade_in_seconds: Option<f32>,
    ) -> Result<()> {
        self.require_expression(expression_name)?;
        let fade = fade_in_seconds.unwrap_or(self.cfg.default_fade_seconds);
        if !fade.is_finite() || fade < 0.0 {
            return Err(MotionError::InvalidArgument {
                reason: format!("fade_in_seconds must be finite and >= 0, got {fade}"),
            });
        }
        self.expression_layer.request(expression_name, fade);
        Ok(())
    }

    /// Drop an expression from the resident set. The pose it blended into the
    /// persistent expression map stays applied.
    pub fn clear_expression(&mut self, expression_name: &str) -> bool {
        self.expression_layer.remove_resident(expression_name)
    }

    pub fn clear_all_expressions(&mut self) {
        self.expression_layer.clear_residents();
    }

    /// Everything currently playing or queued, per layer.
    pub fn list_active(&self) -> ActiveSet {
        let mut exclusive = Vec::new();
        if let Some(action) = &self.action {
            exclusive.push(action.clip_name.clone());
        }
        exclusive.extend(self.exclusive.peek_all().map(|e| e.clip_name.clone()));
        let mut inclusive: Vec<String> = self.inclusive.names().map(str::to_string).collect();
        inclusive.sort_unstable();
        let expressions = self
            .expression_layer
            .residents()
            .map(str::to_string)
            .collect();
        ActiveSet {
            exclusive,
            inclusive,
            expressions,
        }
    }

    /// Drain every layer and clear the persistence store. The clip and
    /// expression tables survive, as does the expression resting pose:
    /// parameters are seeded from the host defaults at most once per model.
    pub fn reset(&mut self) {
        debug!("model '{}': reset", self.name);
        self.skip_all();
        self.inclusive.clear();
        self.expression_layer.reset();
        self.persistent.clear();
    }

    /// Advance the scheduler to `now_seconds`, writing fresh parameter values
    /// into `target`. Returns the recommended sleep until the next tick.
    pub fn tick(&mut self, target: &mut dyn RenderTarget, now_seconds: f32) -> Result<f32> {
        if !now_seconds.is_finite() {
            return Err(MotionError::InvalidArgument {
                reason: format!("tick time must be finite, got {now_seconds}"),
            });
        }
        self.current_time = now_seconds;
        trace!("model '{}': tick t={now_seconds}", self.name);
        self.force_persistence(target);
        self.animate_exclusive(target)?;
        self.animate_inclusive(target)?;
        self.animate_expression(target)?;
        Ok(1.0 / self.cfg.frame_rate)
    }

    /// Re-apply every persisted value so finished clips keep their pose.
    fn force_persistence(&self, target: &mut dyn RenderTarget) {
        for (key, value) in &self.persistent {
            match key.target {
                CurveTarget::Parameter => {
                    target.blend_parameter(&key.id, BlendOp::Overwrite, *value)
                }
                CurveTarget::PartOpacity => {
                    target.blend_opacity(&key.id, BlendOp::Overwrite, *value)
                }
                // No host channel for whole-model opacity.
                CurveTarget::ModelOpacity => {}
            }
        }
    }

    fn animate_exclusive(&mut self, target: &mut dyn RenderTarget) -> Result<()> {
        let action_end = self.action.as_ref().map(|a| a.end_time).unwrap_or(0.0);

        // Past the end of the current action (or idle): flush the finished
        // clip's end pose, then advance the queue.
        if self.current_time >= action_end {
            if let Some(action) = self.action.clone() {
                let clip = self
                    .clips
                    .get(&action.clip_name)
                    .ok_or_else(|| MotionError::UnknownClip {
                        model: self.name.clone(),
                        name: action.clip_name.clone(),
                    })?;
                let samples = evaluate_clip(clip, clip.duration)?;
                self.write_and_persist(target, samples);
            }
            if self.exclusive.is_empty() {
                match self.action.take() {
                    Some(action) if action.looping => {
                        // Restart in place with zero wait and skip.
                        self.exclusive.push(QueueEntry {
                            clip_name: action.clip_name,
                            wait_seconds: 0.0,
                            skip_seconds: 0.0,
                            looping: true,
                        });
                        self.skip_current()?;
                    }
                    _ => {}
                }
            } else {
                self.skip_current()?;
            }
            return Ok(());
        }

        let Some(action) = self.action.clone() else {
            return Ok(());
        };
        // Waiting for its start time: no writes yet.
        if self.current_time < action.start_time {
            return Ok(());
        }
        let relative = self.current_time - action.start_time + action.skip_time;
        let clip = self
            .clips
            .get(&action.clip_name)
            .ok_or_else(|| MotionError::UnknownClip {
                model: self.name.clone(),
                name: action.clip_name.clone(),
            })?;
        if relative > clip.duration {
            // Clock ran ahead of the scheduler; the next tick dequeues.
            return Ok(());
        }
        let samples = evaluate_clip(clip, relative)?;
        self.write_and_persist(target, samples);
        Ok(())
    }

    /// Forward samples to the render target and record them so they stay
    /// applied after the clip ends.
    fn write_and_persist(&mut self, target: &mut dyn RenderTarget, samples: Vec<CurveSample>) {
        write_samples(target, &samples);
        for sample in samples {
            self.persistent.insert(
                ParamKey {
                    target: sample.target,
                    id: sample.id,
                },
                sample.value,
            );
        }
    }

    fn animate_inclusive(&mut self, target: &mut dyn RenderTarget) -> Result<()> {
        if self.inclusive.is_empty() {
            return Ok(());
        }
        let now = self.current_time;

        // Reschedule every entry whose window has elapsed.
        let mut rng = rand::thread_rng();
        for (name, entry) in self.inclusive.iter_mut() {
            let clip = self.clips.get(name).ok_or_else(|| MotionError::UnknownClip {
                model: self.name.clone(),
                name: name.clone(),
            })?;
            if now >= entry.next_end {
                let delay = if entry.max_seconds > entry.min_seconds {
                    rng.gen_range(entry.min_seconds..=entry.max_seconds)
                } else {
                    entry.min_seconds
                };
                entry.next_start = now + delay;
                entry.next_end = entry.next_start + clip.duration;
                debug!(
                    "model: inclusive clip '{name}' rescheduled for t={}",
                    entry.next_start
                );
            }
        }

        // Evaluate every entry inside its window.
        for (name, entry) in self.inclusive.iter() {
            let relative = now - entry.next_start;
            if relative < 0.0 {
                continue;
            }
            // Clamp against drifted window arithmetic.
            let relative = relative.min(entry.next_end - entry.next_start);
            let clip = self.clips.get(name).ok_or_else(|| MotionError::UnknownClip {
                model: self.name.clone(),
                name: name.clone(),
            })?;
            let samples = evaluate_clip(clip, relative)?;
            write_samples(target, &samples);
        }
        Ok(())
    }

    fn animate_expression(&mut self, target: &mut dyn RenderTarget) -> Result<()> {
        if let Some(pending) = self.expression_layer.take_pending() {
            self.expression_layer.mark_resident(&pending.name);
            debug!(
                "model '{}': activating expression '{}' with {}s fade",
                self.name, pending.name, pending.fade_in_seconds
            );
            if pending.fade_in_seconds == 0.0 {
                self.apply_expression_instant(target, &pending.name)?;
                self.expression_layer.clear_fade();
            } else {
                let fade_clip = self.fade_and_add(
                    target,
                    &pending.name,
                    TransitionKind::Bezier,
                    pending.fade_in_seconds,
                )?;
                self.expression_layer.begin_fade(
                    fade_clip,
                    self.current_time,
                    self.current_time + pending.fade_in_seconds,
                );
            }
        }

        // Flat resting-pose replay keeps expressions alive indefinitely,
        // including across the frame a fade completes.
        for (id, value) in &self.persistent_expression {
            target.blend_parameter(id, BlendOp::Overwrite, *value);
        }

        // The in-flight fade overrides the flat replay for the parameters it
        // owns; it runs after, so its writes win this tick.
        let Some(fade) = self.expression_layer.fade().cloned() else {
            return Ok(());
        };
        if self.current_time >= fade.end_time {
            self.expression_layer.clear_fade();
            return Ok(());
        }
        if self.current_time < fade.start_time {
            return Ok(());
        }
        let clip = self
            .clips
            .get(&fade.clip_name)
            .ok_or_else(|| MotionError::UnknownClip {
                model: self.name.clone(),
                name: fade.clip_name.clone(),
            })?;
        let samples = evaluate_clip(clip, self.current_time - fade.start_time)?;
        write_samples(target, &samples);
        Ok(())
    }

    /// Resolve an expression's directives straight into the persistent
    /// expression map, seeding untouched parameters from the host defaults.
    fn apply_expression_instant(
        &mut self,
        target: &mut dyn RenderTarget,
        expression_name: &str,
    ) -> Result<()> {
        let expression = self
            .expressions
            .get(expression_name)
            .ok_or_else(|| MotionError::UnknownExpression {
                model: self.name.clone(),
                name: expression_name.to_string(),
            })?
            .clone();
        for directive in &expression.directives {
            let resting = *self
                .persistent_expression
                .entry(directive.id.clone())
                .or_insert_with(|| target.parameter_default(&directive.id));
            let value = match directive.blend {
                BlendMode::Add => resting + directive.value,
                BlendMode::Overwrite => directive.value,
            };
            self.persistent_expression.insert(directive.id.clone(), value);
        }
        Ok(())
    }

    /// Queue a synthesized transition from the rig's current persisted pose
    /// into `clip_name`, then the clip itself, resuming `duration` seconds
    /// in. A non-positive duration substitutes the configured default.
    pub fn transition_to(
        &mut self,
        clip_name: &str,
        kind: TransitionKind,
        duration: f32,
    ) -> Result<()> {
        self.require_clip(clip_name)?;
        if !duration.is_finite() {
            return Err(MotionError::InvalidArgument {
                reason: format!("transition duration must be finite, got {duration}"),
            });
        }
        let duration = if duration <= 0.0 {
            self.cfg.default_transition_seconds
        } else {
            duration
        };

        let goal = evaluate_clip(&self.clips[clip_name], duration)?;
        let mut curves = Vec::new();
        if self.persistent.is_empty() {
            // Never-animated rig: reveal the pose by fading model opacity in.
            curves.push(Curve::from_flat_run(
                CurveTarget::ModelOpacity,
                "Opacity",
                &[0.0, 0.0, 0.0, duration, 1.0],
            )?);
        } else {
            for sample in goal {
                let key = ParamKey {
                    target: sample.target,
                    id: sample.id,
                };
                // Parameters the rig has never touched have no pose to leave.
                let Some(&from) = self.persistent.get(&key) else {
                    continue;
                };
                curves.push(synth_curve(
                    key.target,
                    key.id,
                    kind,
                    from,
                    sample.value,
                    duration,
                )?);
            }
        }

        let transition_name = self.next_synth_name("transition");
        debug!(
            "model '{}': synthesized '{transition_name}' into clip '{clip_name}' over {duration}s",
            self.name
        );
        self.clips.insert(
            transition_name.clone(),
            Clip::new(transition_name.clone(), duration, curves),
        );
        self.exclusive.push(QueueEntry {
            clip_name: transition_name,
            wait_seconds: 0.0,
            skip_seconds: 0.0,
            looping: false,
        });
        self.exclusive.push(QueueEntry {
            clip_name: clip_name.to_string(),
            wait_seconds: 0.0,
            skip_seconds: duration,
            looping: true,
        });
        Ok(())
    }

    /// Build a fade clip carrying each of the expression's parameters from
    /// its current resting value to its blended goal, update the resting pose
    /// to the goal, and return the synthetic clip's name.
    fn fade_and_add(
        &mut self,
        target: &mut dyn RenderTarget,
        expression_name: &str,
        kind: TransitionKind,
        duration: f32,
    ) -> Result<String> {
        let duration = if duration <= 0.0 {
            self.cfg.default_fade_seconds
        } else {
            duration
        };
        let expression = self
            .expressions
            .get(expression_name)
            .ok_or_else(|| MotionError::UnknownExpression {
                model: self.name.clone(),
                name: expression_name.to_string(),
            })?
            .clone();

        // Resolve goals against the pre-fade resting pose; a duplicated
        // directive id keeps only its last goal.
        let mut goals: Vec<(String, f32)> = Vec::new();
        for directive in &expression.directives {
            let resting = *self
                .persistent_expression
                .entry(directive.id.clone())
                .or_insert_with(|| target.parameter_default(&directive.id));
            let value = match directive.blend {
                BlendMode::Add => resting + directive.value,
                BlendMode::Overwrite => directive.value,
            };
            match goals.iter_mut().find(|(id, _)| *id == directive.id) {
                Some(slot) => slot.1 = value,
                None => goals.push((directive.id.clone(), value)),
            }
        }

        let mut curves = Vec::new();
        for (id, goal) in goals {
            let from = self.persistent_expression[&id];
            // The resting pose jumps to the goal immediately; the fade clip
            // overrides the replayed value until the fade completes.
            self.persistent_expression.insert(id.clone(), goal);
            curves.push(synth_curve(
                CurveTarget::Parameter,
                id,
                kind,
                from,
                goal,
                duration,
            )?);
        }

        let fade_name = self.next_synth_name("fade");
        debug!(
            "model '{}': synthesized '{fade_name}' for expression '{expression_name}' over {duration}s",
            self.name
        );
        self.clips.insert(
            fade_name.clone(),
            Clip::new(fade_name.clone(), duration, curves),
        );
        Ok(fade_name)
    }

    fn next_synth_name(&mut self, prefix: &str) -> String {
        let n = self.synth_counter;
        self.synth_counter += 1;
        format!("{prefix}{n}")
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model name: {}", self.name)?;
        for name in self.clip_names() {
            writeln!(f, "Clip name: {name}")?;
        }
        for name in self.expression_names() {
            writeln!(f, "Expression name: {name}")?;
        }
        Ok(())
    }
}

fn write_samples(target: &mut dyn RenderTarget, samples: &[CurveSample]) {
    for sample in samples {
        match sample.target {
            CurveTarget::Parameter => {
                target.blend_parameter(&sample.id, BlendOp::Overwrite, sample.value)
            }
            CurveTarget::PartOpacity => {
                target.blend_opacity(&sample.id, BlendOp::Overwrite, sample.value)
            }
            CurveTarget::ModelOpacity => {}
        }
    }
}

/// Transition curve shape from `from` to `to` over `duration`, per the flat
/// run encodings `[0, v0, 0, d, v1]` (linear) and
/// `[0, v0, 1, d/3, v0, 2d/3, v1, d, v1]` (ease-in/ease-out Bézier).
fn synth_curve(
    target: CurveTarget,
    id: String,
    kind: TransitionKind,
    from: f32,
    to: f32,
    duration: f32,
) -> Result<Curve> {
    let run = match kind {
        TransitionKind::Linear => vec![0.0, from, 0.0, duration, to],
        TransitionKind::Bezier => vec![
            0.0,
            from,
            1.0,
            duration / 3.0,
            from,
            duration * 2.0 / 3.0,
            to,
            duration,
            to,
        ],
    };
    Curve::from_flat_run(target, id, &run)
}
