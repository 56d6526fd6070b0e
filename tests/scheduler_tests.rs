use std::collections::HashMap;

use rig_motion_core::{
    BlendMode, BlendOp, Clip, Curve, CurveTarget, Expression, ExpressionDirective, Model,
    ModelConfig, MotionError, RenderTarget, TransitionKind,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

/// Render target stub that records every write.
#[derive(Default)]
struct RecordingTarget {
    parameters: HashMap<String, f32>,
    opacities: HashMap<String, f32>,
    defaults: HashMap<String, f32>,
}

impl RecordingTarget {
    fn with_default(id: &str, value: f32) -> Self {
        let mut target = Self::default();
        target.defaults.insert(id.to_string(), value);
        target
    }
}

impl RenderTarget for RecordingTarget {
    fn blend_parameter(&mut self, id: &str, op: BlendOp, value: f32) {
        assert_eq!(op, BlendOp::Overwrite, "the core only issues Overwrite");
        self.parameters.insert(id.to_string(), value);
    }

    fn blend_opacity(&mut self, id: &str, op: BlendOp, value: f32) {
        assert_eq!(op, BlendOp::Overwrite);
        self.opacities.insert(id.to_string(), value);
    }

    fn parameter_default(&self, id: &str) -> f32 {
        self.defaults.get(id).copied().unwrap_or(0.0)
    }
}

/// One linear parameter curve from `(0, v0)` to `(duration, v1)`.
fn linear_clip(name: &str, id: &str, duration: f32, v0: f32, v1: f32) -> Clip {
    let curve =
        Curve::from_flat_run(CurveTarget::Parameter, id, &[0.0, v0, 0.0, duration, v1]).unwrap();
    Clip::new(name, duration, vec![curve])
}

fn bow_model() -> Model {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("bow", "P", 2.0, 0.0, 1.0));
    model
}

#[test]
fn bow_scenario() {
    // it should play one exclusive clip, go idle, and keep the final pose
    let mut model = bow_model();
    let mut target = RecordingTarget::default();

    model.play_exclusive("bow", 0.0, 0.0, false).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    assert_eq!(model.list_active().exclusive, vec!["bow".to_string()]);

    model.tick(&mut target, 1.0).unwrap();
    approx(target.parameters["P"], 0.5, 1e-6);

    model.tick(&mut target, 2.0).unwrap();
    assert!(model.list_active().exclusive.is_empty());
    approx(target.parameters["P"], 1.0, 1e-6);

    // The persistence store re-applies the final pose on every later tick.
    let mut fresh = RecordingTarget::default();
    model.tick(&mut fresh, 5.0).unwrap();
    approx(fresh.parameters["P"], 1.0, 1e-6);
}

#[test]
fn fifo_order() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("a", "P", 1.0, 0.0, 1.0));
    model.insert_clip(linear_clip("b", "P", 1.0, 10.0, 11.0));
    model.insert_clip(linear_clip("c", "P", 1.0, 20.0, 21.0));
    let mut target = RecordingTarget::default();

    model.play_exclusive("a", 0.0, 0.0, false).unwrap();
    model.play_exclusive("b", 0.0, 0.0, false).unwrap();
    model.play_exclusive("c", 0.0, 0.0, false).unwrap();

    model.tick(&mut target, 0.0).unwrap();
    assert_eq!(
        model.list_active().exclusive,
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );

    model.tick(&mut target, 0.5).unwrap();
    approx(target.parameters["P"], 0.5, 1e-6);

    model.tick(&mut target, 1.0).unwrap();
    assert_eq!(
        model.list_active().exclusive,
        vec!["b".to_string(), "c".to_string()]
    );

    model.tick(&mut target, 1.5).unwrap();
    approx(target.parameters["P"], 10.5, 1e-6);

    model.tick(&mut target, 2.0).unwrap();
    model.tick(&mut target, 2.5).unwrap();
    approx(target.parameters["P"], 20.5, 1e-6);

    model.tick(&mut target, 3.0).unwrap();
    assert!(model.list_active().exclusive.is_empty());
    approx(target.parameters["P"], 21.0, 1e-6);
}

#[test]
fn loop_restart() {
    // it should re-trigger a looping clip indefinitely with zero wait
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("sway", "P", 1.0, 0.0, 1.0));
    let mut target = RecordingTarget::default();

    model.play_exclusive("sway", 0.0, 0.0, true).unwrap();
    model.tick(&mut target, 0.0).unwrap();

    for cycle in 0..4 {
        let base = cycle as f32;
        model.tick(&mut target, base + 0.5).unwrap();
        approx(target.parameters["P"], 0.5, 1e-5);
        model.tick(&mut target, base + 1.0).unwrap();
        assert_eq!(model.list_active().exclusive, vec!["sway".to_string()]);
    }
}

#[test]
fn skip_all_goes_idle() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("a", "P", 1.0, 0.0, 1.0));
    let mut target = RecordingTarget::default();

    model.play_exclusive("a", 0.0, 0.0, true).unwrap();
    model.play_exclusive("a", 0.0, 0.0, true).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    assert_eq!(model.list_active().exclusive.len(), 2);

    model.skip_all();
    assert!(model.list_active().exclusive.is_empty());
    model.tick(&mut target, 0.5).unwrap();
    assert!(model.list_active().exclusive.is_empty());
}

#[test]
fn skip_seconds_resumes_mid_clip() {
    let mut model = bow_model();
    let mut target = RecordingTarget::default();

    model.play_exclusive("bow", 0.0, 1.0, false).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    // start=0, end=0+2-1=1; at t=0.5 the playhead sits at 1.5 into the clip.
    model.tick(&mut target, 0.5).unwrap();
    approx(target.parameters["P"], 0.75, 1e-6);
}

#[test]
fn wait_seconds_delays_start() {
    let mut model = bow_model();
    let mut target = RecordingTarget::default();

    model.play_exclusive("bow", 1.0, 0.0, false).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    model.tick(&mut target, 0.5).unwrap();
    assert!(!target.parameters.contains_key("P"));

    model.tick(&mut target, 2.0).unwrap();
    approx(target.parameters["P"], 0.5, 1e-6);
}

#[test]
fn oversized_skip_is_clamped() {
    let mut model = bow_model();
    let mut target = RecordingTarget::default();

    // skip 10s > 2s duration: clamped, the clip ends immediately.
    model.play_exclusive("bow", 0.0, 10.0, false).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    model.tick(&mut target, 0.1).unwrap();
    assert!(model.list_active().exclusive.is_empty());
    approx(target.parameters["P"], 1.0, 1e-6);
}

#[test]
fn inclusive_blink_scenario() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("blink", "B", 0.2, 0.0, 1.0));
    let mut target = RecordingTarget::default();

    model.add_inclusive("blink", 1.0, 1.0).unwrap();

    // First tick schedules next_start = 1.0; nothing plays yet.
    model.tick(&mut target, 0.0).unwrap();
    assert!(!target.parameters.contains_key("B"));

    model.tick(&mut target, 0.5).unwrap();
    assert!(!target.parameters.contains_key("B"));

    // 0.1s into the window.
    model.tick(&mut target, 1.1).unwrap();
    approx(target.parameters["B"], 0.5, 1e-5);
}

#[test]
fn inclusive_plays_alongside_exclusive() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("bow", "P", 2.0, 0.0, 1.0));
    model.insert_clip(linear_clip("breathe", "R", 1.0, 0.0, 1.0));
    let mut target = RecordingTarget::default();

    model.play_exclusive("bow", 0.0, 0.0, false).unwrap();
    model.add_inclusive("breathe", 0.0, 0.0).unwrap();

    model.tick(&mut target, 0.0).unwrap();
    model.tick(&mut target, 0.5).unwrap();
    approx(target.parameters["P"], 0.25, 1e-6);
    approx(target.parameters["R"], 0.5, 1e-6);
}

#[test]
fn inclusive_removed_clip_fails_loudly() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("blink", "B", 0.2, 0.0, 1.0));
    let mut target = RecordingTarget::default();

    model.add_inclusive("blink", 0.0, 0.0).unwrap();
    model.remove_clip("blink").unwrap();

    let err = model.tick(&mut target, 0.0).unwrap_err();
    assert!(matches!(err, MotionError::UnknownClip { .. }));
}

#[test]
fn unknown_names_are_rejected() {
    let mut model = Model::new("rig", ModelConfig::default());
    assert!(matches!(
        model.play_exclusive("nope", 0.0, 0.0, false),
        Err(MotionError::UnknownClip { .. })
    ));
    assert!(matches!(
        model.add_inclusive("nope", 0.0, 0.0),
        Err(MotionError::UnknownClip { .. })
    ));
    assert!(matches!(
        model.set_expression("nope", None),
        Err(MotionError::UnknownExpression { .. })
    ));
    assert!(matches!(
        model.transition_to("nope", TransitionKind::Bezier, 1.0),
        Err(MotionError::UnknownClip { .. })
    ));
}

#[test]
fn invalid_arguments_are_rejected() {
    let mut model = bow_model();
    assert!(matches!(
        model.play_exclusive("bow", -1.0, 0.0, false),
        Err(MotionError::InvalidArgument { .. })
    ));
    assert!(matches!(
        model.add_inclusive("bow", 2.0, 1.0),
        Err(MotionError::InvalidArgument { .. })
    ));
    let mut target = RecordingTarget::default();
    assert!(matches!(
        model.tick(&mut target, f32::NAN),
        Err(MotionError::InvalidArgument { .. })
    ));
}

fn smile_expression() -> Expression {
    Expression::new(
        "smile",
        vec![
            ExpressionDirective {
                id: "Mouth".to_string(),
                value: 1.0,
                blend: BlendMode::Overwrite,
            },
            ExpressionDirective {
                id: "Brow".to_string(),
                value: 0.25,
                blend: BlendMode::Add,
            },
        ],
    )
}

#[test]
fn expression_instant_apply() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_expression(smile_expression());
    let mut target = RecordingTarget::with_default("Brow", 0.5);

    model.set_expression("smile", Some(0.0)).unwrap();
    model.tick(&mut target, 0.0).unwrap();

    approx(target.parameters["Mouth"], 1.0, 1e-6);
    // Add blend seeds from the host default.
    approx(target.parameters["Brow"], 0.75, 1e-6);
    assert_eq!(model.list_active().expressions, vec!["smile".to_string()]);

    // The pose stays applied on later ticks.
    model.tick(&mut target, 3.0).unwrap();
    approx(target.parameters["Mouth"], 1.0, 1e-6);
}

#[test]
fn expression_fade_crosses_to_goal() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_expression(smile_expression());
    let mut target = RecordingTarget::default();

    model.set_expression("smile", Some(1.0)).unwrap();

    // Fade start: the override holds the resting value.
    model.tick(&mut target, 0.0).unwrap();
    approx(target.parameters["Mouth"], 0.0, 1e-6);
    assert!(model.has_clip("fade0"));

    // Midpoint of the symmetric ease curve.
    model.tick(&mut target, 0.5).unwrap();
    approx(target.parameters["Mouth"], 0.5, 1e-5);

    // Fade complete: the flat replay holds the goal from here on.
    model.tick(&mut target, 1.0).unwrap();
    approx(target.parameters["Mouth"], 1.0, 1e-6);
    model.tick(&mut target, 2.0).unwrap();
    approx(target.parameters["Mouth"], 1.0, 1e-6);
}

#[test]
fn expression_last_request_wins() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_expression(smile_expression());
    model.insert_expression(Expression::new(
        "frown",
        vec![ExpressionDirective {
            id: "Mouth".to_string(),
            value: -1.0,
            blend: BlendMode::Overwrite,
        }],
    ));
    let mut target = RecordingTarget::default();

    model.set_expression("smile", Some(0.0)).unwrap();
    model.set_expression("frown", Some(0.0)).unwrap();
    model.tick(&mut target, 0.0).unwrap();

    approx(target.parameters["Mouth"], -1.0, 1e-6);
    assert_eq!(model.list_active().expressions, vec!["frown".to_string()]);
}

#[test]
fn clear_expression_keeps_pose() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_expression(smile_expression());
    let mut target = RecordingTarget::default();

    model.set_expression("smile", Some(0.0)).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    assert!(model.clear_expression("smile"));
    assert!(model.list_active().expressions.is_empty());

    model.tick(&mut target, 1.0).unwrap();
    approx(target.parameters["Mouth"], 1.0, 1e-6);
}

#[test]
fn reset_totality() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("bow", "P", 2.0, 0.0, 1.0));
    model.insert_clip(linear_clip("blink", "B", 0.2, 0.0, 1.0));
    model.insert_expression(smile_expression());
    let mut target = RecordingTarget::default();

    model.play_exclusive("bow", 0.0, 0.0, true).unwrap();
    model.add_inclusive("blink", 1.0, 1.0).unwrap();
    model.set_expression("smile", Some(0.0)).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    model.tick(&mut target, 1.0).unwrap();

    model.reset();
    let active = model.list_active();
    assert!(active.exclusive.is_empty());
    assert!(active.inclusive.is_empty());
    assert!(active.expressions.is_empty());

    // Clip and expression tables survive.
    assert!(model.has_clip("bow"));
    assert!(model.has_expression("smile"));

    // The persistence store is empty: nothing from the bow clip reappears.
    let mut fresh = RecordingTarget::default();
    model.tick(&mut fresh, 2.0).unwrap();
    assert!(!fresh.parameters.contains_key("P"));
}

#[test]
fn expression_pose_survives_reset() {
    // Seed-once contract: the expression resting pose outlives reset().
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_expression(smile_expression());
    let mut target = RecordingTarget::with_default("Brow", 0.5);

    model.set_expression("smile", Some(0.0)).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    model.reset();

    let mut fresh = RecordingTarget::default();
    model.tick(&mut fresh, 1.0).unwrap();
    approx(fresh.parameters["Mouth"], 1.0, 1e-6);
    approx(fresh.parameters["Brow"], 0.75, 1e-6);
}

#[test]
fn transition_bootstrap_fades_opacity() {
    // A never-animated rig transitions by revealing the pose, not by curves.
    let mut model = bow_model();
    let mut target = RecordingTarget::default();

    model.transition_to("bow", TransitionKind::Linear, 1.0).unwrap();
    let transition = model.clip("transition0").unwrap();
    assert_eq!(transition.duration, 1.0);
    assert_eq!(transition.curves.len(), 1);
    assert_eq!(transition.curves[0].target, CurveTarget::ModelOpacity);

    model.tick(&mut target, 0.0).unwrap();
    model.tick(&mut target, 0.5).unwrap();
    // Model opacity has no host channel; no parameter writes during the fade.
    assert!(!target.parameters.contains_key("P"));

    // The target clip resumes exactly where the transition left off.
    model.tick(&mut target, 1.0).unwrap();
    model.tick(&mut target, 1.5).unwrap();
    approx(target.parameters["P"], 0.75, 1e-6);
}

#[test]
fn transition_from_persisted_pose() {
    let mut model = Model::new("rig", ModelConfig::default());
    model.insert_clip(linear_clip("bow", "P", 2.0, 0.0, 1.0));
    model.insert_clip(linear_clip("wave", "P", 2.0, 0.8, 0.8));
    let mut target = RecordingTarget::default();

    // Animate partway through bow so the rig holds P = 0.2.
    model.play_exclusive("bow", 0.0, 0.0, false).unwrap();
    model.tick(&mut target, 0.0).unwrap();
    model.tick(&mut target, 0.4).unwrap();
    approx(target.parameters["P"], 0.2, 1e-6);

    model.transition_to("wave", TransitionKind::Linear, 1.0).unwrap();
    let transition = model.clip("transition0").unwrap();
    assert_eq!(transition.curves[0].start.time, 0.0);
    approx(transition.curves[0].start.value, 0.2, 1e-6);
    approx(transition.curves[0].segments[0].end().value, 0.8, 1e-6);

    // Cut straight to the transition and walk it.
    model.skip_current().unwrap();
    model.tick(&mut target, 0.9).unwrap();
    approx(target.parameters["P"], 0.5, 1e-5);

    model.tick(&mut target, 1.4).unwrap();
    model.tick(&mut target, 1.9).unwrap();
    approx(target.parameters["P"], 0.8, 1e-5);
}

#[test]
fn synthetic_names_never_repeat() {
    let mut model = bow_model();
    model.transition_to("bow", TransitionKind::Bezier, 1.0).unwrap();
    model.transition_to("bow", TransitionKind::Bezier, 1.0).unwrap();
    assert!(model.has_clip("transition0"));
    assert!(model.has_clip("transition1"));
}

#[test]
fn tick_reports_frame_interval() {
    let mut model = bow_model();
    let mut target = RecordingTarget::default();
    let sleep = model.tick(&mut target, 0.0).unwrap();
    approx(sleep, 1.0 / 30.0, 1e-6);

    let cfg = ModelConfig {
        frame_rate: 60.0,
        ..ModelConfig::default()
    };
    let mut fast = Model::new("rig", cfg);
    let sleep = fast.tick(&mut target, 0.0).unwrap();
    approx(sleep, 1.0 / 60.0, 1e-6);
}
