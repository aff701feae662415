//! Gesture detector integration tests
//!
//! Drives the detector through its public API with hand-written and
//! synthetic magnitude traces.

use std::time::Duration;

use chanchito::{GestureConfig, GestureDetector, MatchEvent, Phase, Sample};

mod common;

use common::{samples, test_config};

fn run(detector: &mut GestureDetector, trace: &[Sample]) -> Vec<MatchEvent> {
    trace.iter().filter_map(|&s| detector.observe(s)).collect()
}

/// Deterministic wobbly signal: two sines, rectified
fn synthetic_trace(seconds: u32, step_ms: u32) -> Vec<Sample> {
    (0..seconds * 1000 / step_ms)
        .map(|i| {
            let t = f64::from(i * step_ms) / 1000.0;
            let m = 60.0f64
                .mul_add((23.0 * t + 1.0).sin(), 200.0f64.mul_add((7.0 * t).sin(), 150.0))
                .abs();
            Sample::at_secs(t, m)
        })
        .collect()
}

#[test]
fn test_shake_pause_shake_matches_once() {
    let mut detector = GestureDetector::new(test_config());
    let events = run(&mut detector, &samples(&[(0.0, 300.0), (0.5, 10.0), (1.0, 300.0)]));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].completed_at, Duration::from_secs(1));
    assert_eq!(detector.phase(), Phase::Idle);
}

#[test]
fn test_slow_second_shake_is_not_a_gesture() {
    let mut detector = GestureDetector::new(test_config());
    let events = run(&mut detector, &samples(&[(0.0, 300.0), (0.5, 10.0), (3.5, 300.0)]));

    assert!(events.is_empty());
    assert_eq!(detector.phase(), Phase::Idle);
}

#[test]
fn test_second_peak_before_fall_keeps_original_start() {
    let mut detector = GestureDetector::new(test_config());
    let events = run(
        &mut detector,
        &samples(&[(0.0, 300.0), (0.1, 300.0), (0.5, 10.0), (0.6, 300.0)]),
    );

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].started_at, Duration::ZERO);
    assert_eq!(events[0].completed_at, Duration::from_secs_f64(0.6));
}

#[test]
fn test_steady_handling_never_triggers() {
    let mut detector = GestureDetector::new(test_config());
    let trace: Vec<Sample> = (0..1000)
        .map(|i| Sample::at_secs(f64::from(i) * 0.05, 100.0))
        .collect();

    assert!(run(&mut detector, &trace).is_empty());
    assert_eq!(detector.phase(), Phase::Idle);
    assert_eq!(detector.stats().armed, 0);
}

#[test]
fn test_repeated_mid_sample_leaves_state_alone() {
    let mut detector = GestureDetector::new(test_config());
    detector.observe(Sample::at_secs(0.0, 300.0));
    let armed = detector.state();

    for _ in 0..2 {
        assert!(detector.observe(Sample::at_secs(0.2, 120.0)).is_none());
        assert_eq!(detector.state(), armed);
    }
}

#[test]
fn test_every_match_follows_a_full_sequence() {
    let mut detector = GestureDetector::new(test_config());
    let mut saw_fall = false;
    let mut saw_rise = false;
    let mut matches = 0;

    for sample in synthetic_trace(60, 50) {
        let event = detector.observe(sample);
        match detector.phase() {
            Phase::AwaitingFall => saw_fall = true,
            Phase::AwaitingRise => saw_rise = true,
            // Back to idle without a match: the sequence was abandoned
            Phase::Idle if event.is_none() => {
                saw_fall = false;
                saw_rise = false;
            }
            Phase::Idle => {}
        }

        if let Some(event) = event {
            assert!(saw_fall && saw_rise, "match at {:?} skipped a phase", event.completed_at);
            assert!(event.duration() <= detector.config().max_window());
            saw_fall = false;
            saw_rise = false;
            matches += 1;
        }
    }

    assert!(matches > 0, "synthetic trace should contain gestures");
    assert_eq!(detector.stats().matches, matches);
}

#[test]
fn test_cooldown_spaces_out_matches() {
    let config = GestureConfig::new(
        250.0,
        30.0,
        Duration::from_secs(3),
        Duration::from_secs(2),
    )
    .unwrap();
    let mut detector = GestureDetector::new(config);

    let events = run(&mut detector, &synthetic_trace(60, 50));
    assert!(!events.is_empty());
    for pair in events.windows(2) {
        assert!(pair[1].started_at >= pair[0].completed_at + Duration::from_secs(2));
    }
}

#[test]
fn test_sensor_glitches_do_not_complete_a_gesture() {
    let mut detector = GestureDetector::new(test_config());
    let events = run(
        &mut detector,
        &samples(&[
            (0.0, 300.0),
            (0.1, f64::NAN),
            (0.2, -50.0),
            (0.3, f64::INFINITY),
        ]),
    );

    assert!(events.is_empty());
    assert_eq!(detector.phase(), Phase::AwaitingFall);
    assert_eq!(detector.stats().ignored, 3);
}

#[test]
fn test_defaults_match_device_calibration() {
    let config = GestureConfig::default();
    assert!((config.high_threshold() - 250.0).abs() < f64::EPSILON);
    assert!((config.low_threshold() - 30.0).abs() < f64::EPSILON);
    assert_eq!(config.max_window(), Duration::from_secs(3));
    assert_eq!(config.cooldown(), Duration::from_secs(2));
}
