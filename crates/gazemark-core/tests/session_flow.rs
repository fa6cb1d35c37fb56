//! End-to-end scenarios through the public API: the reference sweep, the
//! reference pulse schedule, and a complete headless session.

#![allow(
    clippy::unwrap_used,
    clippy::unreachable,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::time::Duration;

use gazemark_core::clock::ManualClock;
use gazemark_core::config::GazemarkConfig;
use gazemark_core::framebuffer::FrameBufferSurface;
use gazemark_core::marker::GridMarkerEncoder;
use gazemark_core::notify::MemoryChannel;
use gazemark_core::path::{MotionPolicy, PathController, RasterScan};
use gazemark_core::report::SessionReport;
use gazemark_core::runner::{NoOpCallback, RunOptions, log_session_end, run_session};
use gazemark_core::session::Session;
use gazemark_core::surface::ScriptedInput;
use gazemark_core::timer::{EventTimer, TimerSettings};
use gazemark_types::{
    ActiveAxis, Axis, Bounds, Direction, InputEvent, KeyCode, PhaseTransition, Point,
    PointerButton, Rgb, SessionEndReason, TimerPhase,
};

fn small_config() -> GazemarkConfig {
    let mut config = GazemarkConfig::default();
    config.display.width = 400;
    config.display.height = 300;
    config.marker.size = 60;
    config
}

fn session(config: &GazemarkConfig) -> Session<MemoryChannel> {
    Session::new(
        config,
        config.display.size(),
        &GridMarkerEncoder::new(),
        MemoryChannel::new(),
        Duration::ZERO,
    )
    .unwrap()
}

fn raster_direction(ctrl: &PathController) -> Direction {
    match ctrl.policy() {
        MotionPolicy::RasterScan(scan) => scan.direction(),
        MotionPolicy::ElasticBounce(_) => unreachable!("raster controller expected"),
    }
}

#[test]
fn reference_sweep_turns_after_one_grid_step() {
    let bounds = Bounds {
        left: 30.0,
        right: 3380.0,
        top: 50.0,
        bottom: 1320.0,
    };
    let policy = MotionPolicy::RasterScan(RasterScan::new(Axis::X, 30.0, 30.0, 100.0).unwrap());
    let mut ctrl = PathController::with_bounds(policy, bounds, Point::new(30.0, 50.0)).unwrap();

    while ctrl.active_axis() == ActiveAxis::X {
        ctrl.advance();
    }
    assert_eq!(ctrl.current_position(), Point::new(3380.0, 50.0));

    let mut cross_ticks = 0;
    while ctrl.active_axis() == ActiveAxis::Y {
        ctrl.advance();
        cross_ticks += 1;
    }
    assert_eq!(cross_ticks, 4);
    assert_eq!(ctrl.current_position(), Point::new(3380.0, 170.0));
    assert_eq!(raster_direction(&ctrl), Direction::Decreasing);

    ctrl.advance();
    assert_eq!(ctrl.current_position(), Point::new(3350.0, 170.0));
    assert!(!ctrl.is_completed());
}

#[test]
fn reference_pulse_schedule() {
    let mut timer = EventTimer::new(
        TimerSettings::from_config(&GazemarkConfig::default().timer).unwrap(),
        Duration::ZERO,
    )
    .unwrap();

    timer.advance(Duration::ZERO);
    assert_eq!(timer.phase(), TimerPhase::Countdown);
    assert_eq!(timer.seconds_remaining(Duration::from_millis(500)), 3);

    timer.advance(Duration::from_secs(3));
    assert_eq!(timer.phase(), TimerPhase::StartupDelay);
    timer.advance(Duration::from_secs(6));
    assert_eq!(timer.phase(), TimerPhase::Idle);

    let entered = timer.advance(Duration::from_secs(9));
    assert_eq!(entered, [PhaseTransition::EnteredPulse { sequence_number: 1 }]);
    assert!(timer.mark_observed());

    let exited = timer.advance(Duration::from_secs(10));
    let record = exited
        .iter()
        .find_map(|t| match t {
            PhaseTransition::ExitedPulse { record } => Some(record.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(record.summary_line(), "Pulse 1: user is LOOKING");
    assert_eq!(timer.phase(), TimerPhase::Idle);

    timer.advance(Duration::from_secs(13));
    assert_eq!(timer.active_pulse(), Some(2));
}

#[test]
fn headless_session_records_observed_pulse() {
    let config = small_config();
    let mut s = session(&config);
    let mut clock = ManualClock::new();
    let mut fb = FrameBufferSurface::new(config.display.size());
    // At 30 fps poll 280 is ~9.33s, inside the first pulse.
    let mut input = ScriptedInput::new(vec![
        (280, InputEvent::PointerDown(PointerButton::Primary)),
        (290, InputEvent::PointerDown(PointerButton::Primary)),
    ]);

    let result = run_session(
        &mut s,
        &mut clock,
        &mut input,
        &mut fb,
        &RunOptions::from_rate(config.display.frame_rate, 0),
        &mut NoOpCallback,
    );
    log_session_end(&result);

    assert_eq!(result.end_reason, SessionEndReason::PathCompleted);
    assert_eq!(input.remaining(), 0);
    assert_eq!(result.pulses.len(), 1);
    assert!(result.pulses.iter().all(|p| p.observed));
    assert_eq!(
        s.channel().lines(),
        [
            "Recording has started".to_owned(),
            "Pulse 1: user is LOOKING".to_owned()
        ]
    );
    assert!(s.channel().is_closed());

    // Red dot at the centre of the marker's final position.
    assert_eq!(result.final_position, Point::new(310.0, 210.0));
    assert_eq!(fb.pixel(340, 240), Some(Rgb::RED));

    let dir = std::env::temp_dir();
    let snapshot = dir.join(format!("gazemark-flow-{}.png", std::process::id()));
    fb.save_png(&snapshot).unwrap();
    assert!(snapshot.exists());

    let report_path = dir.join(format!("gazemark-flow-{}.json", std::process::id()));
    let report = SessionReport::from_result(&result);
    report.write_to(&report_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["end_reason"], "path_completed");
    assert_eq!(json["pulses"][0]["observed"], true);
    assert_eq!(json["pulses"][0]["started_at_ms"], 9_000);

    let _ = std::fs::remove_file(&snapshot);
    let _ = std::fs::remove_file(&report_path);
}

#[test]
fn pause_freezes_marker_but_not_timer() {
    let config = small_config();
    let mut s = session(&config);
    let mut clock = ManualClock::new();
    let mut fb = FrameBufferSurface::new(config.display.size());
    // Pause at ~6.17s (just after motion starts), resume at ~8.33s.
    let mut input = ScriptedInput::new(vec![
        (185, InputEvent::KeyDown(KeyCode::Space)),
        (250, InputEvent::KeyDown(KeyCode::Space)),
    ]);

    let result = run_session(
        &mut s,
        &mut clock,
        &mut input,
        &mut fb,
        &RunOptions::from_rate(config.display.frame_rate, 0),
        &mut NoOpCallback,
    );

    let paused: Vec<_> = result.trajectory.iter().filter(|f| f.paused).collect();
    assert_eq!(paused.len(), 65);
    let frozen = result
        .trajectory
        .iter()
        .find(|f| f.frame == 184)
        .unwrap()
        .position;
    assert!(paused.iter().all(|f| f.position == frozen));
    // The timer kept running while paused.
    assert_eq!(paused.first().unwrap().phase, TimerPhase::Idle);

    // The sweep still finishes once resumed.
    assert_eq!(result.end_reason, SessionEndReason::PathCompleted);
    assert!(result.path_completed);
}

#[test]
fn escape_quits_during_countdown() {
    let config = small_config();
    let mut s = session(&config);
    let mut clock = ManualClock::new();
    let mut fb = FrameBufferSurface::new(config.display.size());
    let mut input = ScriptedInput::new(vec![(10, InputEvent::KeyDown(KeyCode::Escape))]);

    let result = run_session(
        &mut s,
        &mut clock,
        &mut input,
        &mut fb,
        &RunOptions::from_rate(config.display.frame_rate, 0),
        &mut NoOpCallback,
    );

    assert_eq!(result.end_reason, SessionEndReason::Quit);
    assert_eq!(result.frames, 10);
    assert!(result.pulses.is_empty());
    assert!(s.channel().lines().is_empty());
    assert!(s.channel().is_closed());
}
