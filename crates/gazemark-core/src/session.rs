//! One display session: input handling, timing, motion and rendering for
//! a single frame at a time.
//!
//! Each call to [`Session::step`] runs the per-frame pipeline:
//!
//! 1. **Input**: quit inputs end the session, Space toggles pause, a
//!    primary click marks the in-flight pulse as observed.
//! 2. **Timer**: the [`EventTimer`] is brought up to `now`; transitions
//!    are logged and reported through the notification channel.
//! 3. **Motion**: the [`PathController`] advances one tick, but only in
//!    a recording phase and only while not paused. Pausing never stops
//!    the timer.
//! 4. **Render**: white background, marker bitmap, red centre dot, green
//!    pulse dot and phase overlays, then `present`.
//! 5. **Completion**: once the sweep completes, the final frame is held
//!    for the configured time and the session ends.
//!
//! [`Session::redraw`] repaints without stepping, for repaints that fall
//! between frames.
//!
//! The session owns its notification channel for its whole lifetime and
//! closes it in [`Session::close`].

use std::time::Duration;

use gazemark_types::{
    Bitmap, FrameSample, InputEvent, KeyCode, PhaseTransition, Point, PointerButton, Rgb,
    SessionEndReason, SessionId, Size, TimerPhase,
};
use tracing::{debug, info, trace, warn};

use crate::config::GazemarkConfig;
use crate::error::{ConfigurationError, RenderSurfaceError};
use crate::marker::{self, FiducialEncoder, MarkerError};
use crate::notify::NotificationChannel;
use crate::path::PathController;
use crate::surface::{RenderSurface, TextOverlay};
use crate::timer::{EventTimer, TimerSettings};

/// Line sent when the countdown ends.
pub const RECORDING_STARTED_LINE: &str = "Recording has started";

/// Radius of the centre and pulse dots, in pixels.
pub const DOT_RADIUS: f64 = 10.0;

const COUNTDOWN_FONT_PX: f32 = 100.0;
const MESSAGE_FONT_PX: f32 = 50.0;
/// How far above the screen centre the pause banner sits.
const PAUSE_BANNER_RISE: f64 = 500.0;

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configuration cannot produce a valid session.
    #[error("invalid configuration: {source}")]
    Configuration {
        /// The underlying configuration error.
        #[from]
        source: ConfigurationError,
    },

    /// The marker could not be generated.
    #[error("marker generation failed: {source}")]
    Marker {
        /// The underlying marker error.
        #[from]
        source: MarkerError,
    },
}

/// Whether the session keeps running after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep stepping.
    Continue,
    /// The session is over.
    Ended(SessionEndReason),
}

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Marker state on this frame.
    pub sample: FrameSample,
    /// Timer transitions that fired, in order.
    pub transitions: Vec<PhaseTransition>,
    /// Whether to continue.
    pub outcome: StepOutcome,
}

/// Per-session behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// How long the final frame stays up after the sweep completes.
    pub completion_hold: Duration,
    /// Whether to keep a per-frame trajectory.
    pub record_trajectory: bool,
    /// Most samples the trajectory keeps.
    pub max_trajectory_samples: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            completion_hold: Duration::from_secs(5),
            record_trajectory: true,
            max_trajectory_samples: 108_000,
        }
    }
}

/// A running display session.
#[derive(Debug)]
pub struct Session<N> {
    id: SessionId,
    path: PathController,
    timer: EventTimer,
    channel: N,
    marker: Bitmap,
    screen: Size,
    options: SessionOptions,
    paused: bool,
    frames: u64,
    completed_at: Option<Duration>,
    ended: Option<SessionEndReason>,
    trajectory: Vec<FrameSample>,
    notification_failures: u64,
    channel_closed: bool,
}

impl<N: NotificationChannel> Session<N> {
    /// Build a session from configuration.
    ///
    /// Generates the marker (twice, as a reproducibility check), derives
    /// the sweep bounds from `screen` and the marker size, and starts the
    /// countdown at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for any invalid setting or marker failure.
    pub fn new(
        config: &GazemarkConfig,
        screen: Size,
        encoder: &dyn FiducialEncoder,
        channel: N,
        start: Duration,
    ) -> Result<Self, SessionError> {
        if config.display.frame_rate == 0 {
            return Err(ConfigurationError::InvalidFrameRate.into());
        }
        let bitmap = marker::verify_deterministic(encoder, config.marker.id, config.marker.size)?;
        let path = PathController::new(
            &config.motion,
            screen,
            Size::new(bitmap.width(), bitmap.height()),
        )?;
        let timer = EventTimer::new(TimerSettings::from_config(&config.timer)?, start)?;
        let options = SessionOptions {
            completion_hold: config.motion.completion_hold(),
            record_trajectory: config.report.record_trajectory,
            max_trajectory_samples: config.report.max_trajectory_samples,
        };
        Ok(Self::from_parts(path, timer, bitmap, channel, screen, options))
    }

    /// Assemble a session from ready-made components.
    pub fn from_parts(
        path: PathController,
        timer: EventTimer,
        marker: Bitmap,
        channel: N,
        screen: Size,
        options: SessionOptions,
    ) -> Self {
        let id = SessionId::new();
        info!(
            session_id = %id,
            width = screen.width,
            height = screen.height,
            marker_px = marker.width(),
            "Session created"
        );
        Self {
            id,
            path,
            timer,
            channel,
            marker,
            screen,
            options,
            paused: false,
            frames: 0,
            completed_at: None,
            ended: None,
            trajectory: Vec::new(),
            notification_failures: 0,
            channel_closed: false,
        }
    }

    /// Run one frame at session time `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`RenderSurfaceError`] if drawing or presenting fails.
    /// The session is then over; callers end it with
    /// [`SessionEndReason::SurfaceFailure`].
    pub fn step(
        &mut self,
        now: Duration,
        events: &[InputEvent],
        surface: &mut dyn RenderSurface,
    ) -> Result<FrameReport, RenderSurfaceError> {
        if let Some(reason) = self.ended {
            return Ok(self.report(now, Vec::new(), StepOutcome::Ended(reason)));
        }

        // --- Input ---
        for event in events {
            if let Some(reason) = self.handle_input(*event) {
                return Ok(self.end(now, reason, Vec::new()));
            }
        }

        // --- Timer ---
        let transitions = self.timer.advance(now);
        for transition in &transitions {
            self.on_transition(transition);
        }

        // --- Motion ---
        if self.timer.phase().is_recording() && !self.paused && !self.path.is_completed() {
            self.path.advance();
            if self.path.is_completed() {
                self.completed_at = Some(now);
            }
        }

        // --- Render ---
        if let Err(err) = self.render(now, surface) {
            self.ended = Some(SessionEndReason::SurfaceFailure);
            return Err(err);
        }

        let sample = self.sample(now);
        if self.options.record_trajectory {
            self.record(sample);
        }
        self.frames = self.frames.saturating_add(1);

        // --- Completion hold ---
        if let Some(done) = self.completed_at
            && now >= done.saturating_add(self.options.completion_hold)
        {
            return Ok(self.end(now, SessionEndReason::PathCompleted, transitions));
        }

        Ok(FrameReport {
            sample,
            transitions,
            outcome: StepOutcome::Continue,
        })
    }

    /// Repaint the current state at session time `now` without running
    /// input, timer or motion. For toolkits that repaint between frames.
    ///
    /// # Errors
    ///
    /// Returns the [`RenderSurfaceError`] if drawing or presenting fails.
    pub fn redraw(
        &self,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), RenderSurfaceError> {
        self.render(now, surface)
    }

    /// Mark the session as ended for an external reason (frame limit,
    /// surface failure). Later steps report the same reason.
    pub fn stop(&mut self, reason: SessionEndReason) {
        if self.ended.is_none() {
            info!(session_id = %self.id, reason = ?reason, "Session stopped");
            self.ended = Some(reason);
        }
    }

    /// Close the notification channel. Idempotent.
    pub fn close(&mut self) {
        if !self.channel_closed {
            self.channel.close();
            self.channel_closed = true;
        }
    }

    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Why the session ended, if it has.
    pub const fn end_reason(&self) -> Option<SessionEndReason> {
        self.ended
    }

    /// Whether the sweep is paused.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Frames rendered so far.
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// The path controller.
    pub const fn path(&self) -> &PathController {
        &self.path
    }

    /// The event timer.
    pub const fn timer(&self) -> &EventTimer {
        &self.timer
    }

    /// The marker bitmap.
    pub const fn marker(&self) -> &Bitmap {
        &self.marker
    }

    /// Surface size captured at session start.
    pub const fn screen(&self) -> Size {
        self.screen
    }

    /// The notification channel.
    pub const fn channel(&self) -> &N {
        &self.channel
    }

    /// Notifications that failed and were dropped.
    pub const fn notification_failures(&self) -> u64 {
        self.notification_failures
    }

    /// Recorded per-frame samples.
    pub fn trajectory(&self) -> &[FrameSample] {
        &self.trajectory
    }

    /// Move the recorded trajectory out of the session.
    pub fn take_trajectory(&mut self) -> Vec<FrameSample> {
        std::mem::take(&mut self.trajectory)
    }

    fn handle_input(&mut self, event: InputEvent) -> Option<SessionEndReason> {
        match event {
            InputEvent::Quit
            | InputEvent::KeyDown(KeyCode::Escape)
            | InputEvent::PointerDown(PointerButton::Secondary) => {
                info!(session_id = %self.id, event = ?event, "Quit requested");
                return Some(SessionEndReason::Quit);
            }
            InputEvent::KeyDown(KeyCode::Space) => {
                self.paused = !self.paused;
                info!(paused = self.paused, "Sweep pause toggled");
            }
            InputEvent::PointerDown(PointerButton::Primary) => {
                if self.timer.mark_observed() {
                    info!(
                        sequence_number = self.timer.active_pulse(),
                        "Pulse observed"
                    );
                }
            }
            other => debug!(event = ?other, "Input ignored"),
        }
        None
    }

    fn on_transition(&mut self, transition: &PhaseTransition) {
        match transition {
            PhaseTransition::EnteredCountdown => {
                info!(session_id = %self.id, "Countdown started");
            }
            PhaseTransition::EnteredStartupDelay => {
                info!(session_id = %self.id, "Recording has started");
                self.notify(RECORDING_STARTED_LINE);
            }
            PhaseTransition::EnteredIdle => {
                info!(session_id = %self.id, "Pulse schedule running");
            }
            PhaseTransition::EnteredPulse { sequence_number } => {
                info!(sequence_number, "Pulse started");
            }
            PhaseTransition::ExitedPulse { record } => {
                info!(
                    sequence_number = record.sequence_number,
                    observed = record.observed,
                    "Pulse ended"
                );
                self.notify(&record.summary_line());
            }
        }
    }

    fn notify(&mut self, line: &str) {
        if let Err(err) = self.channel.send_line(line) {
            self.notification_failures = self.notification_failures.saturating_add(1);
            warn!(error = %err, line, "Notification failed; continuing");
        }
    }

    fn render(
        &self,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), RenderSurfaceError> {
        let position = self.path.current_position();
        let center = self
            .path
            .center(Size::new(self.marker.width(), self.marker.height()));

        surface.clear(Rgb::WHITE)?;
        surface.draw_bitmap(&self.marker, position)?;
        surface.draw_filled_circle(center, DOT_RADIUS, Rgb::RED)?;
        if self.timer.phase() == TimerPhase::PulseActive {
            surface.draw_filled_circle(center, DOT_RADIUS, Rgb::GREEN)?;
        }

        let screen_center = Point::new(
            f64::from(self.screen.width) / 2.0,
            f64::from(self.screen.height) / 2.0,
        );
        if self.paused {
            let rise = PAUSE_BANNER_RISE.min(screen_center.y / 2.0);
            surface.draw_text(&TextOverlay {
                text: "Paused - Press 'Space' to Resume".to_owned(),
                center: screen_center.offset(0.0, -rise),
                font_px: MESSAGE_FONT_PX,
                color: Rgb::RED,
            })?;
        }
        match self.timer.phase() {
            TimerPhase::Countdown => surface.draw_text(&TextOverlay {
                text: format!(
                    "Recording starts in {}",
                    self.timer.seconds_remaining(now)
                ),
                center: screen_center,
                font_px: COUNTDOWN_FONT_PX,
                color: Rgb::BLACK,
            })?,
            TimerPhase::StartupDelay => surface.draw_text(&TextOverlay {
                text: format!(
                    "Starting in {} seconds...",
                    self.timer.time_remaining(now).as_secs()
                ),
                center: screen_center,
                font_px: MESSAGE_FONT_PX,
                color: Rgb::BLACK,
            })?,
            TimerPhase::Idle | TimerPhase::PulseActive => {}
        }

        surface.present()?;
        trace!(frame = self.frames, x = position.x, y = position.y, "Frame presented");
        Ok(())
    }

    fn record(&mut self, sample: FrameSample) {
        let limit = self.options.max_trajectory_samples;
        if self.trajectory.len() >= limit {
            return;
        }
        self.trajectory.push(sample);
        if self.trajectory.len() == limit {
            warn!(
                session_id = %self.id,
                samples = limit,
                "Trajectory limit reached; later frames are not recorded"
            );
        }
    }

    fn sample(&self, now: Duration) -> FrameSample {
        FrameSample {
            frame: self.frames,
            at: now,
            position: self.path.current_position(),
            phase: self.timer.phase(),
            paused: self.paused,
        }
    }

    fn end(
        &mut self,
        now: Duration,
        reason: SessionEndReason,
        transitions: Vec<PhaseTransition>,
    ) -> FrameReport {
        self.ended = Some(reason);
        info!(
            session_id = %self.id,
            reason = ?reason,
            frames = self.frames,
            pulses = self.timer.pulses().len(),
            "Session ending"
        );
        self.report(now, transitions, StepOutcome::Ended(reason))
    }

    fn report(
        &self,
        now: Duration,
        transitions: Vec<PhaseTransition>,
        outcome: StepOutcome,
    ) -> FrameReport {
        FrameReport {
            sample: self.sample(now),
            transitions,
            outcome,
        }
    }
}
