//! Frame loop runner.
//!
//! [`run_session`] drives a [`Session`] at a fixed cadence with an
//! injected [`Clock`], [`InputSource`] and [`RenderSurface`]:
//!
//! - **Frame pacing**: each frame is scheduled one interval after the
//!   previous one; a late frame resets the schedule instead of bursting
//!   to catch up.
//! - **Bounded runs**: an optional frame limit for headless use.
//! - **Clean shutdown**: a render failure ends the run like a quit, the
//!   notification channel is closed, and a [`SessionResult`] is returned.
//!
//! Window toolkits that own their own event loop keep a [`FramePacer`],
//! call [`Session::step`] only when a frame is due and
//! [`Session::redraw`] otherwise, and finish with [`finish_session`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use gazemark_types::{FrameSample, Point, PulseRecord, SessionEndReason, SessionId};
use tracing::{error, info};

use crate::clock::Clock;
use crate::notify::NotificationChannel;
use crate::session::{FrameReport, Session, StepOutcome};
use crate::surface::{InputSource, RenderSurface};

/// Loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Target time between frames.
    pub frame_interval: Duration,
    /// Stop after this many frames (`None` = unlimited).
    pub max_frames: Option<u64>,
}

impl RunOptions {
    /// Options for `frame_rate` frames per second and an optional limit
    /// (0 = unlimited).
    pub fn from_rate(frame_rate: u32, max_frames: u64) -> Self {
        Self {
            frame_interval: Duration::from_secs(1)
                .checked_div(frame_rate)
                .unwrap_or(Duration::ZERO),
            max_frames: (max_frames > 0).then_some(max_frames),
        }
    }
}

/// Fixed-cadence frame schedule.
///
/// Each frame is due one interval after the previous one. A late frame
/// pulls the schedule forward to `now` instead of bursting to catch up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    interval: Duration,
    next_frame: Duration,
}

impl FramePacer {
    /// A schedule whose first frame is due at `start`.
    pub const fn new(interval: Duration, start: Duration) -> Self {
        Self {
            interval,
            next_frame: start,
        }
    }

    /// Claim the frame due at `now`, if any, and schedule the next one.
    ///
    /// Returns `false` when called again before the next frame is due.
    pub fn begin_frame(&mut self, now: Duration) -> bool {
        if now < self.next_frame {
            return false;
        }
        self.next_frame = self.next_frame.saturating_add(self.interval);
        if self.next_frame < now {
            self.next_frame = now;
        }
        true
    }

    /// Session time at which the next frame is due.
    pub const fn next_frame(&self) -> Duration {
        self.next_frame
    }

    /// Time from `now` until the next frame.
    pub const fn until_next(&self, now: Duration) -> Duration {
        self.next_frame.saturating_sub(now)
    }
}

/// Result of a session run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    /// Session identifier.
    pub session_id: SessionId,
    /// Why the session ended.
    pub end_reason: SessionEndReason,
    /// Frames rendered.
    pub frames: u64,
    /// Completed pulses, oldest first.
    pub pulses: Vec<PulseRecord>,
    /// Per-frame samples (empty if recording was disabled).
    pub trajectory: Vec<FrameSample>,
    /// Marker position on the last frame.
    pub final_position: Point,
    /// Whether the sweep completed.
    pub path_completed: bool,
    /// Notifications that failed and were dropped.
    pub notification_failures: u64,
    /// Session-relative time at which the run ended.
    pub elapsed: Duration,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end of the run.
    pub ended_at: DateTime<Utc>,
}

/// Callback invoked after every frame.
pub trait FrameCallback {
    /// Called with the report of the frame that just ran.
    fn on_frame(&mut self, report: &FrameReport);
}

/// A no-op frame callback.
pub struct NoOpCallback;

impl FrameCallback for NoOpCallback {
    fn on_frame(&mut self, _report: &FrameReport) {}
}

/// Run `session` until it ends.
///
/// Always returns a [`SessionResult`]: render failures end the session
/// with [`SessionEndReason::SurfaceFailure`] rather than an error.
pub fn run_session<N: NotificationChannel>(
    session: &mut Session<N>,
    clock: &mut dyn Clock,
    input: &mut dyn InputSource,
    surface: &mut dyn RenderSurface,
    options: &RunOptions,
    callback: &mut dyn FrameCallback,
) -> SessionResult {
    let started_at = Utc::now();
    let mut pacer = FramePacer::new(options.frame_interval, clock.now());

    info!(
        session_id = %session.id(),
        frame_interval_ms = options.frame_interval.as_millis(),
        max_frames = options.max_frames,
        "Session starting"
    );

    loop {
        clock.sleep_until(pacer.next_frame());
        let now = clock.now();
        if !pacer.begin_frame(now) {
            continue;
        }
        let events = input.poll_events();

        let report = match session.step(now, &events, surface) {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, frame = session.frames(), "Render surface failed");
                session.stop(SessionEndReason::SurfaceFailure);
                break;
            }
        };
        callback.on_frame(&report);

        if matches!(report.outcome, StepOutcome::Ended(_)) {
            break;
        }

        if let Some(limit) = options.max_frames
            && session.frames() >= limit
        {
            info!(frames = session.frames(), limit, "Frame limit reached");
            session.stop(SessionEndReason::FrameLimitReached);
            break;
        }
    }

    finish_session(session, clock.now(), started_at)
}

/// Close `session` and collect its [`SessionResult`].
///
/// Toolkits that call [`Session::step`] from their own event loop use this
/// once the session has ended. A session that is still running is stopped
/// as [`SessionEndReason::Quit`].
pub fn finish_session<N: NotificationChannel>(
    session: &mut Session<N>,
    elapsed: Duration,
    started_at: DateTime<Utc>,
) -> SessionResult {
    session.stop(SessionEndReason::Quit);
    session.close();

    SessionResult {
        session_id: session.id(),
        end_reason: session.end_reason().unwrap_or(SessionEndReason::Quit),
        frames: session.frames(),
        pulses: session.timer().pulses().to_vec(),
        trajectory: session.take_trajectory(),
        final_position: session.path().current_position(),
        path_completed: session.path().is_completed(),
        notification_failures: session.notification_failures(),
        elapsed,
        started_at,
        ended_at: Utc::now(),
    }
}

/// Log the session end sequence.
pub fn log_session_end(result: &SessionResult) {
    let observed = result.pulses.iter().filter(|p| p.observed).count();
    info!(
        session_id = %result.session_id,
        reason = ?result.end_reason,
        frames = result.frames,
        pulses = result.pulses.len(),
        observed,
        path_completed = result.path_completed,
        notification_failures = result.notification_failures,
        elapsed_ms = result.elapsed.as_millis(),
        "Session ended"
    );
}
