//! Session time source.
//!
//! All session timing is expressed as a [`Duration`] since the session
//! epoch (the moment the clock was created). The frame loop reads
//! [`Clock::now`] once per frame and sleeps with [`Clock::sleep_until`]
//! to hold the target cadence.
//!
//! [`MonotonicClock`] is backed by [`Instant`] and is what the binary
//! uses. [`ManualClock`] never reads the system clock: sleeping simply
//! moves its reading forward, which makes whole sessions reproducible in
//! tests.

use std::time::{Duration, Instant};

/// A monotonic, session-relative time source.
pub trait Clock {
    /// Time elapsed since the session epoch.
    fn now(&self) -> Duration;

    /// Block until `deadline` (session-relative). Returns immediately if
    /// the deadline has already passed.
    fn sleep_until(&mut self, deadline: Duration);
}

/// Wall-clock time source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Start a clock whose epoch is now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep_until(&mut self, deadline: Duration) {
        let remaining = deadline.saturating_sub(self.now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

/// Deterministic clock that only moves when told to.
///
/// `sleep_until` jumps straight to the deadline, so a frame loop driven
/// by this clock advances exactly one frame interval per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    /// A clock reading zero.
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set the reading. Moving backwards is ignored.
    pub fn set(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }

    /// Move the reading forward by `by`.
    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.saturating_add(by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep_until(&mut self, deadline: Duration) {
        self.set(deadline);
    }
}
