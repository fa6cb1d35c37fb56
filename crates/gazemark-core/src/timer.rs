//! Phased event timer.
//!
//! ```text
//! COUNTDOWN --countdown--> STARTUP_DELAY --startup_delay--> IDLE
//! IDLE --pulse_interval--> PULSE_ACTIVE --pulse_duration--> IDLE
//! ```
//!
//! Every phase boundary is an absolute deadline computed from the
//! previous boundary, never from the instant `advance` happened to be
//! called. After a stall (suspend, debugger, slow frame) a single
//! [`EventTimer::advance`] call replays every boundary that passed, in
//! order, and the schedule stays exactly where it would have been.
//!
//! The timer is pure: it never reads the clock and never performs I/O.

use std::time::Duration;

use gazemark_types::{PhaseTransition, PulseRecord, TimerPhase};

use crate::config::TimerConfig;
use crate::error::ConfigurationError;

/// Immutable phase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    /// Length of the visible countdown.
    pub countdown: Duration,
    /// Delay between recording start and the pulse schedule.
    pub startup_delay: Duration,
    /// Idle time before each pulse.
    pub pulse_interval: Duration,
    /// Length of each pulse.
    pub pulse_duration: Duration,
}

impl TimerSettings {
    /// Validate and convert the millisecond configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveDuration`] naming the first
    /// zero duration.
    pub fn from_config(config: &TimerConfig) -> Result<Self, ConfigurationError> {
        let settings = Self {
            countdown: Duration::from_millis(config.countdown_ms),
            startup_delay: Duration::from_millis(config.startup_delay_ms),
            pulse_interval: Duration::from_millis(config.pulse_interval_ms),
            pulse_duration: Duration::from_millis(config.pulse_duration_ms),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check that every duration is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveDuration`].
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("countdown", self.countdown),
            ("startup_delay", self.startup_delay),
            ("pulse_interval", self.pulse_interval),
            ("pulse_duration", self.pulse_duration),
        ] {
            if value.is_zero() {
                return Err(ConfigurationError::NonPositiveDuration { name, value });
            }
        }
        Ok(())
    }
}

/// The pulse currently being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightPulse {
    sequence_number: u64,
    started_at: Duration,
    observed: bool,
}

/// State machine driving countdown, startup delay and periodic pulses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTimer {
    settings: TimerSettings,
    phase: TimerPhase,
    phase_started_at: Duration,
    announced: bool,
    next_pulse_at: Option<Duration>,
    last_sequence: u64,
    in_flight: Option<InFlightPulse>,
    pulses: Vec<PulseRecord>,
}

impl EventTimer {
    /// Create a timer whose countdown starts at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveDuration`] if any phase
    /// length is zero.
    pub fn new(settings: TimerSettings, start: Duration) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self {
            settings,
            phase: TimerPhase::Countdown,
            phase_started_at: start,
            announced: false,
            next_pulse_at: None,
            last_sequence: 0,
            in_flight: None,
            pulses: Vec::new(),
        })
    }

    /// Bring the timer up to `now` and return every transition that fired,
    /// in order. The first call also reports
    /// [`PhaseTransition::EnteredCountdown`].
    ///
    /// Calls with a `now` earlier than the current phase start are no-ops.
    pub fn advance(&mut self, now: Duration) -> Vec<PhaseTransition> {
        let mut fired = Vec::new();
        if !self.announced {
            self.announced = true;
            fired.push(PhaseTransition::EnteredCountdown);
        }

        while let Some(deadline) = self.current_deadline() {
            if now < deadline {
                break;
            }
            fired.push(self.cross_boundary(deadline));
        }

        fired
    }

    /// Mark the in-flight pulse as observed.
    ///
    /// Returns `true` only for the first mark of a pulse. Outside
    /// `PULSE_ACTIVE`, or when already marked, nothing changes.
    pub fn mark_observed(&mut self) -> bool {
        match self.in_flight.as_mut() {
            Some(pulse) if !pulse.observed => {
                pulse.observed = true;
                true
            }
            _ => false,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Scheduled instant the current phase began.
    pub const fn phase_started_at(&self) -> Duration {
        self.phase_started_at
    }

    /// The phase lengths.
    pub const fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Sequence number of the in-flight pulse, if one is active.
    pub fn active_pulse(&self) -> Option<u64> {
        self.in_flight.map(|pulse| pulse.sequence_number)
    }

    /// Whether the in-flight pulse has been observed.
    pub fn active_pulse_observed(&self) -> bool {
        self.in_flight.is_some_and(|pulse| pulse.observed)
    }

    /// Completed pulses, oldest first.
    pub fn pulses(&self) -> &[PulseRecord] {
        &self.pulses
    }

    /// Consume the timer and return the pulse log.
    pub fn into_pulses(self) -> Vec<PulseRecord> {
        self.pulses
    }

    /// When the current phase is scheduled to end, or `None` if the
    /// schedule has run past the representable range.
    pub fn current_deadline(&self) -> Option<Duration> {
        let started = self.phase_started_at;
        match self.phase {
            TimerPhase::Countdown => started.checked_add(self.settings.countdown),
            TimerPhase::StartupDelay => started.checked_add(self.settings.startup_delay),
            TimerPhase::Idle => self.next_pulse_at,
            TimerPhase::PulseActive => started.checked_add(self.settings.pulse_duration),
        }
    }

    /// Time left in the current phase (zero once the deadline passed or
    /// if there is none).
    pub fn time_remaining(&self, now: Duration) -> Duration {
        self.current_deadline()
            .map_or(Duration::ZERO, |deadline| deadline.saturating_sub(now))
    }

    /// Whole seconds left in the current phase, rounded up.
    pub fn seconds_remaining(&self, now: Duration) -> u64 {
        let left = self.time_remaining(now);
        let whole = left.as_secs();
        if left.subsec_nanos() > 0 {
            whole.saturating_add(1)
        } else {
            whole
        }
    }

    fn cross_boundary(&mut self, at: Duration) -> PhaseTransition {
        self.phase_started_at = at;
        match self.phase {
            TimerPhase::Countdown => {
                self.phase = TimerPhase::StartupDelay;
                PhaseTransition::EnteredStartupDelay
            }
            TimerPhase::StartupDelay => {
                self.enter_idle(at);
                PhaseTransition::EnteredIdle
            }
            TimerPhase::Idle => {
                self.last_sequence = self.last_sequence.saturating_add(1);
                self.in_flight = Some(InFlightPulse {
                    sequence_number: self.last_sequence,
                    started_at: at,
                    observed: false,
                });
                self.phase = TimerPhase::PulseActive;
                PhaseTransition::EnteredPulse {
                    sequence_number: self.last_sequence,
                }
            }
            TimerPhase::PulseActive => {
                let pulse = self.in_flight.take().unwrap_or(InFlightPulse {
                    sequence_number: self.last_sequence,
                    started_at: at,
                    observed: false,
                });
                let record = PulseRecord {
                    sequence_number: pulse.sequence_number,
                    observed: pulse.observed,
                    started_at: pulse.started_at,
                    ended_at: at,
                };
                self.pulses.push(record.clone());
                self.enter_idle(at);
                PhaseTransition::ExitedPulse { record }
            }
        }
    }

    fn enter_idle(&mut self, at: Duration) {
        self.phase = TimerPhase::Idle;
        self.next_pulse_at = at.checked_add(self.settings.pulse_interval);
    }
}
