//! Enumeration types shared by the motion core and the display binary.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

/// A screen axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Horizontal axis, growing to the right.
    X,
    /// Vertical axis, growing downwards.
    Y,
}

impl Axis {
    /// The perpendicular axis.
    pub const fn cross(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

/// Which axis the raster sweep is currently advancing along.
///
/// `None` is only entered once the sweep has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveAxis {
    /// Advancing horizontally.
    X,
    /// Advancing vertically.
    Y,
    /// Not advancing.
    None,
}

impl From<Axis> for ActiveAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::X => Self::X,
            Axis::Y => Self::Y,
        }
    }
}

/// Direction of travel along a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Coordinate grows each tick (`+1`).
    Increasing,
    /// Coordinate shrinks each tick (`-1`).
    Decreasing,
}

impl Direction {
    /// The sign of this direction as a multiplier.
    pub const fn sign(self) -> f64 {
        match self {
            Self::Increasing => 1.0,
            Self::Decreasing => -1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Phase of the event timer.
///
/// The legal sequence is
/// `Countdown -> StartupDelay -> Idle -> (PulseActive <-> Idle)*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Visible countdown before recording starts.
    Countdown,
    /// Recording has started; waiting before the first stimulus schedule.
    StartupDelay,
    /// Between pulses.
    Idle,
    /// A stimulus pulse is being shown.
    PulseActive,
}

impl TimerPhase {
    /// Whether the marker should be moving in this phase.
    pub const fn is_recording(self) -> bool {
        matches!(self, Self::Idle | Self::PulseActive)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Keyboard keys the session cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    /// Escape: ends the session.
    Escape,
    /// Space bar: toggles pause.
    Space,
    /// A printable character key (lowercase).
    Char(char),
    /// Any other key.
    Other,
}

/// Pointer (mouse) buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    /// Left button: marks the in-flight pulse as observed.
    Primary,
    /// Right button: ends the session.
    Secondary,
    /// Middle button.
    Middle,
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Reason why a display session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// A quit input (window close, Escape, secondary click).
    Quit,
    /// The raster sweep reached its terminal corner.
    PathCompleted,
    /// The render surface could not present a frame.
    SurfaceFailure,
    /// The configured frame limit was reached (headless runs).
    FrameLimitReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_signs() {
        assert!(Direction::Increasing.sign() > 0.0);
        assert!(Direction::Decreasing.sign() < 0.0);
    }

    #[test]
    fn only_idle_and_pulse_are_recording() {
        assert!(!TimerPhase::Countdown.is_recording());
        assert!(!TimerPhase::StartupDelay.is_recording());
        assert!(TimerPhase::Idle.is_recording());
        assert!(TimerPhase::PulseActive.is_recording());
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&TimerPhase::PulseActive).ok();
        assert_eq!(json.as_deref(), Some("\"pulse_active\""));
    }
}
