//! Record and payload structs passed between the core and the display.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::enums::{KeyCode, PointerButton, TimerPhase};
use crate::geometry::Point;

// ---------------------------------------------------------------------------
// Timer output
// ---------------------------------------------------------------------------

/// Outcome of one completed stimulus pulse.
///
/// Appended to the pulse log when the pulse ends and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseRecord {
    /// 1-based pulse number.
    pub sequence_number: u64,
    /// Whether a qualifying input arrived while the pulse was active.
    pub observed: bool,
    /// Session-relative instant the pulse started.
    pub started_at: Duration,
    /// Session-relative instant the pulse ended.
    pub ended_at: Duration,
}

impl PulseRecord {
    /// Human-readable status used in notifications.
    pub const fn status_label(&self) -> &'static str {
        if self.observed { "LOOKING" } else { "NOT LOOKING" }
    }

    /// The summary line sent through the notification channel.
    pub fn summary_line(&self) -> String {
        format!(
            "Pulse {}: user is {}",
            self.sequence_number,
            self.status_label()
        )
    }
}

/// A phase change reported by the event timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseTransition {
    /// The countdown began (reported once, on the first advance).
    EnteredCountdown,
    /// The countdown elapsed; recording has started.
    EnteredStartupDelay,
    /// The startup delay elapsed; the pulse schedule is running.
    EnteredIdle,
    /// A pulse started.
    EnteredPulse {
        /// Sequence number of the new pulse.
        sequence_number: u64,
    },
    /// A pulse ended and the timer returned to idle.
    ExitedPulse {
        /// The finished pulse.
        record: PulseRecord,
    },
}

impl PhaseTransition {
    /// The phase the timer is in after this transition.
    pub const fn phase_after(&self) -> TimerPhase {
        match self {
            Self::EnteredCountdown => TimerPhase::Countdown,
            Self::EnteredStartupDelay => TimerPhase::StartupDelay,
            Self::EnteredIdle | Self::ExitedPulse { .. } => TimerPhase::Idle,
            Self::EnteredPulse { .. } => TimerPhase::PulseActive,
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A discrete input event delivered once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InputEvent {
    /// The window was closed or the process asked to quit.
    Quit,
    /// A key was pressed.
    KeyDown(KeyCode),
    /// A pointer button was pressed.
    PointerDown(PointerButton),
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Background colour.
    pub const WHITE: Self = Self(255, 255, 255);
    /// Overlay text colour.
    pub const BLACK: Self = Self(0, 0, 0);
    /// Centre dot colour.
    pub const RED: Self = Self(255, 0, 0);
    /// Pulse dot colour.
    pub const GREEN: Self = Self(0, 255, 0);
}

/// A square-or-rectangular 8-bit grayscale image, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Wrap raw row-major pixels.
    ///
    /// Returns `None` if `pixels.len() != width * height`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = usize::try_from(u64::from(width).checked_mul(u64::from(height))?).ok()?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw row-major pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Intensity at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = u64::from(y)
            .checked_mul(u64::from(self.width))?
            .checked_add(u64::from(x))?;
        let idx = usize::try_from(idx).ok()?;
        self.pixels.get(idx).copied()
    }

    /// Consume the bitmap and return its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

/// Where the marker was on one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// 0-based frame counter.
    pub frame: u64,
    /// Session-relative instant the frame was stepped.
    pub at: Duration,
    /// Marker top-left position drawn on this frame.
    pub position: Point,
    /// Timer phase during this frame.
    pub phase: TimerPhase,
    /// Whether the sweep was paused.
    pub paused: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_reports_status() {
        let record = PulseRecord {
            sequence_number: 3,
            observed: true,
            started_at: Duration::from_secs(9),
            ended_at: Duration::from_secs(10),
        };
        assert_eq!(record.summary_line(), "Pulse 3: user is LOOKING");

        let missed = PulseRecord {
            observed: false,
            ..record
        };
        assert_eq!(missed.summary_line(), "Pulse 3: user is NOT LOOKING");
    }

    #[test]
    fn bitmap_rejects_wrong_length() {
        assert!(Bitmap::from_raw(2, 2, vec![0; 3]).is_none());
        let bmp = Bitmap::from_raw(2, 2, vec![0, 1, 2, 3]).unwrap();
        assert_eq!(bmp.pixel(1, 1), Some(3));
        assert_eq!(bmp.pixel(2, 0), None);
    }

    #[test]
    fn bitmap_pixel_addresses_rows() {
        let bmp = Bitmap::from_raw(3, 2, (0..6).collect()).unwrap();
        assert_eq!(bmp.pixel(0, 1), Some(3));
        assert_eq!(bmp.pixel(2, 1), Some(5));
        assert_eq!(bmp.pixel(0, 2), None);
        assert_eq!(bmp.pixel(u32::MAX, u32::MAX), None);

        let empty = Bitmap::from_raw(0, 0, Vec::new()).unwrap();
        assert_eq!(empty.pixel(0, 0), None);
    }

    #[test]
    fn transition_reports_resulting_phase() {
        let exit = PhaseTransition::ExitedPulse {
            record: PulseRecord {
                sequence_number: 1,
                observed: false,
                started_at: Duration::ZERO,
                ended_at: Duration::from_secs(1),
            },
        };
        assert_eq!(exit.phase_after(), TimerPhase::Idle);
        assert_eq!(
            PhaseTransition::EnteredPulse { sequence_number: 1 }.phase_after(),
            TimerPhase::PulseActive
        );
    }
}
