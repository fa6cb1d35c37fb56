//! JSON session report.
//!
//! The report is what the external observer correlates against its own
//! recording: the time-stamped marker trajectory and the pulse log.
//! Times are milliseconds since the session epoch; wall-clock start and
//! end are RFC 3339 UTC.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gazemark_types::{Point, SessionEndReason, SessionId, TimerPhase};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::runner::SessionResult;

/// Errors that can occur when writing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The report could not be serialized.
    #[error("failed to serialize session report: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// The report file could not be written.
    #[error("failed to write session report: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// One completed pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseEntry {
    /// 1-based pulse number.
    pub sequence_number: u64,
    /// Whether the pulse was observed.
    pub observed: bool,
    /// Pulse start, ms since session start.
    pub started_at_ms: u64,
    /// Pulse end, ms since session start.
    pub ended_at_ms: u64,
}

/// Marker position on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// Frame number.
    pub frame: u64,
    /// Frame time, ms since session start.
    pub at_ms: u64,
    /// Marker top-left `x`.
    pub x: f64,
    /// Marker top-left `y`.
    pub y: f64,
    /// Timer phase.
    pub phase: TimerPhase,
    /// Whether the sweep was paused.
    pub paused: bool,
}

/// Serializable summary of a session run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Session identifier.
    pub session_id: SessionId,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub ended_at: DateTime<Utc>,
    /// Why the session ended.
    pub end_reason: SessionEndReason,
    /// Frames rendered.
    pub frames: u64,
    /// Session length in ms.
    pub elapsed_ms: u64,
    /// Whether the sweep completed.
    pub path_completed: bool,
    /// Final marker position.
    pub final_position: Point,
    /// Notifications dropped after a transport failure.
    pub notification_failures: u64,
    /// Pulse log, oldest first.
    pub pulses: Vec<PulseEntry>,
    /// Per-frame trajectory.
    pub trajectory: Vec<TrajectoryEntry>,
}

impl SessionReport {
    /// Build a report from a run result.
    pub fn from_result(result: &SessionResult) -> Self {
        Self {
            session_id: result.session_id,
            started_at: result.started_at,
            ended_at: result.ended_at,
            end_reason: result.end_reason,
            frames: result.frames,
            elapsed_ms: millis(result.elapsed),
            path_completed: result.path_completed,
            final_position: result.final_position,
            notification_failures: result.notification_failures,
            pulses: result
                .pulses
                .iter()
                .map(|p| PulseEntry {
                    sequence_number: p.sequence_number,
                    observed: p.observed,
                    started_at_ms: millis(p.started_at),
                    ended_at_ms: millis(p.ended_at),
                })
                .collect(),
            trajectory: result
                .trajectory
                .iter()
                .map(|s| TrajectoryEntry {
                    frame: s.frame,
                    at_ms: millis(s.at),
                    x: s.position.x,
                    y: s.position.y,
                    phase: s.phase,
                    paused: s.paused,
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `path` as JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        info!(
            path = %path.display(),
            pulses = self.pulses.len(),
            frames = self.frames,
            "Session report written"
        );
        Ok(())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gazemark_types::{FrameSample, PulseRecord};

    use super::*;

    fn result() -> SessionResult {
        let now = Utc::now();
        SessionResult {
            session_id: SessionId::new(),
            end_reason: SessionEndReason::PathCompleted,
            frames: 2,
            pulses: vec![PulseRecord {
                sequence_number: 1,
                observed: true,
                started_at: Duration::from_secs(9),
                ended_at: Duration::from_secs(10),
            }],
            trajectory: vec![FrameSample {
                frame: 0,
                at: Duration::from_millis(6_033),
                position: Point::new(60.0, 50.0),
                phase: TimerPhase::Idle,
                paused: false,
            }],
            final_position: Point::new(310.0, 210.0),
            path_completed: true,
            notification_failures: 0,
            elapsed: Duration::from_millis(12_345),
            started_at: now,
            ended_at: now,
        }
    }

    #[test]
    fn report_uses_milliseconds_and_snake_case() {
        let report = SessionReport::from_result(&result());
        assert_eq!(report.elapsed_ms, 12_345);
        assert_eq!(report.pulses.first().unwrap().started_at_ms, 9_000);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["end_reason"], "path_completed");
        assert_eq!(json["trajectory"][0]["phase"], "idle");
        assert_eq!(json["trajectory"][0]["at_ms"], 6_033);
        assert_eq!(json["pulses"][0]["observed"], true);
    }

    #[test]
    fn report_written_to_disk() {
        let report = SessionReport::from_result(&result());
        let path =
            std::env::temp_dir().join(format!("gazemark-report-{}.json", std::process::id()));
        report.write_to(&path).unwrap();
        let back: SessionReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.session_id, report.session_id);
        assert_eq!(back.trajectory, report.trajectory);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let report = SessionReport::from_result(&result());
        let err = report.write_to(Path::new("/nonexistent/dir/report.json"));
        assert!(matches!(err, Err(ReportError::Io { .. })));
    }
}
