//! Configuration loading and typed config structures for gazemark.
//!
//! The configuration lives in `gazemark-config.yaml` in the working
//! directory. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads the file. Every field
//! has a default, so an empty or missing file yields a working setup
//! (a 3440x1400 raster sweep with a 300px marker at 30 fps).
//!
//! Semantic validation (degenerate bounds, zero durations) is not done
//! here; the components reject bad values with a
//! [`ConfigurationError`](crate::error::ConfigurationError) when they are
//! constructed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gazemark_types::{Axis, Padding, Size};
use serde::Deserialize;

/// Environment variable that overrides [`NotifyConfig::address`].
pub const NOTIFY_ADDR_ENV: &str = "GAZEMARK_NOTIFY_ADDR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GazemarkConfig {
    /// Window and frame pacing.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Fiducial marker identity and size.
    #[serde(default)]
    pub marker: MarkerConfig,

    /// Sweep policy and its parameters.
    #[serde(default)]
    pub motion: MotionConfig,

    /// Countdown, startup delay and pulse schedule.
    #[serde(default)]
    pub timer: TimerConfig,

    /// Outbound notification channel.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session report output.
    #[serde(default)]
    pub report: ReportConfig,
}

impl GazemarkConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `GAZEMARK_NOTIFY_ADDR` overrides `notify.address` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse_raw(&contents)?;
        config.notify.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_raw(yaml)?;
        config.notify.apply_env_overrides();
        Ok(config)
    }

    fn parse_raw(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Window and frame pacing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisplayConfig {
    /// Surface width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Surface height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Whether to open the window full-screen.
    #[serde(default = "default_true")]
    pub fullscreen: bool,

    /// Target frames per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Window title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Run on an in-memory frame buffer instead of opening a window.
    #[serde(default)]
    pub headless: bool,

    /// Frame limit for headless runs (0 = unlimited).
    #[serde(default)]
    pub headless_max_frames: u64,
}

impl DisplayConfig {
    /// The surface size in pixels.
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Target interval between frames, or `None` when `frame_rate` is 0.
    pub const fn frame_interval(&self) -> Option<Duration> {
        Duration::from_secs(1).checked_div(self.frame_rate)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fullscreen: true,
            frame_rate: default_frame_rate(),
            title: default_title(),
            headless: false,
            headless_max_frames: 0,
        }
    }
}

/// Fiducial marker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerConfig {
    /// Codebook id of the marker to display.
    #[serde(default)]
    pub id: u32,

    /// Side length of the square marker in pixels.
    #[serde(default = "default_marker_size")]
    pub size: u32,

    /// Where to write the generated marker as PNG (optional).
    #[serde(default)]
    pub export_path: Option<PathBuf>,
}

impl MarkerConfig {
    /// The marker's on-screen size.
    pub const fn marker_size(&self) -> Size {
        Size::square(self.size)
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            id: 0,
            size: default_marker_size(),
            export_path: None,
        }
    }
}

/// Which movement policy the path controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPolicyKind {
    /// Boustrophedon sweep that ends at a terminal corner.
    #[default]
    RasterScan,
    /// Constant-velocity bounce off the padded edges, never completes.
    ElasticBounce,
}

/// Where the marker starts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StartPosition {
    /// The padded top-left corner `(left, top)`.
    #[default]
    PaddedOrigin,
    /// Uniformly random inside the bounds (seeded by `motion.seed`).
    Random,
    /// A fixed position, clamped into the bounds.
    Fixed {
        /// Requested `x`.
        x: f64,
        /// Requested `y`.
        y: f64,
    },
}

/// Sweep policy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MotionConfig {
    /// Movement policy.
    #[serde(default)]
    pub policy: MotionPolicyKind,

    /// Horizontal step per tick. Must be positive for the raster policy;
    /// its sign is the initial direction for the bounce policy.
    #[serde(default = "default_speed")]
    pub speed_x: f64,

    /// Vertical step per tick (same sign rules as `speed_x`).
    #[serde(default = "default_speed")]
    pub speed_y: f64,

    /// Length of each raster cross-axis leg.
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,

    /// Axis of the long raster legs (`x` = horizontal sweep).
    #[serde(default = "default_primary_axis")]
    pub primary_axis: Axis,

    /// Gap between the marker and the screen edges.
    #[serde(default)]
    pub padding: Padding,

    /// Initial placement.
    #[serde(default)]
    pub start: StartPosition,

    /// Seed for random placement.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// How long the final frame stays up after the sweep completes.
    #[serde(default = "default_completion_hold_ms")]
    pub completion_hold_ms: u64,
}

impl MotionConfig {
    /// The completion hold as a [`Duration`].
    pub const fn completion_hold(&self) -> Duration {
        Duration::from_millis(self.completion_hold_ms)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            policy: MotionPolicyKind::default(),
            speed_x: default_speed(),
            speed_y: default_speed(),
            grid_size: default_grid_size(),
            primary_axis: default_primary_axis(),
            padding: Padding::default(),
            start: StartPosition::default(),
            seed: default_seed(),
            completion_hold_ms: default_completion_hold_ms(),
        }
    }
}

/// Event timer configuration. All values in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimerConfig {
    /// Length of the visible countdown.
    #[serde(default = "default_phase_ms")]
    pub countdown_ms: u64,

    /// Delay between the end of the countdown and the pulse schedule.
    #[serde(default = "default_phase_ms")]
    pub startup_delay_ms: u64,

    /// Idle time before each pulse.
    #[serde(default = "default_phase_ms")]
    pub pulse_interval_ms: u64,

    /// How long each pulse is shown.
    #[serde(default = "default_pulse_duration_ms")]
    pub pulse_duration_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            countdown_ms: default_phase_ms(),
            startup_delay_ms: default_phase_ms(),
            pulse_interval_ms: default_phase_ms(),
            pulse_duration_ms: default_pulse_duration_ms(),
        }
    }
}

/// Notification channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifyConfig {
    /// Whether to send notifications at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `host:port` of the listener.
    #[serde(default = "default_notify_address")]
    pub address: String,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_socket_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Write timeout in milliseconds.
    #[serde(default = "default_socket_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl NotifyConfig {
    /// Override the address with `GAZEMARK_NOTIFY_ADDR` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(NOTIFY_ADDR_ENV) {
            self.address = val;
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_notify_address(),
            connect_timeout_ms: default_socket_timeout_ms(),
            write_timeout_ms: default_socket_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Session report configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportConfig {
    /// Where to write the JSON session report (optional).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Whether to keep a per-frame trajectory in the report.
    #[serde(default = "default_true")]
    pub record_trajectory: bool,

    /// Most trajectory samples kept; later frames are not recorded.
    #[serde(default = "default_max_trajectory_samples")]
    pub max_trajectory_samples: usize,

    /// Where a headless run saves its last frame as PNG (optional).
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: None,
            record_trajectory: true,
            max_trajectory_samples: default_max_trajectory_samples(),
            snapshot_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_width() -> u32 {
    3440
}

const fn default_height() -> u32 {
    1400
}

const fn default_frame_rate() -> u32 {
    30
}

fn default_title() -> String {
    "Fiducial Marker Sweep".to_owned()
}

const fn default_marker_size() -> u32 {
    300
}

const fn default_speed() -> f64 {
    30.0
}

const fn default_grid_size() -> f64 {
    100.0
}

const fn default_primary_axis() -> Axis {
    Axis::X
}

const fn default_seed() -> u64 {
    42
}

const fn default_completion_hold_ms() -> u64 {
    5_000
}

const fn default_phase_ms() -> u64 {
    3_000
}

const fn default_pulse_duration_ms() -> u64 {
    1_000
}

/// One hour at 30 fps.
const fn default_max_trajectory_samples() -> usize {
    108_000
}

fn default_notify_address() -> String {
    "127.0.0.1:65432".to_owned()
}

const fn default_socket_timeout_ms() -> u64 {
    200
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
