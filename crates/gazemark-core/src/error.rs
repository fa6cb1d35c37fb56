//! Error taxonomy shared by the core components.
//!
//! - [`ConfigurationError`] is fatal and raised at construction time; it
//!   prevents a session from starting.
//! - [`TransportError`] is recoverable: a failed notification is logged
//!   and the session carries on.
//! - [`RenderSurfaceError`] is fatal for the running session; the frame
//!   loop ends the session cleanly when it sees one.

use std::time::Duration;

/// A configuration that cannot produce a valid session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// Screen size minus marker size minus padding leaves no room to move.
    #[error(
        "degenerate bounds on {axis:?}: screen {screen}px leaves no room for a {marker}px marker with {padding_low}+{padding_high}px padding"
    )]
    DegenerateBounds {
        /// Axis on which the bounds collapse.
        axis: gazemark_types::Axis,
        /// Screen extent along the axis.
        screen: u32,
        /// Marker extent along the axis.
        marker: u32,
        /// Padding before the marker on this axis.
        padding_low: u32,
        /// Padding after the marker on this axis.
        padding_high: u32,
    },

    /// A timer duration was zero.
    #[error("{name} must be positive, got {value:?}")]
    NonPositiveDuration {
        /// Name of the offending setting.
        name: &'static str,
        /// The configured value.
        value: Duration,
    },

    /// The marker has no area.
    #[error("marker size must be at least 1px, got {width}x{height}")]
    ZeroSizeMarker {
        /// Marker width.
        width: u32,
        /// Marker height.
        height: u32,
    },

    /// A per-tick speed is unusable for the selected policy (zero, not
    /// finite, or negative where only magnitudes are accepted).
    #[error("{name} is not a usable per-tick step, got {value}")]
    InvalidSpeed {
        /// Name of the offending setting.
        name: &'static str,
        /// The configured value.
        value: f64,
    },

    /// The raster cross-leg length was not positive.
    #[error("grid_size must be a positive finite number, got {value}")]
    InvalidGridSize {
        /// The configured value.
        value: f64,
    },

    /// A fixed start coordinate was NaN or infinite.
    #[error("start position must be finite, got ({x}, {y})")]
    InvalidStartPosition {
        /// Configured x.
        x: f64,
        /// Configured y.
        y: f64,
    },

    /// The target frame rate was zero.
    #[error("frame_rate must be at least 1")]
    InvalidFrameRate,

    /// The requested marker id is not in the codebook.
    #[error("marker id {id} is outside the codebook (0..{capacity})")]
    MarkerIdOutOfRange {
        /// Requested id.
        id: u32,
        /// Number of ids the codebook holds.
        capacity: usize,
    },
}

/// Failure of the outbound notification transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// Target address.
        address: String,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// The address did not resolve to any socket address.
    #[error("address {address} did not resolve")]
    Unresolved {
        /// Target address.
        address: String,
    },

    /// Writing the line failed.
    #[error("failed to write to {address}: {source}")]
    Write {
        /// Target address.
        address: String,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// The send queue is full; the line was dropped.
    #[error("notification queue for {address} is full ({capacity} lines)")]
    QueueFull {
        /// Target address.
        address: String,
        /// Queue capacity.
        capacity: usize,
    },

    /// The channel was closed at session end.
    #[error("notification channel is closed")]
    Closed,
}

/// Failure of the render surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderSurfaceError {
    /// The frame could not be presented.
    #[error("failed to present frame: {message}")]
    Present {
        /// Description of the failure.
        message: String,
    },

    /// A draw call failed.
    #[error("failed to draw: {message}")]
    Draw {
        /// Description of the failure.
        message: String,
    },
}
