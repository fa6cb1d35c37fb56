//! Error types for the display binary.
//!
//! [`DisplayError`] is the top-level error type that wraps every failure
//! mode during startup, the headless loop and window creation.

/// Top-level error for the display binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gazemark_core::config::ConfigError,
    },

    /// The session could not be constructed.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: gazemark_core::session::SessionError,
    },

    /// Marker generation or export failed.
    #[error("marker error: {source}")]
    Marker {
        /// The underlying marker error.
        #[from]
        source: gazemark_core::marker::MarkerError,
    },

    /// The session report could not be written.
    #[error("report error: {source}")]
    Report {
        /// The underlying report error.
        #[from]
        source: gazemark_core::report::ReportError,
    },

    /// The headless frame buffer could not be saved.
    #[error("surface error: {source}")]
    Surface {
        /// The underlying surface error.
        #[from]
        source: gazemark_core::error::RenderSurfaceError,
    },

    /// The native window could not be created or crashed.
    #[error("window error: {message}")]
    Window {
        /// Description of the windowing failure.
        message: String,
    },
}
