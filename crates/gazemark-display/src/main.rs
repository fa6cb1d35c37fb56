//! Full-screen fiducial marker sweep display.
//!
//! Wires the core session to a native window (or to an in-memory frame
//! buffer when `display.headless` is set) and a TCP notification channel.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `gazemark-config.yaml` (or the path given
//!    as the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Export the marker PNG if `marker.export_path` is set
//! 4. Build the notification channel
//! 5. Build the session (marker, sweep bounds, timer)
//! 6. Run the window, or the headless loop
//! 7. Log the result and write the session report

mod app;
mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use gazemark_core::clock::MonotonicClock;
use gazemark_core::config::GazemarkConfig;
use gazemark_core::framebuffer::FrameBufferSurface;
use gazemark_core::marker::{self, FiducialEncoder, GridMarkerEncoder};
use gazemark_core::notify::{NotificationChannel, NullChannel, TcpChannel};
use gazemark_core::report::SessionReport;
use gazemark_core::runner::{self, NoOpCallback, RunOptions};
use gazemark_core::session::Session;
use gazemark_core::surface::NoInput;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::GazemarkApp;
use crate::error::DisplayError;

const DEFAULT_CONFIG_PATH: &str = "gazemark-config.yaml";

/// Application entry point for the display.
///
/// # Errors
///
/// Returns an error if configuration, marker generation, session setup,
/// the window, or report writing fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        path = %config_path.display(),
        width = config.display.width,
        height = config.display.height,
        policy = ?config.motion.policy,
        headless = config.display.headless,
        "gazemark-display starting"
    );

    // 3. Marker export.
    let encoder = GridMarkerEncoder::new();
    if let Some(path) = &config.marker.export_path {
        let bitmap = encoder.generate(config.marker.id, config.marker.size)?;
        marker::export_png(&bitmap, path)?;
    }

    // 4. Notification channel.
    let channel: Box<dyn NotificationChannel> = if config.notify.enabled {
        info!(address = %config.notify.address, "Notifications enabled");
        Box::new(TcpChannel::from_config(&config.notify))
    } else {
        info!("Notifications disabled");
        Box::new(NullChannel)
    };

    // 5. Session.
    let screen = config.display.size();
    let mut session = Session::new(&config, screen, &encoder, channel, Duration::ZERO)
        .map_err(DisplayError::from)?;

    // 6. Run.
    if config.display.headless {
        run_headless(&config, &mut session)?;
    } else {
        run_windowed(&config, session)?;
    }

    info!("gazemark-display shutdown complete");
    Ok(())
}

/// Load configuration, falling back to defaults if the file is missing.
fn load_config(path: &Path) -> Result<GazemarkConfig, DisplayError> {
    if path.exists() {
        Ok(GazemarkConfig::from_file(path)?)
    } else {
        // Defaults still take the environment overrides.
        Ok(GazemarkConfig::parse("")?)
    }
}

/// Run the session on an in-memory frame buffer with no input.
fn run_headless(
    config: &GazemarkConfig,
    session: &mut Session<Box<dyn NotificationChannel>>,
) -> Result<(), DisplayError> {
    let mut surface = FrameBufferSurface::new(config.display.size());
    let mut clock = MonotonicClock::start();
    let options = RunOptions::from_rate(
        config.display.frame_rate,
        config.display.headless_max_frames,
    );

    let result = runner::run_session(
        session,
        &mut clock,
        &mut NoInput,
        &mut surface,
        &options,
        &mut NoOpCallback,
    );
    runner::log_session_end(&result);

    if let Some(path) = &config.report.snapshot_path {
        surface.save_png(path)?;
    }
    if let Some(path) = &config.report.path {
        SessionReport::from_result(&result).write_to(path)?;
    }
    Ok(())
}

/// Run the session in a native window until it ends.
fn run_windowed(
    config: &GazemarkConfig,
    session: Session<Box<dyn NotificationChannel>>,
) -> Result<(), DisplayError> {
    let display = &config.display;
    let frame_interval = display.frame_interval().unwrap_or(Duration::ZERO);
    let report_path = config.report.path.clone();

    let viewport = egui::ViewportBuilder::default()
        .with_title(display.title.clone())
        .with_inner_size([points(display.width), points(display.height)])
        .with_fullscreen(display.fullscreen);
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    info!(
        title = %config.display.title,
        fullscreen = config.display.fullscreen,
        "Opening display window"
    );
    eframe::run_native(
        &display.title,
        options,
        Box::new(move |_cc| {
            // The session clock starts when the window exists.
            Ok(Box::new(GazemarkApp::new(
                session,
                MonotonicClock::start(),
                frame_interval,
                report_path,
            )))
        }),
    )
    .map_err(|e| DisplayError::Window {
        message: format!("{e}"),
    })
}

#[allow(clippy::cast_precision_loss)]
const fn points(px: u32) -> f32 {
    px as f32
}
