//! Sweep path controller, event timer, and frame loop for the gazemark
//! marker display.
//!
//! A session shows a fiducial marker that moves across the screen along
//! a deterministic path while a phased timer runs a countdown, a startup
//! delay and then periodic stimulus pulses. Everything here is
//! single-threaded and advanced once per rendered frame.
//!
//! # Modules
//!
//! - [`clock`] -- Session time source ([`Clock`]), monotonic and manual.
//! - [`config`] -- Configuration loading from `gazemark-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- Configuration, transport and render-surface errors.
//! - [`framebuffer`] -- In-memory render surface for headless runs.
//! - [`marker`] -- [`FiducialEncoder`] trait and the built-in grid marker.
//! - [`notify`] -- Lazily-connected notification channel.
//! - [`path`] -- [`PathController`] with raster-scan and bounce policies.
//! - [`report`] -- JSON session report.
//! - [`runner`] -- Frame loop with pacing and clean shutdown.
//! - [`session`] -- The per-frame pipeline tying everything together.
//! - [`surface`] -- Render surface and input source interfaces.
//! - [`timer`] -- [`EventTimer`] phase state machine.
//!
//! [`Clock`]: clock::Clock
//! [`FiducialEncoder`]: marker::FiducialEncoder
//! [`PathController`]: path::PathController
//! [`EventTimer`]: timer::EventTimer

pub mod clock;
pub mod config;
pub mod error;
pub mod framebuffer;
pub mod marker;
pub mod notify;
pub mod path;
pub mod report;
pub mod runner;
pub mod session;
pub mod surface;
pub mod timer;
