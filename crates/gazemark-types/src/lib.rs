//! Shared type definitions for the gazemark marker display.
//!
//! Plain data only: the motion and timing logic lives in `gazemark-core`,
//! the window in `gazemark-display`. Everything here derives serde so it
//! can be written into session reports.
//!
//! # Modules
//!
//! - [`ids`] -- UUID-backed session identifier
//! - [`enums`] -- Axes, directions, timer phases, input keys, end reasons
//! - [`geometry`] -- Points, sizes, padding and sweep bounds
//! - [`structs`] -- Pulse records, phase transitions, input events, bitmaps

pub mod enums;
pub mod geometry;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ActiveAxis, Axis, Direction, KeyCode, PointerButton, SessionEndReason, TimerPhase,
};
pub use geometry::{Bounds, Padding, Point, Size};
pub use ids::SessionId;
pub use structs::{Bitmap, FrameSample, InputEvent, PhaseTransition, PulseRecord, Rgb};
