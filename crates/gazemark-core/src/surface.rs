//! Render surface and input source interfaces.
//!
//! The session never talks to a window toolkit directly. It draws through
//! a [`RenderSurface`] and reads discrete events from an
//! [`InputSource`], both injected by the caller. The binary supplies an
//! egui-backed surface; tests and headless runs use
//! [`FrameBufferSurface`](crate::framebuffer::FrameBufferSurface).

use std::collections::VecDeque;

use gazemark_types::{Bitmap, InputEvent, Point, Rgb, Size};

use crate::error::RenderSurfaceError;

/// A line of text drawn centred on `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    /// Text to draw.
    pub text: String,
    /// Centre of the text box, in pixels.
    pub center: Point,
    /// Font height in pixels.
    pub font_px: f32,
    /// Text colour.
    pub color: Rgb,
}

/// Something frames can be drawn on.
///
/// Coordinates are pixels, origin top-left. The size is read once when
/// the session starts and assumed fixed for its lifetime.
pub trait RenderSurface {
    /// Surface size in pixels.
    fn size(&self) -> Size;

    /// Fill the whole frame with `color`.
    fn clear(&mut self, color: Rgb) -> Result<(), RenderSurfaceError>;

    /// Draw a grayscale bitmap with its top-left corner at `top_left`.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, top_left: Point) -> Result<(), RenderSurfaceError>;

    /// Draw a filled circle.
    fn draw_filled_circle(
        &mut self,
        center: Point,
        radius: f64,
        color: Rgb,
    ) -> Result<(), RenderSurfaceError>;

    /// Draw a text overlay.
    fn draw_text(&mut self, overlay: &TextOverlay) -> Result<(), RenderSurfaceError>;

    /// Show the frame drawn since the last `present`.
    fn present(&mut self) -> Result<(), RenderSurfaceError>;
}

/// Source of discrete input events, polled once per frame.
pub trait InputSource {
    /// Events that arrived since the previous poll, oldest first.
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

/// Input source that never produces events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        Vec::new()
    }
}

/// Replays a fixed script of events keyed by poll number (0-based).
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    script: VecDeque<(u64, InputEvent)>,
    polls: u64,
}

impl ScriptedInput {
    /// Build from `(poll, event)` pairs. Pairs are sorted by poll; events
    /// sharing a poll keep their given order.
    pub fn new(mut script: Vec<(u64, InputEvent)>) -> Self {
        script.sort_by_key(|(poll, _)| *poll);
        Self {
            script: script.into(),
            polls: 0,
        }
    }

    /// Events not yet delivered.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut due = Vec::new();
        while let Some(&(poll, event)) = self.script.front() {
            if poll > self.polls {
                break;
            }
            due.push(event);
            self.script.pop_front();
        }
        self.polls = self.polls.saturating_add(1);
        due
    }
}
