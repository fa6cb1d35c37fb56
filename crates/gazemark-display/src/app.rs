//! The eframe application: drives a [`Session`] from egui's event loop.
//!
//! egui repaints whenever it likes (pointer motion, resizes), but the
//! session steps at a fixed cadence: a [`FramePacer`] decides whether a
//! repaint is a frame. Frames step the session with the input buffered
//! since the last frame; other repaints only redraw the current state.
//! Both paint through an [`EguiSurface`] on the background layer.
//! Session coordinates are screen pixels; the surface scales them to fit
//! the window's content area.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use egui::{Align2, Color32, FontId, Pos2, Rect, TextureHandle, TextureOptions};
use gazemark_core::clock::{Clock, MonotonicClock};
use gazemark_core::error::RenderSurfaceError;
use gazemark_core::notify::NotificationChannel;
use gazemark_core::report::SessionReport;
use gazemark_core::runner::{self, FramePacer};
use gazemark_core::session::{Session, StepOutcome};
use gazemark_core::surface::{RenderSurface, TextOverlay};
use gazemark_types::{
    Bitmap, InputEvent, KeyCode, Point, PointerButton, Rgb, SessionEndReason, Size,
};
use tracing::error;

/// The display session as an eframe app.
pub struct GazemarkApp {
    session: Session<Box<dyn NotificationChannel>>,
    clock: MonotonicClock,
    pacer: FramePacer,
    pending: Vec<InputEvent>,
    report_path: Option<PathBuf>,
    marker_texture: Option<TextureHandle>,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl GazemarkApp {
    /// Wrap a ready session. `clock` should start when the window opens.
    pub fn new(
        session: Session<Box<dyn NotificationChannel>>,
        clock: MonotonicClock,
        frame_interval: Duration,
        report_path: Option<PathBuf>,
    ) -> Self {
        let pacer = FramePacer::new(frame_interval, clock.now());
        Self {
            session,
            clock,
            pacer,
            pending: Vec::new(),
            report_path,
            marker_texture: None,
            started_at: Utc::now(),
            finished: false,
        }
    }

    fn finish(&mut self, ctx: &egui::Context) {
        let result = runner::finish_session(&mut self.session, self.clock.now(), self.started_at);
        runner::log_session_end(&result);
        if let Some(path) = &self.report_path
            && let Err(err) = SessionReport::from_result(&result).write_to(path)
        {
            error!(error = %err, path = %path.display(), "Failed to write session report");
        }
        self.finished = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for GazemarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.finished {
            return;
        }

        self.pending.extend(collect_input(ctx));
        let now = self.clock.now();
        let frame_due = self.pacer.begin_frame(now);
        let painted = {
            let screen = self.session.screen();
            let mut surface = EguiSurface::new(ctx, &mut self.marker_texture, screen);
            if frame_due {
                let events = std::mem::take(&mut self.pending);
                self.session
                    .step(now, &events, &mut surface)
                    .map(|report| matches!(report.outcome, StepOutcome::Ended(_)))
            } else {
                self.session.redraw(now, &mut surface).map(|()| false)
            }
        };

        match painted {
            Ok(true) => {
                self.finish(ctx);
                return;
            }
            Ok(false) => {}
            Err(err) => {
                error!(error = %err, frame = self.session.frames(), "Render surface failed");
                self.session.stop(SessionEndReason::SurfaceFailure);
                self.finish(ctx);
                return;
            }
        }

        ctx.request_repaint_after(self.pacer.until_next(self.clock.now()));
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Drain this frame's egui input into session events. A window close
/// request becomes [`InputEvent::Quit`].
fn collect_input(ctx: &egui::Context) -> Vec<InputEvent> {
    ctx.input(|i| {
        let mut events: Vec<InputEvent> = i.events.iter().filter_map(map_event).collect();
        if i.viewport().close_requested() {
            events.push(InputEvent::Quit);
        }
        events
    })
}

fn map_event(event: &egui::Event) -> Option<InputEvent> {
    match event {
        egui::Event::Key {
            key,
            pressed: true,
            repeat: false,
            ..
        } => Some(InputEvent::KeyDown(map_key(*key))),
        egui::Event::PointerButton {
            button,
            pressed: true,
            ..
        } => map_button(*button).map(InputEvent::PointerDown),
        _ => None,
    }
}

fn map_key(key: egui::Key) -> KeyCode {
    match key {
        egui::Key::Escape => KeyCode::Escape,
        egui::Key::Space => KeyCode::Space,
        other => {
            let mut chars = other.name().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c.to_ascii_lowercase()),
                _ => KeyCode::Other,
            }
        }
    }
}

const fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        egui::PointerButton::Extra1 | egui::PointerButton::Extra2 => None,
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// [`RenderSurface`] over an egui background-layer painter.
///
/// The marker bitmap is uploaded once as a nearest-filtered texture and
/// re-uploaded only if its size changes.
pub struct EguiSurface<'a> {
    ctx: &'a egui::Context,
    painter: egui::Painter,
    texture: &'a mut Option<TextureHandle>,
    screen: Size,
    origin: Pos2,
    /// Points per session pixel.
    scale: f32,
}

impl<'a> EguiSurface<'a> {
    /// Paint a `screen`-sized session into the context's background layer.
    pub fn new(
        ctx: &'a egui::Context,
        texture: &'a mut Option<TextureHandle>,
        screen: Size,
    ) -> Self {
        let painter = ctx.layer_painter(egui::LayerId::background());
        let area = painter.clip_rect();
        let scale = fit_scale(area, screen);
        Self {
            ctx,
            painter,
            texture,
            screen,
            origin: area.min,
            scale,
        }
    }

    fn to_screen(&self, p: Point) -> Result<Pos2, RenderSurfaceError> {
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(RenderSurfaceError::Draw {
                message: format!("non-finite position ({}, {})", p.x, p.y),
            });
        }
        Ok(self.origin + egui::vec2(to_f32(p.x), to_f32(p.y)) * self.scale)
    }

    fn marker_texture(&mut self, bitmap: &Bitmap) -> Result<egui::TextureId, RenderSurfaceError> {
        let size = [dimension(bitmap.width())?, dimension(bitmap.height())?];
        if let Some(texture) = self.texture.as_ref()
            && texture.size() == size
        {
            return Ok(texture.id());
        }
        let image = egui::ColorImage::from_gray(size, bitmap.pixels());
        let texture = self
            .ctx
            .load_texture("gazemark-marker", image, TextureOptions::NEAREST);
        let id = texture.id();
        *self.texture = Some(texture);
        Ok(id)
    }
}

impl RenderSurface for EguiSurface<'_> {
    fn size(&self) -> Size {
        self.screen
    }

    fn clear(&mut self, color: Rgb) -> Result<(), RenderSurfaceError> {
        self.painter
            .rect_filled(self.painter.clip_rect(), 0.0, color32(color));
        Ok(())
    }

    fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        top_left: Point,
    ) -> Result<(), RenderSurfaceError> {
        let texture = self.marker_texture(bitmap)?;
        let min = self.to_screen(top_left)?;
        let extent = egui::vec2(
            to_f32(f64::from(bitmap.width())),
            to_f32(f64::from(bitmap.height())),
        ) * self.scale;
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        self.painter
            .image(texture, Rect::from_min_size(min, extent), uv, Color32::WHITE);
        Ok(())
    }

    fn draw_filled_circle(
        &mut self,
        center: Point,
        radius: f64,
        color: Rgb,
    ) -> Result<(), RenderSurfaceError> {
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(RenderSurfaceError::Draw {
                message: format!("invalid circle radius {radius}"),
            });
        }
        let center = self.to_screen(center)?;
        self.painter
            .circle_filled(center, to_f32(radius) * self.scale, color32(color));
        Ok(())
    }

    fn draw_text(&mut self, overlay: &TextOverlay) -> Result<(), RenderSurfaceError> {
        let pos = self.to_screen(overlay.center)?;
        self.painter.text(
            pos,
            Align2::CENTER_CENTER,
            &overlay.text,
            FontId::proportional(overlay.font_px * self.scale),
            color32(overlay.color),
        );
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        // egui composites the layer when the frame ends.
        Ok(())
    }
}

const fn color32(color: Rgb) -> Color32 {
    Color32::from_rgb(color.0, color.1, color.2)
}

/// Largest uniform scale that fits `screen` pixels into `area`.
fn fit_scale(area: Rect, screen: Size) -> f32 {
    if screen.is_empty() {
        return 1.0;
    }
    let sx = area.width() / to_f32(f64::from(screen.width));
    let sy = area.height() / to_f32(f64::from(screen.height));
    let scale = sx.min(sy);
    if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
}

#[allow(clippy::cast_possible_truncation)]
const fn to_f32(v: f64) -> f32 {
    v as f32
}

fn dimension(v: u32) -> Result<usize, RenderSurfaceError> {
    usize::try_from(v).map_err(|e| RenderSurfaceError::Draw {
        message: format!("bitmap dimension {v}: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_session_codes() {
        assert_eq!(map_key(egui::Key::Escape), KeyCode::Escape);
        assert_eq!(map_key(egui::Key::Space), KeyCode::Space);
        assert_eq!(map_key(egui::Key::Q), KeyCode::Char('q'));
        assert_eq!(map_key(egui::Key::ArrowLeft), KeyCode::Other);
    }

    #[test]
    fn only_presses_become_events() {
        let press = egui::Event::PointerButton {
            pos: Pos2::ZERO,
            button: egui::PointerButton::Secondary,
            pressed: true,
            modifiers: egui::Modifiers::NONE,
        };
        let release = egui::Event::PointerButton {
            pos: Pos2::ZERO,
            button: egui::PointerButton::Secondary,
            pressed: false,
            modifiers: egui::Modifiers::NONE,
        };
        assert_eq!(
            map_event(&press),
            Some(InputEvent::PointerDown(PointerButton::Secondary))
        );
        assert_eq!(map_event(&release), None);
        assert_eq!(map_button(egui::PointerButton::Extra1), None);
    }

    #[test]
    fn scale_fits_the_smaller_axis() {
        let area = Rect::from_min_size(Pos2::ZERO, egui::vec2(1720.0, 1400.0));
        let scale = fit_scale(area, Size::new(3440, 1400));
        assert!((scale - 0.5).abs() < f32::EPSILON);
        assert!((fit_scale(area, Size::new(0, 0)) - 1.0).abs() < f32::EPSILON);
    }
}
