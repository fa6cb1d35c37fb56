//! In-memory render surface backed by an RGB image.
//!
//! Used for headless runs and tests. Bitmaps and circles are rasterised
//! into the frame; text cannot be rasterised without a font, so overlays
//! are recorded per frame instead and can be inspected after `present`.

use std::path::Path;

use gazemark_types::{Bitmap, Point, Rgb, Size};
use image::RgbImage;
use tracing::trace;

use crate::error::RenderSurfaceError;
use crate::surface::{RenderSurface, TextOverlay};

/// A [`RenderSurface`] drawing into an [`RgbImage`].
#[derive(Debug, Clone)]
pub struct FrameBufferSurface {
    frame: RgbImage,
    pending_overlays: Vec<TextOverlay>,
    presented_overlays: Vec<TextOverlay>,
    presented: u64,
}

impl FrameBufferSurface {
    /// A white frame of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            frame: RgbImage::from_pixel(size.width, size.height, to_pixel(Rgb::WHITE)),
            pending_overlays: Vec::new(),
            presented_overlays: Vec::new(),
            presented: 0,
        }
    }

    /// Colour at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.frame
            .get_pixel_checked(x, y)
            .map(|&image::Rgb([r, g, b])| Rgb(r, g, b))
    }

    /// Overlays drawn on the last presented frame.
    pub fn overlays(&self) -> &[TextOverlay] {
        &self.presented_overlays
    }

    /// Number of frames presented.
    pub const fn frames_presented(&self) -> u64 {
        self.presented
    }

    /// The frame image.
    pub const fn image(&self) -> &RgbImage {
        &self.frame
    }

    /// Save the current frame as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`RenderSurfaceError::Present`] if the file cannot be
    /// written.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderSurfaceError> {
        self.frame
            .save(path)
            .map_err(|err| RenderSurfaceError::Present {
                message: format!("failed to save {}: {err}", path.display()),
            })
    }
}

impl RenderSurface for FrameBufferSurface {
    fn size(&self) -> Size {
        Size::new(self.frame.width(), self.frame.height())
    }

    fn clear(&mut self, color: Rgb) -> Result<(), RenderSurfaceError> {
        let fill = to_pixel(color);
        for pixel in self.frame.pixels_mut() {
            *pixel = fill;
        }
        self.pending_overlays.clear();
        Ok(())
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, top_left: Point) -> Result<(), RenderSurfaceError> {
        let x0 = round_px(top_left.x);
        let y0 = round_px(top_left.y);
        for by in 0..bitmap.height() {
            for bx in 0..bitmap.width() {
                let Some(value) = bitmap.pixel(bx, by) else {
                    continue;
                };
                let tx = x0.saturating_add(i64::from(bx));
                let ty = y0.saturating_add(i64::from(by));
                if let (Ok(tx), Ok(ty)) = (u32::try_from(tx), u32::try_from(ty))
                    && let Some(px) = self.frame.get_pixel_mut_checked(tx, ty)
                {
                    *px = image::Rgb([value, value, value]);
                }
            }
        }
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
        let fill = to_pixel(color);
        let r_sq = radius * radius;
        let x_min = round_px(center.x - radius).max(0);
        let x_max = round_px(center.x + radius);
        let y_min = round_px(center.y - radius).max(0);
        let y_max = round_px(center.y + radius);

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let (Ok(ux), Ok(uy)) = (u32::try_from(x), u32::try_from(y)) else {
                    continue;
                };
                let dx = f64::from(ux) - center.x;
                let dy = f64::from(uy) - center.y;
                if dx.mul_add(dx, dy * dy) <= r_sq
                    && let Some(px) = self.frame.get_pixel_mut_checked(ux, uy)
                {
                    *px = fill;
                }
            }
        }
        Ok(())
    }

    fn draw_text(&mut self, overlay: &TextOverlay) -> Result<(), RenderSurfaceError> {
        trace!(text = %overlay.text, "Overlay recorded");
        self.pending_overlays.push(overlay.clone());
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        self.presented_overlays = std::mem::take(&mut self.pending_overlays);
        self.presented = self.presented.saturating_add(1);
        Ok(())
    }
}

const fn to_pixel(color: Rgb) -> image::Rgb<u8> {
    image::Rgb([color.0, color.1, color.2])
}

/// Round a pixel coordinate, saturating far outside any real frame.
#[allow(clippy::cast_possible_truncation)]
fn round_px(v: f64) -> i64 {
    // `as` saturates on overflow and maps NaN to 0.
    v.round() as i64
}
