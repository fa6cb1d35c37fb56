//! Screen-space geometry: points, sizes, padding and sweep bounds.
//!
//! All coordinates are in screen pixels with the origin at the top-left
//! corner, `x` growing to the right and `y` growing downwards.

use serde::{Deserialize, Serialize};

use crate::enums::Axis;

/// A position on screen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The coordinate along `axis`.
    pub const fn along(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Replace the coordinate along `axis`.
    pub const fn set_along(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
    }

    /// Translate by the given offsets.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A width/height pair in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square of side `side`.
    pub const fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// Whether either dimension is zero.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The extent along `axis`.
    pub const fn along(self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }
}

/// Distance the marker must keep from each screen edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Padding {
    /// Gap above the marker's top edge.
    pub top: u32,
    /// Gap below the marker's bottom edge.
    pub bottom: u32,
    /// Gap left of the marker's left edge.
    pub left: u32,
    /// Gap right of the marker's right edge.
    pub right: u32,
}

impl Padding {
    /// The same padding on every side.
    pub const fn uniform(gap: u32) -> Self {
        Self {
            top: gap,
            bottom: gap,
            left: gap,
            right: gap,
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 50,
            bottom: 30,
            left: 30,
            right: 30,
        }
    }
}

/// The rectangle in which the marker's top-left corner may travel.
///
/// Constructed by the path controller, which guarantees
/// `left < right` and `top < bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest allowed `x`.
    pub left: f64,
    /// Largest allowed `x`.
    pub right: f64,
    /// Smallest allowed `y`.
    pub top: f64,
    /// Largest allowed `y`.
    pub bottom: f64,
}

impl Bounds {
    /// Smallest allowed coordinate along `axis`.
    pub const fn min(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.left,
            Axis::Y => self.top,
        }
    }

    /// Largest allowed coordinate along `axis`.
    pub const fn max(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.right,
            Axis::Y => self.bottom,
        }
    }

    /// Whether `point` lies inside the bounds (edges included).
    pub fn contains(&self, point: Point) -> bool {
        (self.left..=self.right).contains(&point.x) && (self.top..=self.bottom).contains(&point.y)
    }

    /// Clamp `point` into the bounds.
    pub fn clamp(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(self.left, self.right),
            y: point.y.clamp(self.top, self.bottom),
        }
    }

    /// The top-left extreme corner.
    pub const fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// The bottom-right extreme corner.
    pub const fn bottom_right(&self) -> Point {
        Point::new(self.right, self.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            left: 30.0,
            right: 3380.0,
            top: 50.0,
            bottom: 1320.0,
        }
    }

    #[test]
    fn clamp_pulls_point_inside() {
        let b = bounds();
        let p = b.clamp(Point::new(5000.0, -10.0));
        assert!(b.contains(p));
        assert!((p.x - 3380.0).abs() < f64::EPSILON);
        assert!((p.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn axis_accessors_agree() {
        let b = bounds();
        assert!((b.min(Axis::X) - b.left).abs() < f64::EPSILON);
        assert!((b.max(Axis::Y) - b.bottom).abs() < f64::EPSILON);

        let mut p = Point::new(1.0, 2.0);
        p.set_along(Axis::Y, 9.0);
        assert!((p.along(Axis::Y) - 9.0).abs() < f64::EPSILON);
        assert_eq!(Axis::X.cross(), Axis::Y);
    }

    #[test]
    fn empty_size_detected() {
        assert!(Size::new(0, 10).is_empty());
        assert!(!Size::square(300).is_empty());
    }
}
