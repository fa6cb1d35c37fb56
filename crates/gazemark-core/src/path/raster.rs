//! Boustrophedon (raster-scan) movement policy.
//!
//! The marker runs along the primary axis until it hits the far bound,
//! steps at least `grid_size` along the cross axis, then runs back along
//! the primary axis in the opposite direction. Cross legs always move
//! towards the far side (down for a horizontal sweep, right for a
//! vertical one).
//!
//! A cross leg may overshoot `grid_size` by up to one step; the position
//! is clamped into the bounds when the leg ends so no drift builds up.

use gazemark_types::{ActiveAxis, Axis, Bounds, Direction, Point};

use crate::error::ConfigurationError;

/// State of a raster sweep. Position lives in the owning
/// [`PathController`](super::PathController).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterScan {
    primary: Axis,
    primary_speed: f64,
    cross_speed: f64,
    grid_size: f64,
    active: ActiveAxis,
    direction: Direction,
    leg_progress: f64,
}

impl RasterScan {
    /// Create a raster sweep.
    ///
    /// `speed_x` and `speed_y` are step magnitudes per tick and must be
    /// positive. The sweep starts along `primary` in the increasing
    /// direction.
    pub fn new(
        primary: Axis,
        speed_x: f64,
        speed_y: f64,
        grid_size: f64,
    ) -> Result<Self, ConfigurationError> {
        check_positive("speed_x", speed_x)?;
        check_positive("speed_y", speed_y)?;
        if !(grid_size.is_finite() && grid_size > 0.0) {
            return Err(ConfigurationError::InvalidGridSize { value: grid_size });
        }

        let (primary_speed, cross_speed) = match primary {
            Axis::X => (speed_x, speed_y),
            Axis::Y => (speed_y, speed_x),
        };

        Ok(Self {
            primary,
            primary_speed,
            cross_speed,
            grid_size,
            active: ActiveAxis::from(primary),
            direction: Direction::Increasing,
            leg_progress: 0.0,
        })
    }

    /// Axis of the long legs.
    pub const fn primary_axis(&self) -> Axis {
        self.primary
    }

    /// Axis currently advancing.
    pub const fn active_axis(&self) -> ActiveAxis {
        self.active
    }

    /// Direction of the current (or next) primary leg.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Displacement accumulated on the current cross leg.
    pub const fn leg_progress(&self) -> f64 {
        self.leg_progress
    }

    /// Advance one tick, moving `position` within `bounds`.
    pub(crate) fn step(&mut self, position: &mut Point, bounds: &Bounds) {
        let primary = self.primary;
        let cross = primary.cross();

        if self.active == ActiveAxis::from(primary) {
            let next = self
                .primary_speed
                .mul_add(self.direction.sign(), position.along(primary))
                .clamp(bounds.min(primary), bounds.max(primary));
            position.set_along(primary, next);

            if next >= bounds.max(primary) || next <= bounds.min(primary) {
                self.active = ActiveAxis::from(cross);
                self.leg_progress = 0.0;
            }
        } else if self.active == ActiveAxis::from(cross) {
            position.set_along(cross, position.along(cross) + self.cross_speed);
            self.leg_progress += self.cross_speed;

            if self.leg_progress >= self.grid_size {
                let landed = position
                    .along(cross)
                    .clamp(bounds.min(cross), bounds.max(cross));
                position.set_along(cross, landed);
                self.direction = if position.along(primary) >= bounds.max(primary) {
                    Direction::Decreasing
                } else {
                    Direction::Increasing
                };
                self.active = ActiveAxis::from(primary);
                self.leg_progress = 0.0;
            }
        }

        *position = bounds.clamp(*position);
    }

    /// Stop advancing for good.
    pub(crate) const fn halt(&mut self) {
        self.active = ActiveAxis::None;
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidSpeed { name, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
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
    fn rejects_non_positive_speeds() {
        assert!(matches!(
            RasterScan::new(Axis::X, 0.0, 30.0, 100.0),
            Err(ConfigurationError::InvalidSpeed { name: "speed_x", .. })
        ));
        assert!(matches!(
            RasterScan::new(Axis::X, 30.0, -1.0, 100.0),
            Err(ConfigurationError::InvalidSpeed { name: "speed_y", .. })
        ));
        assert!(matches!(
            RasterScan::new(Axis::X, 30.0, 30.0, f64::NAN),
            Err(ConfigurationError::InvalidGridSize { .. })
        ));
    }

    #[test]
    fn overshoot_on_primary_leg_is_clamped_exactly() {
        let b = bounds();
        let mut scan = RasterScan::new(Axis::X, 30.0, 30.0, 100.0).unwrap();
        let mut pos = Point::new(3370.0, 50.0);
        scan.step(&mut pos, &b);
        assert!((pos.x - b.right).abs() < f64::EPSILON);
        assert_eq!(scan.active_axis(), ActiveAxis::Y);
    }

    #[test]
    fn cross_leg_reverses_primary_direction() {
        let b = bounds();
        let mut scan = RasterScan::new(Axis::X, 30.0, 30.0, 100.0).unwrap();
        let mut pos = Point::new(3380.0, 50.0);
        scan.step(&mut pos, &b);
        assert_eq!(scan.active_axis(), ActiveAxis::Y);

        let mut cross_ticks = 0_u32;
        while scan.active_axis() == ActiveAxis::Y {
            scan.step(&mut pos, &b);
            cross_ticks = cross_ticks.saturating_add(1);
        }
        assert_eq!(cross_ticks, 4);
        assert_eq!(scan.direction(), Direction::Decreasing);
        // At least grid_size: 4 steps of 30.
        assert!((pos.y - 170.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vertical_primary_sweeps_y_first() {
        let b = bounds();
        let mut scan = RasterScan::new(Axis::Y, 10.0, 40.0, 100.0).unwrap();
        let mut pos = b.top_left();
        scan.step(&mut pos, &b);
        assert!((pos.y - 90.0).abs() < f64::EPSILON);
        assert!((pos.x - b.left).abs() < f64::EPSILON);

        while scan.active_axis() == ActiveAxis::Y {
            scan.step(&mut pos, &b);
        }
        assert!((pos.y - b.bottom).abs() < f64::EPSILON);

        // Cross leg on X uses speed_x = 10, so ten ticks reach 100.
        let mut cross_ticks = 0_u32;
        while scan.active_axis() == ActiveAxis::X {
            scan.step(&mut pos, &b);
            cross_ticks = cross_ticks.saturating_add(1);
        }
        assert_eq!(cross_ticks, 10);
        assert_eq!(scan.direction(), Direction::Decreasing);
        assert!((pos.x - 130.0).abs() < f64::EPSILON);
    }

    #[test]
    fn halted_scan_does_not_move() {
        let b = bounds();
        let mut scan = RasterScan::new(Axis::X, 30.0, 30.0, 100.0).unwrap();
        scan.halt();
        let mut pos = Point::new(100.0, 100.0);
        scan.step(&mut pos, &b);
        assert_eq!(pos, Point::new(100.0, 100.0));
    }
}
