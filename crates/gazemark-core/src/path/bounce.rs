//! Elastic-bounce movement policy.
//!
//! Constant-velocity translation. When the marker touches or crosses a
//! padded bound it is clamped back onto that bound and the velocity on
//! that axis is pointed back towards the interior. Never completes.

use gazemark_types::{Bounds, Point};

use crate::error::ConfigurationError;

/// Velocity state of a bouncing marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticBounce {
    vx: f64,
    vy: f64,
}

impl ElasticBounce {
    /// Create a bounce with the given signed per-tick velocity. The sign
    /// of each component is the initial direction on that axis.
    pub fn new(vx: f64, vy: f64) -> Result<Self, ConfigurationError> {
        check_non_zero("speed_x", vx)?;
        check_non_zero("speed_y", vy)?;
        Ok(Self { vx, vy })
    }

    /// Current signed velocity `(vx, vy)`.
    pub const fn velocity(&self) -> (f64, f64) {
        (self.vx, self.vy)
    }

    /// Advance one tick, moving `position` within `bounds`.
    pub(crate) fn step(&mut self, position: &mut Point, bounds: &Bounds) {
        let moved = bounds.clamp(position.offset(self.vx, self.vy));

        if moved.x <= bounds.left {
            self.vx = self.vx.abs();
        } else if moved.x >= bounds.right {
            self.vx = -self.vx.abs();
        }
        if moved.y <= bounds.top {
            self.vy = self.vy.abs();
        } else if moved.y >= bounds.bottom {
            self.vy = -self.vy.abs();
        }

        *position = moved;
    }
}

fn check_non_zero(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value != 0.0 {
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
            left: 10.0,
            right: 110.0,
            top: 10.0,
            bottom: 60.0,
        }
    }

    #[test]
    fn zero_velocity_is_rejected() {
        assert!(ElasticBounce::new(0.0, 2.0).is_err());
        assert!(ElasticBounce::new(2.0, f64::INFINITY).is_err());
        assert!(ElasticBounce::new(-2.0, 2.0).is_ok());
    }

    #[test]
    fn bounces_off_right_edge() {
        let b = bounds();
        let mut bounce = ElasticBounce::new(30.0, 1.0).unwrap();
        let mut pos = Point::new(100.0, 20.0);
        bounce.step(&mut pos, &b);
        assert!((pos.x - 110.0).abs() < f64::EPSILON);
        assert!(bounce.velocity().0 < 0.0);

        bounce.step(&mut pos, &b);
        assert!((pos.x - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bounces_off_top_edge() {
        let b = bounds();
        let mut bounce = ElasticBounce::new(1.0, -5.0).unwrap();
        let mut pos = Point::new(50.0, 12.0);
        bounce.step(&mut pos, &b);
        assert!((pos.y - 10.0).abs() < f64::EPSILON);
        assert!(bounce.velocity().1 > 0.0);
    }

    #[test]
    fn stays_in_bounds_for_many_ticks() {
        let b = bounds();
        let mut bounce = ElasticBounce::new(7.0, 3.0).unwrap();
        let mut pos = Point::new(40.0, 30.0);
        for _ in 0..1_000 {
            bounce.step(&mut pos, &b);
            assert!(b.contains(pos));
        }
    }
}
