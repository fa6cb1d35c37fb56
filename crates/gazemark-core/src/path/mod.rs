//! Marker path controller.
//!
//! The [`PathController`] owns the marker's top-left position and moves
//! it once per tick under one of two policies:
//!
//! - [`RasterScan`]: a boustrophedon sweep that covers the padded area
//!   and completes when the marker reaches the bottom-right or top-left
//!   extreme corner.
//! - [`ElasticBounce`]: constant-velocity bouncing that never completes.
//!
//! The padded bounds are derived once from screen size, marker size and
//! padding. A configuration that leaves no room to move is rejected at
//! construction with [`ConfigurationError::DegenerateBounds`]; after
//! that, every tick keeps `left <= x <= right` and `top <= y <= bottom`.

pub mod bounce;
pub mod raster;

use gazemark_types::{ActiveAxis, Axis, Bounds, Padding, Point, Size};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{MotionConfig, MotionPolicyKind, StartPosition};
use crate::error::ConfigurationError;

pub use bounce::ElasticBounce;
pub use raster::RasterScan;

/// The movement policy a controller runs.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionPolicy {
    /// Boustrophedon sweep.
    RasterScan(RasterScan),
    /// Constant-velocity bounce.
    ElasticBounce(ElasticBounce),
}

impl MotionPolicy {
    /// Build the policy described by `config`.
    pub fn from_config(config: &MotionConfig) -> Result<Self, ConfigurationError> {
        Ok(match config.policy {
            MotionPolicyKind::RasterScan => Self::RasterScan(RasterScan::new(
                config.primary_axis,
                config.speed_x,
                config.speed_y,
                config.grid_size,
            )?),
            MotionPolicyKind::ElasticBounce => {
                Self::ElasticBounce(ElasticBounce::new(config.speed_x, config.speed_y)?)
            }
        })
    }

    /// Which kind of policy this is.
    pub const fn kind(&self) -> MotionPolicyKind {
        match self {
            Self::RasterScan(_) => MotionPolicyKind::RasterScan,
            Self::ElasticBounce(_) => MotionPolicyKind::ElasticBounce,
        }
    }
}

/// Owns the marker position and advances it one tick at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct PathController {
    policy: MotionPolicy,
    position: Point,
    bounds: Bounds,
    completed: bool,
    ticks: u64,
}

impl PathController {
    /// Create a controller for a `marker` on a `screen`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroSizeMarker`] for an empty marker,
    /// [`ConfigurationError::DegenerateBounds`] if the padded area leaves
    /// no room to move, or a speed/grid error from the policy.
    pub fn new(
        config: &MotionConfig,
        screen: Size,
        marker: Size,
    ) -> Result<Self, ConfigurationError> {
        let bounds = compute_bounds(screen, marker, config.padding)?;
        let policy = MotionPolicy::from_config(config)?;
        let start = initial_position(&bounds, config.start, config.seed);

        info!(
            policy = ?policy.kind(),
            left = bounds.left,
            right = bounds.right,
            top = bounds.top,
            bottom = bounds.bottom,
            start_x = start.x,
            start_y = start.y,
            "Path controller ready"
        );

        Self::with_bounds(policy, bounds, start)
    }

    /// Create a controller from explicit bounds and start position (useful
    /// for testing). The start is clamped into the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DegenerateBounds`] unless
    /// `left < right` and `top < bottom`, and
    /// [`ConfigurationError::InvalidStartPosition`] if either start
    /// coordinate is not finite.
    pub fn with_bounds(
        policy: MotionPolicy,
        bounds: Bounds,
        start: Point,
    ) -> Result<Self, ConfigurationError> {
        // NaN edges fail both comparisons.
        let x_ordered = bounds.left < bounds.right;
        let y_ordered = bounds.top < bounds.bottom;
        if !(x_ordered && y_ordered) {
            let axis = if x_ordered { Axis::Y } else { Axis::X };
            return Err(ConfigurationError::DegenerateBounds {
                axis,
                screen: 0,
                marker: 0,
                padding_low: 0,
                padding_high: 0,
            });
        }
        // Clamping passes NaN through.
        if !(start.x.is_finite() && start.y.is_finite()) {
            return Err(ConfigurationError::InvalidStartPosition {
                x: start.x,
                y: start.y,
            });
        }

        Ok(Self {
            policy,
            position: bounds.clamp(start),
            bounds,
            completed: false,
            ticks: 0,
        })
    }

    /// Advance the marker by one tick. No-op once completed.
    pub fn advance(&mut self) {
        if self.completed {
            return;
        }
        self.ticks = self.ticks.saturating_add(1);

        match &mut self.policy {
            MotionPolicy::RasterScan(scan) => {
                scan.step(&mut self.position, &self.bounds);
                if reached_terminal_corner(self.position, &self.bounds) {
                    scan.halt();
                    self.completed = true;
                    info!(
                        ticks = self.ticks,
                        x = self.position.x,
                        y = self.position.y,
                        "Sweep completed"
                    );
                }
            }
            MotionPolicy::ElasticBounce(bounce) => {
                bounce.step(&mut self.position, &self.bounds);
            }
        }
    }

    /// Current marker top-left position.
    pub const fn current_position(&self) -> Point {
        self.position
    }

    /// Current marker centre for a marker of the given size.
    pub fn center(&self, marker: Size) -> Point {
        self.position
            .offset(f64::from(marker.width) / 2.0, f64::from(marker.height) / 2.0)
    }

    /// Whether the sweep has reached a terminal corner. Once `true`,
    /// stays `true`.
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// The padded bounds the marker travels in.
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of ticks that moved the marker.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The axis currently advancing. Bounce moves on both axes and
    /// reports `None`, as does a completed sweep.
    pub const fn active_axis(&self) -> ActiveAxis {
        match &self.policy {
            MotionPolicy::RasterScan(scan) => scan.active_axis(),
            MotionPolicy::ElasticBounce(_) => ActiveAxis::None,
        }
    }

    /// The policy and its state.
    pub const fn policy(&self) -> &MotionPolicy {
        &self.policy
    }
}

/// Derive the padded bounds for the marker's top-left corner.
///
/// # Errors
///
/// Returns [`ConfigurationError::ZeroSizeMarker`] or
/// [`ConfigurationError::DegenerateBounds`].
pub fn compute_bounds(
    screen: Size,
    marker: Size,
    padding: Padding,
) -> Result<Bounds, ConfigurationError> {
    if marker.is_empty() {
        return Err(ConfigurationError::ZeroSizeMarker {
            width: marker.width,
            height: marker.height,
        });
    }

    let (left, right) = axis_range(Axis::X, screen, marker, padding.left, padding.right)?;
    let (top, bottom) = axis_range(Axis::Y, screen, marker, padding.top, padding.bottom)?;

    Ok(Bounds {
        left,
        right,
        top,
        bottom,
    })
}

fn axis_range(
    axis: Axis,
    screen: Size,
    marker: Size,
    padding_low: u32,
    padding_high: u32,
) -> Result<(f64, f64), ConfigurationError> {
    let degenerate = || ConfigurationError::DegenerateBounds {
        axis,
        screen: screen.along(axis),
        marker: marker.along(axis),
        padding_low,
        padding_high,
    };

    let max = screen
        .along(axis)
        .checked_sub(padding_high)
        .and_then(|rest| rest.checked_sub(marker.along(axis)))
        .ok_or_else(degenerate)?;
    if max <= padding_low {
        return Err(degenerate());
    }

    Ok((f64::from(padding_low), f64::from(max)))
}

fn initial_position(bounds: &Bounds, start: StartPosition, seed: u64) -> Point {
    match start {
        StartPosition::PaddedOrigin => bounds.top_left(),
        StartPosition::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            let x = rng.random_range(bounds.left..=bounds.right);
            let y = rng.random_range(bounds.top..=bounds.bottom);
            debug!(seed, x, y, "Random start position");
            Point::new(x, y)
        }
        StartPosition::Fixed { x, y } => bounds.clamp(Point::new(x, y)),
    }
}

fn reached_terminal_corner(position: Point, bounds: &Bounds) -> bool {
    (position.x >= bounds.right && position.y >= bounds.bottom)
        || (position.x <= bounds.left && position.y <= bounds.top)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::GazemarkConfig;

    fn reference_config() -> MotionConfig {
        MotionConfig::default()
    }

    fn reference_controller() -> PathController {
        PathController::new(
            &reference_config(),
            Size::new(3440, 1400),
            Size::square(300),
        )
        .unwrap()
    }

    #[test]
    fn bounds_follow_screen_marker_and_padding() {
        let b = compute_bounds(Size::new(3440, 1400), Size::square(300), Padding::default())
            .unwrap();
        assert!((b.left - 30.0).abs() < f64::EPSILON);
        assert!((b.right - 3110.0).abs() < f64::EPSILON);
        assert!((b.top - 50.0).abs() < f64::EPSILON);
        assert!((b.bottom - 1070.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_screen_is_rejected() {
        let err = compute_bounds(Size::new(360, 1400), Size::square(300), Padding::default());
        assert!(matches!(
            err,
            Err(ConfigurationError::DegenerateBounds {
                axis: Axis::X,
                screen: 360,
                ..
            })
        ));

        // Exactly zero room is still degenerate.
        let err = compute_bounds(Size::new(1000, 380), Size::square(300), Padding::default());
        assert!(matches!(
            err,
            Err(ConfigurationError::DegenerateBounds { axis: Axis::Y, .. })
        ));
    }

    #[test]
    fn zero_size_marker_is_rejected() {
        let err = compute_bounds(Size::new(3440, 1400), Size::new(0, 300), Padding::default());
        assert!(matches!(err, Err(ConfigurationError::ZeroSizeMarker { .. })));
    }

    #[test]
    fn explicit_bounds_must_be_ordered() {
        let policy = MotionPolicy::from_config(&reference_config()).unwrap();
        let flat = Bounds {
            left: 10.0,
            right: 10.0,
            top: 0.0,
            bottom: 50.0,
        };
        assert!(PathController::with_bounds(policy, flat, Point::default()).is_err());
    }

    #[test]
    fn padded_origin_start() {
        let ctrl = reference_controller();
        assert_eq!(ctrl.current_position(), Point::new(30.0, 50.0));
        assert!(!ctrl.is_completed());
        assert_eq!(ctrl.active_axis(), ActiveAxis::X);
    }

    #[test]
    fn fixed_start_is_clamped() {
        let config = MotionConfig {
            start: StartPosition::Fixed {
                x: -100.0,
                y: 500.0,
            },
            ..reference_config()
        };
        let ctrl =
            PathController::new(&config, Size::new(3440, 1400), Size::square(300)).unwrap();
        assert_eq!(ctrl.current_position(), Point::new(30.0, 500.0));
    }

    #[test]
    fn non_finite_fixed_start_is_rejected() {
        for (x, y) in [(f64::NAN, 100.0), (200.0, f64::INFINITY)] {
            let config = MotionConfig {
                start: StartPosition::Fixed { x, y },
                ..reference_config()
            };
            let err = PathController::new(&config, Size::new(3440, 1400), Size::square(300))
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigurationError::InvalidStartPosition { .. }
            ));
        }
    }

    #[test]
    fn nan_start_from_yaml_is_rejected() {
        let yaml = "motion:\n  start:\n    mode: fixed\n    x: .nan\n    y: 100\n";
        let config = GazemarkConfig::parse(yaml).unwrap();
        let result =
            PathController::new(&config.motion, config.display.size(), Size::square(300));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidStartPosition { .. })
        ));
    }

    #[test]
    fn random_start_is_seeded_and_in_bounds() {
        let config = MotionConfig {
            start: StartPosition::Random,
            seed: 7,
            ..reference_config()
        };
        let a = PathController::new(&config, Size::new(3440, 1400), Size::square(300)).unwrap();
        let b = PathController::new(&config, Size::new(3440, 1400), Size::square(300)).unwrap();
        assert_eq!(a.current_position(), b.current_position());
        assert!(a.bounds().contains(a.current_position()));
    }

    #[test]
    fn raster_sweep_completes_at_bottom_right_and_stops() {
        let mut ctrl = reference_controller();
        let mut guard = 0_u32;
        while !ctrl.is_completed() && guard < 100_000 {
            ctrl.advance();
            guard = guard.saturating_add(1);
        }
        assert!(ctrl.is_completed());
        let b = ctrl.bounds();
        let end = ctrl.current_position();
        assert!(end.x >= b.right || end.x <= b.left);
        assert!(end.y >= b.bottom);
        assert_eq!(ctrl.active_axis(), ActiveAxis::None);

        let ticks = ctrl.ticks();
        ctrl.advance();
        assert_eq!(ctrl.current_position(), end);
        assert_eq!(ctrl.ticks(), ticks);
    }

    #[test]
    fn bounce_never_completes() {
        let config = MotionConfig {
            policy: MotionPolicyKind::ElasticBounce,
            speed_x: 2.0,
            speed_y: 2.0,
            ..reference_config()
        };
        let mut ctrl =
            PathController::new(&config, Size::new(800, 600), Size::square(100)).unwrap();
        for _ in 0..5_000 {
            ctrl.advance();
            assert!(ctrl.bounds().contains(ctrl.current_position()));
        }
        assert!(!ctrl.is_completed());
        assert_eq!(ctrl.active_axis(), ActiveAxis::None);
    }

    #[test]
    fn centre_is_offset_by_half_marker() {
        let ctrl = reference_controller();
        assert_eq!(ctrl.center(Size::square(300)), Point::new(180.0, 200.0));
    }
}
