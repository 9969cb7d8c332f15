//! Double-exponential smoothing whose gains follow the joint's speed.
//!
//! Slow joints get low gains (heavy smoothing, little jitter); fast joints
//! get high gains (little lag).  Between the two velocity bounds the gains
//! are interpolated linearly; outside them they clamp.

use std::f64::consts::PI;
use std::sync::Arc;

use tracing::debug;

use embody_scene::Scene;
use embody_types::{Arguments, EmbodyError, Quaternion, Vec3};

use crate::filter::{Filter, Gains, Smoother};

/// Velocity bounds of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityBounds {
    pub low: f64,
    pub high: f64,
}

/// Tuning of [`AdaptiveDoubleExponentialFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveParams {
    /// Position speed bounds, cm/s.
    pub position: VelocityBounds,
    /// Orientation speed bounds, degrees/s.
    pub orientation: VelocityBounds,
    pub alpha_low: f64,
    pub alpha_high: f64,
    pub gamma_low: f64,
    pub gamma_high: f64,
    /// Gains in effect before the first velocity estimate.
    pub initial_alpha: f64,
    pub initial_gamma: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            position: VelocityBounds { low: 5.0, high: 50.0 },
            orientation: VelocityBounds {
                low: 200.0,
                high: 600.0,
            },
            alpha_low: 0.5,
            alpha_high: 0.9,
            gamma_low: 0.5,
            gamma_high: 0.9,
            initial_alpha: 0.75,
            initial_gamma: 0.75,
        }
    }
}

impl AdaptiveParams {
    const KEYS: &'static [&'static str] = &[
        "initial_alpha",
        "initial_gamma",
        "velocity_low_position",
        "velocity_high_position",
        "velocity_low_orientation",
        "velocity_high_orientation",
        "alpha_low",
        "alpha_high",
        "gamma_low",
        "gamma_high",
    ];

    /// Read the tuning from configuration, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] for unparsable values.
    pub fn from_args(args: &Arguments) -> Result<Self, EmbodyError> {
        let d = Self::default();
        Ok(Self {
            position: VelocityBounds {
                low: args.parse_or("velocity_low_position", d.position.low)?,
                high: args.parse_or("velocity_high_position", d.position.high)?,
            },
            orientation: VelocityBounds {
                low: args.parse_or("velocity_low_orientation", d.orientation.low)?,
                high: args.parse_or("velocity_high_orientation", d.orientation.high)?,
            },
            alpha_low: args.parse_or("alpha_low", d.alpha_low)?,
            alpha_high: args.parse_or("alpha_high", d.alpha_high)?,
            gamma_low: args.parse_or("gamma_low", d.gamma_low)?,
            gamma_high: args.parse_or("gamma_high", d.gamma_high)?,
            initial_alpha: args.parse_or("initial_alpha", d.initial_alpha)?,
            initial_gamma: args.parse_or("initial_gamma", d.initial_gamma)?,
        })
    }

    /// Gains for a channel moving at `velocity`.
    pub fn gains(&self, velocity: f64, bounds: VelocityBounds) -> (f64, f64) {
        if velocity < bounds.low {
            return (self.alpha_low, self.gamma_low);
        }
        if velocity > bounds.high || bounds.high <= bounds.low {
            return (self.alpha_high, self.gamma_high);
        }
        let t = (velocity - bounds.high) / (bounds.low - bounds.high);
        (
            self.alpha_high + t * (self.alpha_low - self.alpha_high),
            self.gamma_high + t * (self.gamma_low - self.gamma_high),
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct VelocityGains {
    params: AdaptiveParams,
    update_frequency: f64,
    alpha: f64,
    gamma: f64,
}

impl Gains for VelocityGains {
    fn position(&mut self, x: Vec3, last_input: Vec3) -> (f64, f64) {
        let velocity = x.distance(last_input) * self.update_frequency;
        (self.alpha, self.gamma) = self.params.gains(velocity, self.params.position);
        (self.alpha, self.gamma)
    }

    fn orientation(&mut self, x: Quaternion, last_input: Quaternion) -> (f64, f64) {
        let velocity = x.angle_to(last_input) * 180.0 / PI * self.update_frequency;
        (self.alpha, self.gamma) = self.params.gains(velocity, self.params.orientation);
        (self.alpha, self.gamma)
    }
}

/// Double-exponential smoothing with speed-dependent α and γ.
#[derive(Debug)]
pub struct AdaptiveDoubleExponentialFilter {
    gains: VelocityGains,
    smoother: Smoother,
}

impl AdaptiveDoubleExponentialFilter {
    pub const NAME: &'static str = "adaptive_double_exponential";

    /// `update_frequency` (Hz) converts per-frame motion into speed.
    pub fn new(params: AdaptiveParams, update_frequency: f64) -> Self {
        Self {
            gains: VelocityGains {
                params,
                update_frequency,
                alpha: params.initial_alpha,
                gamma: params.initial_gamma,
            },
            smoother: Smoother::default(),
        }
    }

    /// Construct from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] for unparsable values.
    pub fn from_args(args: &Arguments, update_frequency: f64) -> Result<Self, EmbodyError> {
        args.warn_unknown(Self::NAME, AdaptiveParams::KEYS);
        let params = AdaptiveParams::from_args(args)?;
        debug!(?params, update_frequency, "adaptive double exponential filter configured");
        Ok(Self::new(params, update_frequency))
    }

    /// Gains chosen for the most recent sample.
    pub fn current_gains(&self) -> (f64, f64) {
        (self.gains.alpha, self.gains.gamma)
    }
}

impl Filter for AdaptiveDoubleExponentialFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn filter(&mut self, _history: &[Arc<Scene>], scene: &mut Scene) {
        self.smoother.apply(scene, &mut self.gains);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::chain;
    use embody_types::JointType;

    fn params() -> AdaptiveParams {
        AdaptiveParams::default()
    }

    // ── Gain interpolation ──────────────────────────────────────────────────

    #[test]
    fn slow_motion_uses_low_gains() {
        assert_eq!(params().gains(1.0, params().position), (0.5, 0.5));
    }

    #[test]
    fn fast_motion_uses_high_gains() {
        assert_eq!(params().gains(80.0, params().position), (0.9, 0.9));
    }

    #[test]
    fn gains_interpolate_between_bounds() {
        let (alpha, gamma) = params().gains(27.5, params().position);
        assert!((alpha - 0.7).abs() < 1e-12, "alpha should be ~0.7, got {alpha}");
        assert!((gamma - 0.7).abs() < 1e-12);

        let (alpha, _) = params().gains(5.0, params().position);
        assert!((alpha - 0.5).abs() < 1e-12);
        let (alpha, _) = params().gains(50.0, params().position);
        assert!((alpha - 0.9).abs() < 1e-12);
    }

    #[test]
    fn orientation_uses_its_own_bounds() {
        let (alpha, _) = params().gains(400.0, params().orientation);
        assert!((alpha - 0.7).abs() < 1e-12, "alpha should be ~0.7, got {alpha}");
    }

    // ── Filtering ───────────────────────────────────────────────────────────

    #[test]
    fn speed_drives_gains() {
        let mut filter = AdaptiveDoubleExponentialFilter::new(params(), 30.0);
        let mut scene = chain();
        assert_eq!(filter.current_gains(), (0.75, 0.75));

        for x in [0.0, 0.1, 0.2] {
            scene.set_absolute_position(JointType::Head, Vec3::new(x, 0.0, 0.0));
            scene.joint_mut(JointType::Head).unwrap().position_tracked = true;
            filter.filter(&[], &mut scene);
        }
        // 0.1 cm per frame at 30 Hz is 3 cm/s, below the low bound.
        assert_eq!(filter.current_gains(), (0.5, 0.5));

        scene.set_absolute_position(JointType::Head, Vec3::new(10.0, 0.0, 0.0));
        scene.joint_mut(JointType::Head).unwrap().position_tracked = true;
        filter.filter(&[], &mut scene);
        assert_eq!(filter.current_gains(), (0.9, 0.9));
    }

    #[test]
    fn arguments_override_defaults() {
        let args = Arguments::new()
            .with("alpha_low", 0.2)
            .with("velocity_high_orientation", 900);
        let p = AdaptiveParams::from_args(&args).unwrap();
        assert_eq!(p.alpha_low, 0.2);
        assert_eq!(p.orientation.high, 900.0);
        assert_eq!(p.gamma_low, 0.5);

        let args = Arguments::new().with("alpha_high", "quick");
        assert!(AdaptiveDoubleExponentialFilter::from_args(&args, 30.0).is_err());
    }
}
