//! Double-exponential smoothing with fixed gains.

use std::sync::Arc;

use tracing::debug;

use embody_scene::Scene;
use embody_types::{Arguments, EmbodyError, Quaternion, Vec3};

use crate::filter::{Filter, Gains, Smoother};

#[derive(Debug, Clone, Copy, PartialEq)]
struct FixedGains {
    alpha: f64,
    gamma: f64,
}

impl Gains for FixedGains {
    fn position(&mut self, _x: Vec3, _last_input: Vec3) -> (f64, f64) {
        (self.alpha, self.gamma)
    }

    fn orientation(&mut self, _x: Quaternion, _last_input: Quaternion) -> (f64, f64) {
        (self.alpha, self.gamma)
    }
}

/// Holt double-exponential smoothing; see [`crate::filter`] for the
/// recurrence.
#[derive(Debug)]
pub struct DoubleExponentialFilter {
    gains: FixedGains,
    smoother: Smoother,
}

impl DoubleExponentialFilter {
    pub const NAME: &'static str = "double_exponential";
    pub const DEFAULT_ALPHA: f64 = 0.75;
    pub const DEFAULT_GAMMA: f64 = 0.75;

    const KEYS: &'static [&'static str] = &["alpha", "gamma"];

    /// `alpha` weighs the new sample, `gamma` the new trend.
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Self {
            gains: FixedGains { alpha, gamma },
            smoother: Smoother::default(),
        }
    }

    /// Construct from configuration (`alpha`, `gamma`).
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] for unparsable values.
    pub fn from_args(args: &Arguments) -> Result<Self, EmbodyError> {
        args.warn_unknown(Self::NAME, Self::KEYS);
        let alpha = args.parse_or("alpha", Self::DEFAULT_ALPHA)?;
        let gamma = args.parse_or("gamma", Self::DEFAULT_GAMMA)?;
        debug!(alpha, gamma, "double exponential filter configured");
        Ok(Self::new(alpha, gamma))
    }
}

impl Default for DoubleExponentialFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA, Self::DEFAULT_GAMMA)
    }
}

impl Filter for DoubleExponentialFilter {
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

    fn track(scene: &mut Scene, x: f64) {
        scene.set_absolute_position(JointType::Head, Vec3::new(x, 0.0, 0.0));
        scene.joint_mut(JointType::Head).unwrap().position_tracked = true;
    }

    fn head_x(scene: &Scene) -> f64 {
        scene.absolute_position(JointType::Head).unwrap().x
    }

    #[test]
    fn bootstrap_then_smooth() {
        let mut filter = DoubleExponentialFilter::new(0.5, 0.5);
        let mut scene = chain();

        // First sample: recorded, untouched.
        track(&mut scene, 0.0);
        filter.filter(&[], &mut scene);
        assert_eq!(head_x(&scene), 0.0);

        // Second sample: trend only, untouched.
        track(&mut scene, 2.0);
        filter.filter(&[], &mut scene);
        assert_eq!(head_x(&scene), 2.0);

        // Third sample: full recurrence, 0.5·4 + 0.5·(0 + 2) = 3.
        track(&mut scene, 4.0);
        filter.filter(&[], &mut scene);
        assert!((head_x(&scene) - 3.0).abs() < 1e-12, "x should be ~3, got {}", head_x(&scene));
    }

    #[test]
    fn losing_tracking_drops_state() {
        let mut filter = DoubleExponentialFilter::default();
        let mut scene = chain();
        track(&mut scene, 1.0);
        filter.filter(&[], &mut scene);
        assert!(filter.smoother.position_state(JointType::Head).is_some());

        scene.joint_mut(JointType::Head).unwrap().position_tracked = false;
        filter.filter(&[], &mut scene);
        assert!(filter.smoother.position_state(JointType::Head).is_none());

        // Resuming starts cold: the next sample is a first sample again.
        track(&mut scene, 9.0);
        filter.filter(&[], &mut scene);
        assert_eq!(head_x(&scene), 9.0);
        assert_eq!(filter.smoother.position_state(JointType::Head).unwrap().trend, None);
    }

    #[test]
    fn orientation_output_is_normalised() {
        let mut filter = DoubleExponentialFilter::new(0.5, 0.5);
        let mut scene = chain();
        for q in [
            Quaternion::identity(),
            Quaternion::new(0.0, 0.0, 0.0, 1.0),
            Quaternion::new(0.0, 0.0, 0.0, 1.0),
        ] {
            scene.set_absolute_orientation(JointType::Head, q);
            scene.joint_mut(JointType::Head).unwrap().orientation_tracked = true;
            filter.filter(&[], &mut scene);
        }
        let q = scene.absolute_orientation(JointType::Head).unwrap();
        assert!((q.norm() - 1.0).abs() < 1e-12, "norm should be 1, got {}", q.norm());
    }

    #[test]
    fn unparsable_argument_is_rejected() {
        let args = Arguments::new().with("alpha", "fast");
        assert!(DoubleExponentialFilter::from_args(&args).is_err());
        let args = Arguments::new().with("gamma", 0.3);
        let f = DoubleExponentialFilter::from_args(&args).unwrap();
        assert_eq!(f.gains, FixedGains { alpha: 0.75, gamma: 0.3 });
    }
}
