//! The [`Filter`] contract and the double-exponential smoothing state shared
//! by both filters.
//!
//! Per tracked channel of every joint a filter keeps the last output, the
//! last input, and the trend.  For a sample `x`:
//!
//! ```text
//! output' = α·x + (1 − α)·(output + trend)
//! trend'  = γ·(output' − output) + (1 − γ)·trend
//! ```
//!
//! The first sample only seeds `output`; the second only seeds
//! `trend = x − output`.  Neither alters the joint.  A channel that loses
//! tracking drops its state and restarts cold.

use std::collections::HashMap;
use std::sync::Arc;

use embody_scene::Scene;
use embody_types::{JointType, Quaternion, Vec3};

/// Smooths the fused joints of a scene over time.
pub trait Filter: Send {
    /// Registry name, e.g. `"double_exponential"`.
    fn name(&self) -> &'static str;

    /// Smooth `scene` in place.  `history` holds earlier frames, oldest
    /// first.
    fn filter(&mut self, history: &[Arc<Scene>], scene: &mut Scene);
}

// ────────────────────────────────────────────────────────────────────────────
// Smoothing state
// ────────────────────────────────────────────────────────────────────────────

/// A value the recurrence can be applied to component-wise.
pub(crate) trait Signal: Copy {
    fn plus(self, other: Self) -> Self;
    fn minus(self, other: Self) -> Self;
    fn times(self, k: f64) -> Self;
}

impl Signal for Vec3 {
    fn plus(self, other: Self) -> Self {
        self + other
    }
    fn minus(self, other: Self) -> Self {
        self - other
    }
    fn times(self, k: f64) -> Self {
        self.scale(k)
    }
}

impl Signal for Quaternion {
    fn plus(self, other: Self) -> Self {
        self.sum(other)
    }
    fn minus(self, other: Self) -> Self {
        self.sum(-other)
    }
    fn times(self, k: f64) -> Self {
        self.scale(k)
    }
}

/// Smoothing state of one channel of one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ChannelState<T> {
    pub output: T,
    pub input: T,
    pub trend: Option<T>,
}

impl<T: Signal> ChannelState<T> {
    fn seed(x: T) -> Self {
        Self {
            output: x,
            input: x,
            trend: None,
        }
    }

    /// Feed one sample.  Returns the smoothed value once a trend exists.
    fn step(&mut self, x: T, alpha: f64, gamma: f64) -> Option<T> {
        let smoothed = match self.trend {
            None => {
                self.trend = Some(x.minus(self.output));
                None
            }
            Some(trend) => {
                let output = x
                    .times(alpha)
                    .plus(self.output.plus(trend).times(1.0 - alpha));
                let trend = output
                    .minus(self.output)
                    .times(gamma)
                    .plus(trend.times(1.0 - gamma));
                self.output = output;
                self.trend = Some(trend);
                Some(output)
            }
        };
        self.input = x;
        smoothed
    }
}

/// Chooses α and γ for each sample.
pub(crate) trait Gains {
    fn position(&mut self, x: Vec3, last_input: Vec3) -> (f64, f64);
    fn orientation(&mut self, x: Quaternion, last_input: Quaternion) -> (f64, f64);
}

/// Per-joint smoothing state of both channels.
#[derive(Debug, Default)]
pub(crate) struct Smoother {
    position: HashMap<JointType, ChannelState<Vec3>>,
    orientation: HashMap<JointType, ChannelState<Quaternion>>,
}

impl Smoother {
    /// Smooth every joint of `scene`, parents before children.
    pub(crate) fn apply(&mut self, scene: &mut Scene, gains: &mut impl Gains) {
        let mut stack: Vec<JointType> = scene.root_joints().iter().rev().copied().collect();
        while let Some(jt) = stack.pop() {
            self.apply_joint(scene, jt, gains);
            if let Some(joint) = scene.joint(jt) {
                let children: Vec<JointType> = joint.child_joints().collect();
                stack.extend(children.into_iter().rev());
            }
        }
    }

    fn apply_joint(&mut self, scene: &mut Scene, jt: JointType, gains: &mut impl Gains) {
        let Some(joint) = scene.joint(jt) else {
            return;
        };
        let (position_tracked, orientation_tracked) =
            (joint.position_tracked, joint.orientation_tracked);

        match scene.absolute_position(jt).filter(|_| position_tracked) {
            None => {
                self.position.remove(&jt);
            }
            Some(x) => match self.position.get_mut(&jt) {
                None => {
                    self.position.insert(jt, ChannelState::seed(x));
                }
                Some(state) => {
                    let (alpha, gamma) = gains.position(x, state.input);
                    if let Some(out) = state.step(x, alpha, gamma) {
                        scene.set_absolute_position(jt, out);
                    }
                }
            },
        }

        match scene.absolute_orientation(jt).filter(|_| orientation_tracked) {
            None => {
                self.orientation.remove(&jt);
            }
            Some(x) => match self.orientation.get_mut(&jt) {
                None => {
                    self.orientation.insert(jt, ChannelState::seed(x));
                }
                Some(state) => {
                    let (alpha, gamma) = gains.orientation(x, state.input);
                    if let Some(out) = state.step(x, alpha, gamma) {
                        scene.set_absolute_orientation(jt, out.normalized());
                    }
                }
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn position_state(&self, jt: JointType) -> Option<&ChannelState<Vec3>> {
        self.position.get(&jt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_matches_hand_computation() {
        let mut s = ChannelState::seed(Vec3::new(0.0, 0.0, 0.0));
        assert!(s.step(Vec3::new(2.0, 0.0, 0.0), 0.5, 0.5).is_none());
        assert_eq!(s.trend, Some(Vec3::new(2.0, 0.0, 0.0)));

        // out' = 0.5·4 + 0.5·(0 + 2) = 3; trend' = 0.5·3 + 0.5·2 = 2.5
        let out = s.step(Vec3::new(4.0, 0.0, 0.0), 0.5, 0.5).unwrap();
        assert!((out.x - 3.0).abs() < 1e-12, "x should be ~3, got {}", out.x);
        assert!((s.trend.unwrap().x - 2.5).abs() < 1e-12);
        assert_eq!(s.input, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn quaternion_signal_is_component_wise() {
        let a = Quaternion::new(1.0, 2.0, 3.0, 4.0);
        let b = Quaternion::new(0.5, 0.5, 0.5, 0.5);
        assert_eq!(a.minus(b), Quaternion::new(0.5, 1.5, 2.5, 3.5));
        assert_eq!(a.times(2.0).plus(b), Quaternion::new(2.5, 4.5, 6.5, 8.5));
    }
}
