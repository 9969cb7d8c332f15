//! Confidence-Dominance fusion: per channel, the single most confident
//! reading wins outright.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use embody_scene::Scene;
use embody_types::{Arguments, Quaternion, Vec3};

use crate::fuser::{Blend, Candidate, Fuser, fuse_scene, time_delta};

/// Picks, per channel, the candidate with the strictly highest confidence.
/// Ties keep the earlier sensor; a confidence of 0 never wins.
#[derive(Debug, Clone)]
pub struct ConfidenceDominanceFuser {
    return_to_default: TimeDelta,
}

impl ConfidenceDominanceFuser {
    pub const NAME: &'static str = "confidence_dominance";

    pub fn new(return_to_default: Duration) -> Self {
        Self {
            return_to_default: time_delta(return_to_default),
        }
    }

    /// Construct from configuration.  The fuser takes no arguments.
    pub fn from_args(return_to_default: Duration, args: &Arguments) -> Self {
        args.warn_unknown(Self::NAME, &[]);
        Self::new(return_to_default)
    }
}

fn dominant<T: Copy>(candidates: &[Candidate<T>]) -> Option<Candidate<T>> {
    let mut best: Option<Candidate<T>> = None;
    for c in candidates {
        if c.confidence > best.map_or(0.0, |b| b.confidence) {
            best = Some(*c);
        }
    }
    best
}

impl Blend for ConfidenceDominanceFuser {
    fn blend_positions(&self, candidates: &[Candidate<Vec3>]) -> Option<Candidate<Vec3>> {
        dominant(candidates)
    }

    fn blend_orientations(
        &self,
        candidates: &[Candidate<Quaternion>],
    ) -> Option<Candidate<Quaternion>> {
        dominant(candidates)
    }
}

impl Fuser for ConfidenceDominanceFuser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fuse(&mut self, scene: &mut Scene, now: DateTime<Utc>) {
        fuse_scene(&*self, scene, now, self.return_to_default);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, chain, fixed};
    use embody_types::{CandidateJoint, JointType, SensorData};

    fn c(x: f64, confidence: f64) -> Candidate<Vec3> {
        Candidate {
            value: Vec3::new(x, 0.0, 0.0),
            confidence,
        }
    }

    #[test]
    fn highest_confidence_wins() {
        let best = dominant(&[c(1.0, 0.3), c(2.0, 0.8), c(3.0, 0.5)]).unwrap();
        assert_eq!(best.value.x, 2.0);
    }

    #[test]
    fn ties_keep_first() {
        let best = dominant(&[c(1.0, 0.6), c(2.0, 0.6)]).unwrap();
        assert_eq!(best.value.x, 1.0);
    }

    #[test]
    fn zero_confidence_never_wins() {
        assert!(dominant(&[c(1.0, 0.0)]).is_none());
        assert!(dominant::<Vec3>(&[]).is_none());
    }

    #[test]
    fn fused_pose_equals_dominant_candidate_exactly() {
        let mut scene = chain();
        let low = CandidateJoint::new()
            .with_position(Vec3::new(1.0, 2.0, 3.0), 0.3)
            .with_orientation(Quaternion::new(0.0, 1.0, 0.0, 0.0), 0.9);
        let high = CandidateJoint::new()
            .with_position(Vec3::new(-4.0, 5.5, 6.25), 0.8)
            .with_orientation(Quaternion::identity(), 0.2);
        for (id, reading) in [("a", low), ("b", high)] {
            let frame = SensorData::from([(JointType::Head, reading)]);
            scene
                .add_sensor(fixed(id, frame, true), None, Vec3::zero(), Quaternion::identity())
                .unwrap();
        }

        let mut fuser = ConfidenceDominanceFuser::new(Duration::from_millis(2000));
        fuser.fuse(&mut scene, at(0));

        let head = scene.joint(JointType::Head).unwrap();
        assert_eq!(scene.absolute_position(JointType::Head).unwrap(), Vec3::new(-4.0, 5.5, 6.25));
        assert_eq!(
            scene.absolute_orientation(JointType::Head).unwrap(),
            Quaternion::new(0.0, 1.0, 0.0, 0.0)
        );
        assert_eq!(head.position_confidence, 0.8);
        assert_eq!(head.orientation_confidence, 0.9);
    }
}
