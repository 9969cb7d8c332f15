//! The [`Fuser`] contract and the scene traversal shared by every fusion
//! policy.
//!
//! A fusion pass reads each sensor's latest frame once, then visits the
//! joint tree twice:
//!
//! 1. From the roots down through the *sensor-depending* joints (every
//!    ancestor of a sensor's parent joint).  Each is fused before its
//!    children, and the sensors hanging from it are re-anchored to it, so a
//!    sensor reporting in its own frame is placed by its freshly fused
//!    parent.
//! 2. Over every remaining joint.
//!
//! How the candidates of one channel are combined is the only thing a
//! policy decides; see [`Blend`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{trace, warn};

use embody_scene::{NodeId, Pose, Scene, SensorKey};
use embody_types::{JointType, Quaternion, SensorData, Vec3};

/// Merges the sensors' candidate readings into the joints of a scene.
pub trait Fuser: Send {
    /// Registry name, e.g. `"confidence_weighted"`.
    fn name(&self) -> &'static str;

    /// Write a fused pose, confidence, and tracking state into every joint
    /// of `scene`.  `now` stamps tracked channels and drives
    /// return-to-default.
    fn fuse(&mut self, scene: &mut Scene, now: DateTime<Utc>);
}

/// One reading of one channel, already in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<T> {
    pub value: T,
    pub confidence: f64,
}

/// Combines the candidates of one channel of one joint.
///
/// Candidates arrive in sensor order.  Returning `None` leaves the channel
/// untracked.
pub trait Blend {
    fn blend_positions(&self, candidates: &[Candidate<Vec3>]) -> Option<Candidate<Vec3>>;
    fn blend_orientations(
        &self,
        candidates: &[Candidate<Quaternion>],
    ) -> Option<Candidate<Quaternion>>;
}

struct Source {
    key: SensorKey,
    id: String,
    absolute: bool,
    data: Arc<SensorData>,
}

/// State of one fusion pass over a scene.
struct FusionPass<'a, B: Blend + ?Sized> {
    blend: &'a B,
    sources: Vec<Source>,
    depending: HashSet<JointType>,
    now: DateTime<Utc>,
    return_to_default: TimeDelta,
}

/// Run one fusion pass of `blend` over `scene`.
pub(crate) fn fuse_scene<B: Blend + ?Sized>(
    blend: &B,
    scene: &mut Scene,
    now: DateTime<Utc>,
    return_to_default: TimeDelta,
) {
    let sources: Vec<Source> = scene
        .sensors()
        .map(|s| Source {
            key: s.key(),
            id: s.id().to_string(),
            absolute: s.collects_absolute_data(),
            data: s.current_data(),
        })
        .collect();

    let mut depending = HashSet::new();
    for sensor in scene.sensors() {
        let mut cursor = sensor.parent();
        while let Some(jt) = cursor {
            if !depending.insert(jt) {
                break;
            }
            cursor = scene.parent(jt);
        }
    }

    let pass = FusionPass {
        blend,
        sources,
        depending,
        now,
        return_to_default,
    };

    let roots = scene.root_joints().to_vec();
    for &root in &roots {
        if pass.depending.contains(&root) {
            pass.update_depending(scene, root);
        }
    }
    for &root in &roots {
        pass.update_remaining(scene, root);
    }
}

impl<B: Blend + ?Sized> FusionPass<'_, B> {
    fn update_depending(&self, scene: &mut Scene, jt: JointType) {
        self.update_joint(scene, jt);

        let children = scene
            .joint(jt)
            .map(|j| j.children().to_vec())
            .unwrap_or_default();
        for child in children {
            match child {
                NodeId::Joint(c) if self.depending.contains(&c) => self.update_depending(scene, c),
                NodeId::Joint(_) => {}
                NodeId::Sensor(key) => {
                    scene.clear_absolute_position(key);
                    scene.clear_absolute_orientation(key);
                }
            }
        }
    }

    fn update_remaining(&self, scene: &mut Scene, jt: JointType) {
        if !self.depending.contains(&jt) {
            self.update_joint(scene, jt);
        }
        let children: Vec<JointType> = scene
            .joint(jt)
            .map(|j| j.child_joints().collect())
            .unwrap_or_default();
        for child in children {
            self.update_remaining(scene, child);
        }
    }

    fn update_joint(&self, scene: &mut Scene, jt: JointType) {
        let mut positions = Vec::new();
        let mut orientations = Vec::new();
        for source in &self.sources {
            let Some(reading) = source.data.get(&jt) else {
                continue;
            };
            // Readings in the sensor's own frame are placed by its current pose.
            let frame: Option<Pose> = if source.absolute {
                None
            } else {
                scene.absolute_pose(source.key)
            };
            match reading.position {
                Some(p) if p.is_finite() && reading.position_confidence.is_finite() => {
                    positions.push(Candidate {
                        value: frame.map_or(p, |f| f.to_absolute_position(p)),
                        confidence: reading.position_confidence,
                    });
                }
                Some(_) => {
                    warn!(sensor = %source.id, joint = %jt, "dropping non-finite position reading")
                }
                None => {}
            }
            match reading.orientation {
                Some(q) if q.is_finite() && reading.orientation_confidence.is_finite() => {
                    orientations.push(Candidate {
                        value: frame.map_or(q, |f| f.to_absolute_orientation(q)),
                        confidence: reading.orientation_confidence,
                    });
                }
                Some(_) => {
                    warn!(sensor = %source.id, joint = %jt, "dropping non-finite orientation reading")
                }
                None => {}
            }
        }

        let position = self.blend.blend_positions(&positions);
        let orientation = self.blend.blend_orientations(&orientations);
        trace!(
            joint = %jt,
            position_candidates = positions.len(),
            orientation_candidates = orientations.len(),
            "fusing joint"
        );

        match position {
            Some(c) => scene.set_absolute_position(jt, c.value),
            None => {
                scene.clear_absolute_position(jt);
                let stale = scene
                    .joint(jt)
                    .filter(|j| self.now - j.position_timestamp() >= self.return_to_default)
                    .map(|j| j.default_position());
                if let Some(default) = stale {
                    scene.set_relative_position(jt, default);
                }
            }
        }
        match orientation {
            Some(c) => scene.set_absolute_orientation(jt, c.value),
            None => {
                scene.clear_absolute_orientation(jt);
                let stale = scene
                    .joint(jt)
                    .filter(|j| self.now - j.orientation_timestamp() >= self.return_to_default)
                    .map(|j| j.default_orientation());
                if let Some(default) = stale {
                    scene.set_relative_orientation(jt, default);
                }
            }
        }

        let Some(joint) = scene.joint_mut(jt) else {
            return;
        };
        joint.position_tracked = position.is_some();
        joint.orientation_tracked = orientation.is_some();
        joint.position_confidence = position.map_or(0.0, |c| c.confidence);
        joint.orientation_confidence = orientation.map_or(0.0, |c| c.confidence);
        if position.is_some() {
            joint.set_position_timestamp(self.now);
        }
        if orientation.is_some() {
            joint.set_orientation_timestamp(self.now);
        }
    }
}

/// Convert a configured return-to-default delay into a [`TimeDelta`].
pub(crate) fn time_delta(d: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, chain, fixed};
    use embody_types::CandidateJoint;

    /// Takes the first candidate of each channel.
    struct First;

    impl Blend for First {
        fn blend_positions(&self, c: &[Candidate<Vec3>]) -> Option<Candidate<Vec3>> {
            c.first().copied()
        }
        fn blend_orientations(&self, c: &[Candidate<Quaternion>]) -> Option<Candidate<Quaternion>> {
            c.first().copied()
        }
    }

    fn two_seconds() -> TimeDelta {
        TimeDelta::milliseconds(2000)
    }

    #[test]
    fn tracked_channel_is_stamped() {
        let mut scene = chain();
        let frame = SensorData::from([(
            JointType::Head,
            CandidateJoint::new().with_position(Vec3::new(1.0, 2.0, 3.0), 0.7),
        )]);
        scene
            .add_sensor(fixed("cam", frame, true), None, Vec3::zero(), Quaternion::identity())
            .unwrap();

        fuse_scene(&First, &mut scene, at(100), two_seconds());

        let head = scene.joint(JointType::Head).unwrap();
        assert!(head.position_tracked);
        assert!(!head.orientation_tracked);
        assert!((head.position_confidence - 0.7).abs() < 1e-12);
        assert_eq!(head.position_timestamp(), at(100));
        assert_eq!(scene.absolute_position(JointType::Head).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(head.orientation_confidence, 0.0);
    }

    #[test]
    fn relative_readings_use_sensor_pose() {
        let mut scene = chain();
        let frame = SensorData::from([(
            JointType::WristLeft,
            CandidateJoint::new()
                .with_position(Vec3::new(0.0, 0.0, 10.0), 1.0)
                .with_orientation(Quaternion::identity(), 1.0),
        )]);
        // Sensor on SPINE_BASE at (0,20,300), offset 5 along x.
        scene
            .add_sensor(
                fixed("head-cam", frame, false),
                Some(JointType::SpineBase),
                Vec3::new(5.0, 0.0, 0.0),
                Quaternion::identity(),
            )
            .unwrap();

        fuse_scene(&First, &mut scene, at(0), two_seconds());

        let wrist = scene.absolute_position(JointType::WristLeft).unwrap();
        assert!(wrist.distance(Vec3::new(5.0, 20.0, 310.0)) < 1e-9, "got {wrist:?}");
    }

    #[test]
    fn untracked_child_follows_fused_parent() {
        let mut scene = chain();
        let frame = SensorData::from([(
            JointType::SpineBase,
            CandidateJoint::new().with_position(Vec3::new(0.0, 0.0, 0.0), 1.0),
        )]);
        scene
            .add_sensor(fixed("cam", frame, true), None, Vec3::zero(), Quaternion::identity())
            .unwrap();

        fuse_scene(&First, &mut scene, at(0), two_seconds());

        let head = scene.absolute_position(JointType::Head).unwrap();
        assert!((head.y - 76.8).abs() < 1e-9, "head y should be ~76.8, got {}", head.y);
        assert!(!scene.joint(JointType::Head).unwrap().position_tracked);
    }

    #[test]
    fn return_to_default_after_threshold() {
        let mut scene = chain();
        let sensor = fixed(
            "cam",
            SensorData::from([(
                JointType::Head,
                CandidateJoint::new().with_position(Vec3::new(0.0, 200.0, 300.0), 1.0),
            )]),
            true,
        );
        scene
            .add_sensor(sensor.clone(), None, Vec3::zero(), Quaternion::identity())
            .unwrap();

        fuse_scene(&First, &mut scene, at(0), two_seconds());
        sensor.set_frame(SensorData::new());

        // Just under the threshold the last fused pose is kept.
        fuse_scene(&First, &mut scene, at(1999), two_seconds());
        let rel = scene.relative_position(JointType::Head).unwrap();
        assert!((rel.y - (200.0 - 71.8)).abs() < 1e-9, "relative y should be kept, got {}", rel.y);

        fuse_scene(&First, &mut scene, at(2000), two_seconds());
        let rel = scene.relative_position(JointType::Head).unwrap();
        assert_eq!(rel, Vec3::new(0.0, 25.0, 0.0));
        assert!(!scene.joint(JointType::Head).unwrap().position_tracked);
    }

    #[test]
    fn non_finite_readings_are_dropped() {
        let mut scene = chain();
        let bad = SensorData::from([(
            JointType::SpineShoulder,
            CandidateJoint::new()
                .with_position(Vec3::new(0.0, 80.0, 300.0), 0.6)
                .with_orientation(Quaternion::new(f64::NAN, 0.0, 0.0, 0.0), 0.6),
        )]);
        let worse = SensorData::from([(
            JointType::SpineShoulder,
            CandidateJoint::new().with_position(Vec3::new(f64::INFINITY, 0.0, 0.0), 0.9),
        )]);
        scene
            .add_sensor(fixed("a", bad, true), None, Vec3::zero(), Quaternion::identity())
            .unwrap();
        scene
            .add_sensor(fixed("b", worse, true), None, Vec3::zero(), Quaternion::identity())
            .unwrap();

        fuse_scene(&First, &mut scene, at(0), two_seconds());

        let shoulder = scene.joint(JointType::SpineShoulder).unwrap();
        assert!(shoulder.position_tracked, "the finite position must still count");
        assert!(!shoulder.orientation_tracked);
        assert_eq!(shoulder.orientation_confidence, 0.0);
        let head = scene.absolute_position(JointType::Head).unwrap();
        assert!(head.is_finite(), "head must stay finite, got {head:?}");
        assert!((head.y - 105.0).abs() < 1e-9, "head y should be ~105, got {}", head.y);
    }

    #[test]
    fn sensor_children_of_depending_joints_are_reanchored() {
        let mut scene = chain();
        let key = scene
            .add_sensor(
                fixed("cam", SensorData::new(), false),
                Some(JointType::SpineShoulder),
                Vec3::new(0.0, 1.0, 0.0),
                Quaternion::identity(),
            )
            .unwrap();
        scene.clear_relative_position(key);
        assert!(scene.sensor(key).unwrap().node().position_channel().is_absolute());

        fuse_scene(&First, &mut scene, at(0), two_seconds());
        assert!(!scene.sensor(key).unwrap().node().position_channel().is_absolute());
    }
}
