//! The built-in body skeleton.
//!
//! The model is assembled per body region (torso, hands, feet), each at a
//! chosen level of detail ([`ModelType`]).  Positions are centimetres
//! relative to the parent joint.  Without a torso, wrists and ankles become
//! roots placed in world coordinates.
//!
//! User-supplied [`JointOverride`]s are applied on top of the template in
//! order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use embody_types::{EmbodyError, JointType, Quaternion, Vec3};

use crate::scene::Scene;

use JointType::*;

/// Level of detail of one body region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Region omitted.
    None,
    /// Main joints only.
    #[default]
    #[serde(alias = "sparse")]
    Simple,
    /// Every joint, including fingers and toes.
    Complex,
}

/// One joint of the template.
#[derive(Debug, Clone, Copy, PartialEq)]
struct JointDef {
    joint: JointType,
    position: [f64; 3],
    orientation: [f64; 4],
    parent: Option<JointType>,
}

const IDENTITY: [f64; 4] = [1.0, 0.0, 0.0, 0.0];
const FLIPPED: [f64; 4] = [0.0, 1.0, 0.0, 0.0];

const fn def(
    joint: JointType,
    position: [f64; 3],
    orientation: [f64; 4],
    parent: Option<JointType>,
) -> JointDef {
    JointDef {
        joint,
        position,
        orientation,
        parent,
    }
}

/// A digit segment along the y axis of its parent, without own rotation.
const fn seg(joint: JointType, length: f64, parent: JointType) -> JointDef {
    def(joint, [0.0, length, 0.0], IDENTITY, Some(parent))
}

// ────────────────────────────────────────────────────────────────────────────
// Regions
// ────────────────────────────────────────────────────────────────────────────

fn torso(model: ModelType) -> Vec<JointDef> {
    if model == ModelType::None {
        return Vec::new();
    }
    let complex = model == ModelType::Complex;
    let r = [0.7071, 0.0, 0.0, 0.7071];
    let l = [0.7071, 0.0, 0.0, -0.7071];

    let mut defs = vec![
        def(SpineBase, [0.0, 20.0, 300.0], [0.0, 0.0, 1.0, 0.0], None),
        def(HipRight, [-17.9, 0.0, 0.0], r, Some(SpineBase)),
        def(KneeRight, [-41.0, 0.0, 0.0], r, Some(HipRight)),
        def(HipLeft, [17.9, 0.0, 0.0], l, Some(SpineBase)),
        def(KneeLeft, [41.0, 0.0, 0.0], l, Some(HipLeft)),
    ];
    if complex {
        defs.push(def(SpineMid, [0.0, 25.9, 0.0], IDENTITY, Some(SpineBase)));
        defs.push(def(SpineShoulder, [0.0, 25.9, 0.0], IDENTITY, Some(SpineMid)));
    } else {
        defs.push(def(SpineShoulder, [0.0, 51.8, 0.0], IDENTITY, Some(SpineBase)));
    }
    defs.extend([
        def(ShoulderRight, [-24.45, 0.0, 0.0], r, Some(SpineShoulder)),
        def(ElbowRight, [-39.0, 0.0, 0.0], r, Some(ShoulderRight)),
        def(ShoulderLeft, [24.45, 0.0, 0.0], l, Some(SpineShoulder)),
        def(ElbowLeft, [39.0, 0.0, 0.0], l, Some(ShoulderLeft)),
    ]);
    if complex {
        defs.push(def(Neck, [0.0, 12.5, 0.0], IDENTITY, Some(SpineShoulder)));
        defs.push(def(Head, [0.0, 12.5, 0.0], IDENTITY, Some(Neck)));
    } else {
        defs.push(def(Head, [0.0, 25.0, 0.0], IDENTITY, Some(SpineShoulder)));
    }
    defs
}

fn hands(model: ModelType, torso: ModelType) -> Vec<JointDef> {
    if model == ModelType::None {
        return Vec::new();
    }
    let mut defs = if torso == ModelType::None {
        vec![
            def(WristRight, [24.45, -6.19, 300.0], FLIPPED, None),
            def(WristLeft, [-24.45, -6.19, 300.0], FLIPPED, None),
        ]
    } else {
        vec![
            def(WristRight, [0.0, 39.0, 0.0], IDENTITY, Some(ElbowRight)),
            def(WristLeft, [0.0, 39.0, 0.0], IDENTITY, Some(ElbowLeft)),
        ]
    };
    defs.extend([
        def(HandCenterRight, [0.0, 8.0, 0.0], IDENTITY, Some(WristRight)),
        def(HandCenterLeft, [0.0, 8.0, 0.0], IDENTITY, Some(WristLeft)),
    ]);
    if model != ModelType::Complex {
        return defs;
    }

    let w = Some(WristRight);
    defs.extend([
        def(CmcSmallFingerRight, [-2.7, 1.2, 0.0], [0.829, 0.0, 0.0, 0.559], w),
        def(McpSmallFingerRight, [5.1, 2.7, 0.0], [0.857, 0.0, 0.0, -0.515], Some(CmcSmallFingerRight)),
        seg(PipSmallFingerRight, 4.1, McpSmallFingerRight),
        seg(DipSmallFingerRight, 2.2, PipSmallFingerRight),
        seg(BtipSmallFingerRight, 2.1, DipSmallFingerRight),
        def(CmcRingFingerRight, [-1.5, 1.7, 0.0], [0.927, 0.0, 0.0, 0.374], w),
        def(McpRingFingerRight, [4.4, 4.4, 0.0], [0.933, 0.0, 0.0, -0.358], Some(CmcRingFingerRight)),
        seg(PipRingFingerRight, 4.7, McpRingFingerRight),
        seg(DipRingFingerRight, 3.4, PipRingFingerRight),
        seg(BtipRingFingerRight, 2.2, DipRingFingerRight),
        def(CmcMiddleFingerRight, [0.4, 1.8, 0.0], [0.998, 0.0, 0.0, -0.061], w),
        def(McpMiddleFingerRight, [-0.4, 6.9, 0.0], [0.999, 0.0, 0.0, 0.017], Some(CmcMiddleFingerRight)),
        seg(PipMiddleFingerRight, 5.3, McpMiddleFingerRight),
        seg(DipMiddleFingerRight, 2.9, PipMiddleFingerRight),
        seg(BtipMiddleFingerRight, 2.4, DipMiddleFingerRight),
        def(CmcIndexFingerRight, [1.5, 1.7, 0.0], [0.933, 0.0, 0.0, -0.358], w),
        def(McpIndexFingerRight, [-3.6, 6.5, 0.0], [0.968, 0.0, 0.0, 0.250], Some(CmcIndexFingerRight)),
        seg(PipIndexFingerRight, 5.2, McpIndexFingerRight),
        seg(DipIndexFingerRight, 2.4, PipIndexFingerRight),
        seg(BtipIndexFingerRight, 2.2, DipIndexFingerRight),
        def(CmcThumbRight, [3.2, 0.7, 0.0], [0.788, 0.0, 0.0, -0.615], w),
        def(McpThumbRight, [-3.2, 4.0, 0.0], [0.942, 0.0, 0.0, 0.333], Some(CmcThumbRight)),
        seg(IpThumbRight, 3.9, McpThumbRight),
        seg(BtipThumbRight, 3.5, IpThumbRight),
    ]);

    let w = Some(WristLeft);
    defs.extend([
        def(CmcSmallFingerLeft, [2.7, 1.2, 0.0], [0.829, 0.0, 0.0, -0.559], w),
        def(McpSmallFingerLeft, [-5.1, 2.7, 0.0], [0.857, 0.0, 0.0, 0.515], Some(CmcSmallFingerLeft)),
        seg(PipSmallFingerLeft, 4.1, McpSmallFingerLeft),
        seg(DipSmallFingerLeft, 2.2, PipSmallFingerLeft),
        seg(BtipSmallFingerLeft, 2.1, DipSmallFingerLeft),
        def(CmcRingFingerLeft, [1.5, 1.7, 0.0], [0.927, 0.0, 0.0, -0.374], w),
        def(McpRingFingerLeft, [-4.4, 4.4, 0.0], [0.933, 0.0, 0.0, 0.358], Some(CmcRingFingerLeft)),
        seg(PipRingFingerLeft, 4.7, McpRingFingerLeft),
        seg(DipRingFingerLeft, 3.4, PipRingFingerLeft),
        seg(BtipRingFingerLeft, 2.2, DipRingFingerLeft),
        def(CmcMiddleFingerLeft, [-0.4, 1.8, 0.0], [0.998, 0.0, 0.0, 0.061], w),
        def(McpMiddleFingerLeft, [0.4, 6.9, 0.0], [0.999, 0.0, 0.0, -0.017], Some(CmcMiddleFingerLeft)),
        seg(PipMiddleFingerLeft, 5.3, McpMiddleFingerLeft),
        seg(DipMiddleFingerLeft, 2.9, PipMiddleFingerLeft),
        seg(BtipMiddleFingerLeft, 2.4, DipMiddleFingerLeft),
        def(CmcIndexFingerLeft, [-1.5, 1.7, 0.0], [0.933, 0.0, 0.0, 0.358], w),
        def(McpIndexFingerLeft, [3.6, 6.5, 0.0], [0.968, 0.0, 0.0, -0.250], Some(CmcIndexFingerLeft)),
        seg(PipIndexFingerLeft, 5.2, McpIndexFingerLeft),
        seg(DipIndexFingerLeft, 2.4, PipIndexFingerLeft),
        seg(BtipIndexFingerLeft, 2.2, DipIndexFingerLeft),
        def(CmcThumbLeft, [-3.2, 0.7, 0.0], [0.788, 0.0, 0.0, 0.615], w),
        def(McpThumbLeft, [3.2, 4.0, 0.0], [0.942, 0.0, 0.0, -0.333], Some(CmcThumbLeft)),
        seg(IpThumbLeft, 3.9, McpThumbLeft),
        seg(BtipThumbLeft, 3.5, IpThumbLeft),
    ]);
    defs
}

fn feet(model: ModelType, torso: ModelType) -> Vec<JointDef> {
    if model == ModelType::None {
        return Vec::new();
    }
    let mut defs = if torso == ModelType::None {
        vec![
            def(AnkleRight, [17.9, -75.8, 300.0], FLIPPED, None),
            def(AnkleLeft, [-17.9, -75.8, 300.0], FLIPPED, None),
        ]
    } else {
        vec![
            def(AnkleRight, [0.0, 54.8, 0.0], IDENTITY, Some(KneeRight)),
            def(AnkleLeft, [0.0, 54.8, 0.0], IDENTITY, Some(KneeLeft)),
        ]
    };
    defs.extend([
        def(FootCenterRight, [0.4, 5.0, 7.9], [0.865, 0.499, -0.015, 0.008], Some(AnkleRight)),
        def(FootCenterLeft, [-0.4, 5.0, 7.9], [0.865, 0.499, 0.015, -0.008], Some(AnkleLeft)),
    ]);
    if model != ModelType::Complex {
        return defs;
    }

    let toe_bend = [0.965, 0.258, 0.0, 0.0];

    let a = Some(AnkleRight);
    defs.extend([
        def(HeelBoneRight, [0.0, 8.0, -2.5], [0.989, -0.147, 0.0, 0.0], a),
        def(TmtSmallToeRight, [3.5, 5.0, 7.3], [0.873, 0.426, 0.209, -0.102], a),
        def(McpSmallToeRight, [-2.0, 9.0, 0.0], [0.999, 0.0, 0.0, 0.147], Some(TmtSmallToeRight)),
        def(PipSmallToeRight, [-0.4, 2.1, 1.0], [0.935, 0.321, -0.048, 0.139], Some(McpSmallToeRight)),
        seg(DipSmallToeRight, 1.1, PipSmallToeRight),
        seg(BtipSmallToeRight, 1.0, DipSmallToeRight),
        def(TmtRingToeRight, [1.6, 5.0, 7.8], [0.874, 0.474, 0.091, -0.049], a),
        def(McpRingToeRight, [-0.4, 9.7, 0.0], [0.999, 0.0, 0.0, 0.017], Some(TmtRingToeRight)),
        def(PipRingToeRight, [-0.4, 2.1, 1.0], [0.953, 0.282, -0.029, 0.1], Some(McpRingToeRight)),
        seg(DipRingToeRight, 1.9, PipRingToeRight),
        seg(BtipRingToeRight, 1.4, DipRingToeRight),
        def(TmtMiddleToeRight, [0.4, 5.0, 7.9], [0.865, 0.499, -0.015, 0.008], a),
        def(McpMiddleToeRight, [0.7, 10.2, 0.0], [0.999, 0.0, 0.0, -0.034], Some(TmtMiddleToeRight)),
        def(PipMiddleToeRight, [0.0, 2.8, 1.4], toe_bend, Some(McpMiddleToeRight)),
        seg(DipMiddleToeRight, 1.2, PipMiddleToeRight),
        seg(BtipMiddleToeRight, 1.7, DipMiddleToeRight),
        def(TmtLongToeRight, [-0.9, 5.0, 8.0], [0.865, 0.499, -0.030, 0.017], a),
        def(McpLongToeRight, [0.4, 10.2, 0.0], [0.999, 0.0, 0.0, -0.034], Some(TmtLongToeRight)),
        def(PipLongToeRight, [0.0, 2.3, 1.2], toe_bend, Some(McpLongToeRight)),
        seg(DipLongToeRight, 1.5, PipLongToeRight),
        seg(BtipLongToeRight, 2.4, DipLongToeRight),
        def(TmtBigToeRight, [-2.6, 5.0, 8.0], [0.855, 0.493, -0.135, 0.078], a),
        def(MtpBigToeRight, [2.1, 10.1, 0.0], [0.991, 0.0, 0.0, -0.130], Some(TmtBigToeRight)),
        def(IpBigToeRight, [0.0, 2.8, 1.4], toe_bend, Some(MtpBigToeRight)),
        seg(BtipBigToeRight, 3.0, IpBigToeRight),
    ]);

    let a = Some(AnkleLeft);
    defs.extend([
        def(HeelBoneLeft, [0.0, 8.0, -2.5], [0.989, -0.147, 0.0, 0.0], a),
        def(TmtSmallToeLeft, [-3.5, 5.0, 7.3], [0.873, 0.426, -0.209, 0.102], a),
        def(McpSmallToeLeft, [2.0, 9.0, 0.0], [0.999, 0.0, 0.0, -0.147], Some(TmtSmallToeLeft)),
        def(PipSmallToeLeft, [0.4, 2.1, 1.0], [0.935, 0.321, 0.048, -0.139], Some(McpSmallToeLeft)),
        seg(DipSmallToeLeft, 1.1, PipSmallToeLeft),
        seg(BtipSmallToeLeft, 1.0, DipSmallToeLeft),
        def(TmtRingToeLeft, [-1.6, 5.0, 7.8], [0.874, 0.474, -0.091, 0.049], a),
        def(McpRingToeLeft, [0.4, 9.7, 0.0], [0.999, 0.0, 0.0, -0.017], Some(TmtRingToeLeft)),
        def(PipRingToeLeft, [0.4, 2.1, 1.0], [0.953, 0.282, 0.029, -0.1], Some(McpRingToeLeft)),
        seg(DipRingToeLeft, 1.9, PipRingToeLeft),
        seg(BtipRingToeLeft, 1.4, DipRingToeLeft),
        def(TmtMiddleToeLeft, [-0.4, 5.0, 7.9], [0.865, 0.499, 0.015, -0.008], a),
        def(McpMiddleToeLeft, [-0.7, 10.2, 0.0], [0.999, 0.0, 0.0, 0.034], Some(TmtMiddleToeLeft)),
        def(PipMiddleToeLeft, [0.0, 2.8, 1.4], toe_bend, Some(McpMiddleToeLeft)),
        seg(DipMiddleToeLeft, 1.2, PipMiddleToeLeft),
        seg(BtipMiddleToeLeft, 1.7, DipMiddleToeLeft),
        def(TmtLongToeLeft, [0.9, 5.0, 8.0], [0.865, 0.499, 0.030, -0.017], a),
        def(McpLongToeLeft, [-0.4, 10.2, 0.0], [0.999, 0.0, 0.0, 0.034], Some(TmtLongToeLeft)),
        def(PipLongToeLeft, [0.0, 2.3, 1.2], toe_bend, Some(McpLongToeLeft)),
        seg(DipLongToeLeft, 1.5, PipLongToeLeft),
        seg(BtipLongToeLeft, 2.4, DipLongToeLeft),
        def(TmtBigToeLeft, [2.6, 5.0, 8.0], [0.855, 0.493, 0.135, -0.078], a),
        def(MtpBigToeLeft, [-2.1, 10.1, 0.0], [0.991, 0.0, 0.0, 0.130], Some(TmtBigToeLeft)),
        def(IpBigToeLeft, [0.0, 2.8, 1.4], toe_bend, Some(MtpBigToeLeft)),
        seg(BtipBigToeLeft, 3.0, IpBigToeLeft),
    ]);
    defs
}

// ────────────────────────────────────────────────────────────────────────────
// Template and overrides
// ────────────────────────────────────────────────────────────────────────────

/// Re-parents an existing joint or adds a new one.
///
/// Missing defaults are the zero offset and the identity rotation.  A
/// missing parent makes the joint a root.
#[derive(Debug, Clone, PartialEq)]
pub struct JointOverride {
    pub joint: JointType,
    pub parent: Option<JointType>,
    pub default_position: Option<Vec3>,
    pub default_orientation: Option<Quaternion>,
}

/// Level of detail per body region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkeletonTemplate {
    #[serde(default)]
    pub torso: ModelType,
    #[serde(default)]
    pub hands: ModelType,
    #[serde(default)]
    pub feet: ModelType,
}

impl SkeletonTemplate {
    pub fn new(torso: ModelType, hands: ModelType, feet: ModelType) -> Self {
        Self { torso, hands, feet }
    }

    /// Build a scene holding the template joints.
    ///
    /// # Errors
    ///
    /// Propagates [`Scene::add_joint`] failures, which indicate a broken
    /// template.
    pub fn build(&self) -> Result<Scene, EmbodyError> {
        self.build_with(&[])
    }

    /// Build the template, then apply `overrides` in order.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::JointNotInModel`] when an override names a parent
    ///   that is not defined at that point.
    /// - [`EmbodyError::Config`] when an override would create a cycle.
    pub fn build_with(&self, overrides: &[JointOverride]) -> Result<Scene, EmbodyError> {
        let mut scene = Scene::new();
        let defs = torso(self.torso)
            .into_iter()
            .chain(hands(self.hands, self.torso))
            .chain(feet(self.feet, self.torso));
        for d in defs {
            let orientation = Quaternion::try_from(d.orientation)?;
            scene.add_joint(d.joint, Vec3::from(d.position), orientation, d.parent)?;
        }

        for o in overrides {
            debug!(joint = %o.joint, parent = ?o.parent, "applying joint override");
            scene.define_joint(
                o.joint,
                o.default_position.unwrap_or_default(),
                o.default_orientation.unwrap_or_default(),
                o.parent,
            )?;
        }

        if scene.joint_count() == 0 {
            warn!("the body model is empty");
        }
        Ok(scene)
    }
}
