//! Scene members: [`Joint`] and [`SensorNode`], plus the [`NodeId`] used to
//! address either one.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use embody_hal::Sensor;
use embody_types::{JointType, Quaternion, SensorData, Vec3};

use crate::node::TransformNode;

/// Stable handle of a sensor within one scene and all of its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorKey(pub(crate) u32);

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor#{}", self.0)
    }
}

/// Address of a scene member.  Parent links are always joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Joint(JointType),
    Sensor(SensorKey),
}

impl From<JointType> for NodeId {
    fn from(jt: JointType) -> Self {
        NodeId::Joint(jt)
    }
}

impl From<SensorKey> for NodeId {
    fn from(key: SensorKey) -> Self {
        NodeId::Sensor(key)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Joint
// ────────────────────────────────────────────────────────────────────────────

/// A named point of the body skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    joint_type: JointType,
    pub(crate) node: TransformNode,
    pub position_confidence: f64,
    pub orientation_confidence: f64,
    pub position_tracked: bool,
    pub orientation_tracked: bool,
    default_position: Vec3,
    default_orientation: Quaternion,
    pub(crate) parent: Option<JointType>,
    pub(crate) children: Vec<NodeId>,
}

impl Joint {
    /// A joint at its default pose.  Parentage is managed by the scene.
    pub(crate) fn new(
        joint_type: JointType,
        default_position: Vec3,
        default_orientation: Quaternion,
    ) -> Self {
        Self {
            joint_type,
            node: TransformNode::relative(default_position, default_orientation),
            position_confidence: 0.0,
            orientation_confidence: 0.0,
            position_tracked: false,
            orientation_tracked: false,
            default_position,
            default_orientation,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    pub fn node(&self) -> &TransformNode {
        &self.node
    }

    pub fn parent(&self) -> Option<JointType> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Child joints only, in insertion order.
    pub fn child_joints(&self) -> impl Iterator<Item = JointType> + '_ {
        self.children.iter().filter_map(|c| match c {
            NodeId::Joint(jt) => Some(*jt),
            NodeId::Sensor(_) => None,
        })
    }

    /// Last instant the position was tracked.
    pub fn position_timestamp(&self) -> DateTime<Utc> {
        self.node.position_timestamp
    }

    pub fn set_position_timestamp(&mut self, at: DateTime<Utc>) {
        self.node.position_timestamp = at;
    }

    /// Last instant the orientation was tracked.
    pub fn orientation_timestamp(&self) -> DateTime<Utc> {
        self.node.orientation_timestamp
    }

    pub fn set_orientation_timestamp(&mut self, at: DateTime<Utc>) {
        self.node.orientation_timestamp = at;
    }

    /// Default position relative to the parent.
    pub fn default_position(&self) -> Vec3 {
        self.default_position
    }

    /// Default orientation relative to the parent.
    pub fn default_orientation(&self) -> Quaternion {
        self.default_orientation
    }

    /// Replace the defaults and move the joint back onto them.
    pub(crate) fn reset_defaults(&mut self, position: Vec3, orientation: Quaternion) {
        self.default_position = position;
        self.default_orientation = orientation;
        self.node.set_relative_position(position);
        self.node.set_relative_orientation(orientation);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SensorNode
// ────────────────────────────────────────────────────────────────────────────

/// Where a sensor node gets its readings from.
#[derive(Clone)]
pub enum SensorSource {
    /// The running driver.
    Live(Arc<dyn Sensor>),
    /// Readings captured when the scene was cloned.
    Frozen(Arc<SensorData>),
}

impl fmt::Debug for SensorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorSource::Live(s) => f.debug_tuple("Live").field(&s.id()).finish(),
            SensorSource::Frozen(d) => f.debug_tuple("Frozen").field(&d.len()).finish(),
        }
    }
}

/// A sensor placed in the scene.
///
/// Cloning a live sensor node captures the driver's current readings; the
/// clone never talks to the driver again.
#[derive(Debug)]
pub struct SensorNode {
    key: SensorKey,
    id: String,
    kind: String,
    collects_absolute_data: bool,
    pub(crate) node: TransformNode,
    pub(crate) parent: Option<JointType>,
    source: SensorSource,
}

impl Clone for SensorNode {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            id: self.id.clone(),
            kind: self.kind.clone(),
            collects_absolute_data: self.collects_absolute_data,
            node: self.node.clone(),
            parent: self.parent,
            source: SensorSource::Frozen(self.current_data()),
        }
    }
}

impl SensorNode {
    pub(crate) fn new(key: SensorKey, sensor: Arc<dyn Sensor>, node: TransformNode) -> Self {
        Self {
            key,
            id: sensor.id().to_string(),
            kind: sensor.kind().to_string(),
            collects_absolute_data: sensor.collects_absolute_data(),
            node,
            parent: None,
            source: SensorSource::Live(sensor),
        }
    }

    pub fn key(&self) -> SensorKey {
        self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn collects_absolute_data(&self) -> bool {
        self.collects_absolute_data
    }

    pub fn node(&self) -> &TransformNode {
        &self.node
    }

    pub fn parent(&self) -> Option<JointType> {
        self.parent
    }

    /// The running driver, if this node has not been frozen.
    pub fn live(&self) -> Option<&Arc<dyn Sensor>> {
        match &self.source {
            SensorSource::Live(s) => Some(s),
            SensorSource::Frozen(_) => None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.source, SensorSource::Frozen(_))
    }

    /// Current readings: the driver's latest frame, or the captured one.
    pub fn current_data(&self) -> Arc<SensorData> {
        match &self.source {
            SensorSource::Live(s) => s.current_data(),
            SensorSource::Frozen(d) => Arc::clone(d),
        }
    }
}
