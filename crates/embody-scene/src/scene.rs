//! [`Scene`] – one consistent snapshot of the body model.
//!
//! The scene owns every [`Joint`] (keyed by [`JointType`]) and every
//! [`SensorNode`].  Parent links are stored as joint keys and child lists as
//! [`NodeId`]s, so the tree holds no reference cycles and a plain
//! [`Clone`] yields a fully independent copy.  Cloning freezes sensors: the
//! copy carries the readings captured at clone time.
//!
//! All pose reads and channel writes go through the scene because deriving
//! one representation from the other needs the parent's absolute pose.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use embody_hal::Sensor;
use embody_types::{EmbodyError, JointType, Quaternion, Vec3};

use crate::joint::{Joint, NodeId, SensorKey, SensorNode};
use crate::node::{Pose, TransformNode};

#[derive(Debug, Clone, Default)]
struct Roots {
    joints: Vec<JointType>,
    nodes: Vec<NodeId>,
}

/// The joint hierarchy, the sensors placed in it, and the instant the
/// snapshot was produced.
#[derive(Debug, Clone)]
pub struct Scene {
    joints: BTreeMap<JointType, Joint>,
    sensors: BTreeMap<SensorKey, SensorNode>,
    next_sensor_key: u32,
    timestamp: DateTime<Utc>,
    roots: OnceLock<Roots>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            joints: BTreeMap::new(),
            sensors: BTreeMap::new(),
            next_sensor_key: 0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            roots: OnceLock::new(),
        }
    }
}

impl Scene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    // ────────────────────────────────────────────────────────────────────────
    // Joints
    // ────────────────────────────────────────────────────────────────────────

    /// Add a joint at its default pose below `parent`.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::Config`] when a joint of that type already exists.
    /// - [`EmbodyError::JointNotInModel`] when `parent` is not defined yet.
    pub fn add_joint(
        &mut self,
        joint_type: JointType,
        default_position: Vec3,
        default_orientation: Quaternion,
        parent: Option<JointType>,
    ) -> Result<(), EmbodyError> {
        if self.joints.contains_key(&joint_type) {
            return Err(EmbodyError::Config(format!(
                "joint {joint_type} is defined twice"
            )));
        }
        self.require_joint(parent)?;
        self.joints.insert(
            joint_type,
            Joint::new(joint_type, default_position, default_orientation),
        );
        self.attach(NodeId::Joint(joint_type), parent);
        Ok(())
    }

    /// Replace the definition of `joint_type`, or add it when absent.
    ///
    /// An existing joint keeps its children, takes `parent` as its new parent
    /// (`None` makes it a root) and is moved back onto the new defaults.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::JointNotInModel`] when `parent` is not defined.
    /// - [`EmbodyError::Config`] when `parent` lies below `joint_type`.
    pub fn define_joint(
        &mut self,
        joint_type: JointType,
        default_position: Vec3,
        default_orientation: Quaternion,
        parent: Option<JointType>,
    ) -> Result<(), EmbodyError> {
        if !self.joints.contains_key(&joint_type) {
            return self.add_joint(joint_type, default_position, default_orientation, parent);
        }
        self.set_parent(NodeId::Joint(joint_type), parent)?;
        if let Some(joint) = self.joints.get_mut(&joint_type) {
            joint.reset_defaults(default_position, default_orientation);
        }
        Ok(())
    }

    pub fn contains_joint(&self, joint_type: JointType) -> bool {
        self.joints.contains_key(&joint_type)
    }

    pub fn joint(&self, joint_type: JointType) -> Option<&Joint> {
        self.joints.get(&joint_type)
    }

    pub fn joint_mut(&mut self, joint_type: JointType) -> Option<&mut Joint> {
        self.joints.get_mut(&joint_type)
    }

    /// All joints in [`JointType`] order.
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.values()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn require_joint(&self, joint_type: Option<JointType>) -> Result<(), EmbodyError> {
        match joint_type {
            Some(jt) if !self.joints.contains_key(&jt) => Err(EmbodyError::JointNotInModel(jt)),
            _ => Ok(()),
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Sensors
    // ────────────────────────────────────────────────────────────────────────

    /// Place a live sensor below `parent` at the given relative pose.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::JointNotInModel`] when `parent` is not defined.
    pub fn add_sensor(
        &mut self,
        sensor: Arc<dyn Sensor>,
        parent: Option<JointType>,
        relative_position: Vec3,
        relative_orientation: Quaternion,
    ) -> Result<SensorKey, EmbodyError> {
        self.require_joint(parent)?;
        let key = SensorKey(self.next_sensor_key);
        self.next_sensor_key += 1;
        let node = TransformNode::relative(relative_position, relative_orientation);
        self.sensors.insert(key, SensorNode::new(key, sensor, node));
        self.attach(NodeId::Sensor(key), parent);
        Ok(key)
    }

    /// Take a sensor out of the scene.
    pub fn remove_sensor(&mut self, key: SensorKey) -> Option<SensorNode> {
        self.detach(NodeId::Sensor(key));
        let removed = self.sensors.remove(&key);
        self.invalidate_roots();
        removed
    }

    pub fn sensor(&self, key: SensorKey) -> Option<&SensorNode> {
        self.sensors.get(&key)
    }

    /// Look a sensor up by its driver id.
    pub fn sensor_by_id(&self, id: &str) -> Option<&SensorNode> {
        self.sensors.values().find(|s| s.id() == id)
    }

    /// All sensors in the order they were added.
    pub fn sensors(&self) -> impl Iterator<Item = &SensorNode> {
        self.sensors.values()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Parentage
    // ────────────────────────────────────────────────────────────────────────

    pub fn parent(&self, id: impl Into<NodeId>) -> Option<JointType> {
        match id.into() {
            NodeId::Joint(jt) => self.joints.get(&jt).and_then(Joint::parent),
            NodeId::Sensor(key) => self.sensors.get(&key).and_then(SensorNode::parent),
        }
    }

    /// Move `id` below `new_parent` (`None` makes it a root).
    ///
    /// The node leaves its old parent's child list and is appended to the new
    /// parent's list unless already present.  Whichever representation of
    /// its pose is authoritative is kept as is.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::JointNotInModel`] when `new_parent` is not defined.
    /// - [`EmbodyError::Config`] when the move would create a cycle.
    pub fn set_parent(
        &mut self,
        id: impl Into<NodeId>,
        new_parent: Option<JointType>,
    ) -> Result<(), EmbodyError> {
        let id = id.into();
        self.require_joint(new_parent)?;
        if let (NodeId::Joint(jt), Some(parent)) = (id, new_parent)
            && self.is_self_or_ancestor(jt, parent)
        {
            return Err(EmbodyError::Config(format!(
                "making {parent} the parent of {jt} would create a cycle"
            )));
        }
        self.detach(id);
        self.attach(id, new_parent);
        Ok(())
    }

    /// Whether `candidate` is `of` or one of its descendants.
    fn is_self_or_ancestor(&self, candidate: JointType, of: JointType) -> bool {
        let mut cursor = Some(of);
        while let Some(jt) = cursor {
            if jt == candidate {
                return true;
            }
            cursor = self.joints.get(&jt).and_then(Joint::parent);
        }
        false
    }

    fn detach(&mut self, id: NodeId) {
        let old_parent = match id {
            NodeId::Joint(jt) => self.joints.get_mut(&jt).and_then(|j| j.parent.take()),
            NodeId::Sensor(key) => self.sensors.get_mut(&key).and_then(|s| s.parent.take()),
        };
        if let Some(parent) = old_parent.and_then(|p| self.joints.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        self.invalidate_roots();
    }

    fn attach(&mut self, id: NodeId, parent: Option<JointType>) {
        match id {
            NodeId::Joint(jt) => {
                if let Some(j) = self.joints.get_mut(&jt) {
                    j.parent = parent;
                }
            }
            NodeId::Sensor(key) => {
                if let Some(s) = self.sensors.get_mut(&key) {
                    s.parent = parent;
                }
            }
        }
        if let Some(p) = parent.and_then(|p| self.joints.get_mut(&p))
            && !p.children.contains(&id)
        {
            p.children.push(id);
        }
        self.invalidate_roots();
    }

    // ────────────────────────────────────────────────────────────────────────
    // Roots
    // ────────────────────────────────────────────────────────────────────────

    fn roots(&self) -> &Roots {
        self.roots.get_or_init(|| {
            let joints: Vec<JointType> = self
                .joints
                .values()
                .filter(|j| j.parent().is_none())
                .map(Joint::joint_type)
                .collect();
            let nodes = joints
                .iter()
                .copied()
                .map(NodeId::Joint)
                .chain(
                    self.sensors
                        .values()
                        .filter(|s| s.parent().is_none())
                        .map(|s| NodeId::Sensor(s.key())),
                )
                .collect();
            Roots { joints, nodes }
        })
    }

    /// Joints without a parent.  Computed once, then cached.
    pub fn root_joints(&self) -> &[JointType] {
        &self.roots().joints
    }

    /// Root joints followed by sensors without a parent.  Computed once,
    /// then cached.
    pub fn root_nodes(&self) -> &[NodeId] {
        &self.roots().nodes
    }

    /// Forget the cached root sets.
    pub fn invalidate_roots(&mut self) {
        self.roots = OnceLock::new();
    }

    // ────────────────────────────────────────────────────────────────────────
    // Poses
    // ────────────────────────────────────────────────────────────────────────

    fn node(&self, id: NodeId) -> Option<&TransformNode> {
        match id {
            NodeId::Joint(jt) => self.joints.get(&jt).map(|j| &j.node),
            NodeId::Sensor(key) => self.sensors.get(&key).map(|s| &s.node),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut TransformNode> {
        match id {
            NodeId::Joint(jt) => self.joints.get_mut(&jt).map(|j| &mut j.node),
            NodeId::Sensor(key) => self.sensors.get_mut(&key).map(|s| &mut s.node),
        }
    }

    /// Absolute pose of the parent of `id`; `None` for roots and unknown ids.
    pub fn parent_pose(&self, id: impl Into<NodeId>) -> Option<Pose> {
        let parent = self.parent(id)?;
        self.absolute_pose(parent)
    }

    /// Absolute pose of `id`, resolved through its parent chain.
    pub fn absolute_pose(&self, id: impl Into<NodeId>) -> Option<Pose> {
        let id = id.into();
        let node = self.node(id)?;
        let parent = self.parent_pose(id);
        Some(node.absolute_pose(parent.as_ref()))
    }

    pub fn absolute_position(&self, id: impl Into<NodeId>) -> Option<Vec3> {
        let id = id.into();
        let node = self.node(id)?;
        Some(node.absolute_position(self.parent_pose(id).as_ref()))
    }

    pub fn absolute_orientation(&self, id: impl Into<NodeId>) -> Option<Quaternion> {
        let id = id.into();
        let node = self.node(id)?;
        Some(node.absolute_orientation(self.parent_pose(id).as_ref()))
    }

    pub fn relative_position(&self, id: impl Into<NodeId>) -> Option<Vec3> {
        let id = id.into();
        let node = self.node(id)?;
        Some(node.relative_position(self.parent_pose(id).as_ref()))
    }

    pub fn relative_orientation(&self, id: impl Into<NodeId>) -> Option<Quaternion> {
        let id = id.into();
        let node = self.node(id)?;
        Some(node.relative_orientation(self.parent_pose(id).as_ref()))
    }

    // ── Channel writes ──────────────────────────────────────────────────────
    //
    // Unknown ids are ignored.

    pub fn set_absolute_position(&mut self, id: impl Into<NodeId>, v: Vec3) {
        if let Some(node) = self.node_mut(id.into()) {
            node.set_absolute_position(v);
        }
    }

    pub fn set_relative_position(&mut self, id: impl Into<NodeId>, v: Vec3) {
        if let Some(node) = self.node_mut(id.into()) {
            node.set_relative_position(v);
        }
    }

    pub fn set_absolute_orientation(&mut self, id: impl Into<NodeId>, q: Quaternion) {
        if let Some(node) = self.node_mut(id.into()) {
            node.set_absolute_orientation(q);
        }
    }

    pub fn set_relative_orientation(&mut self, id: impl Into<NodeId>, q: Quaternion) {
        if let Some(node) = self.node_mut(id.into()) {
            node.set_relative_orientation(q);
        }
    }

    /// Make the relative position authoritative, so `id` follows its parent.
    pub fn clear_absolute_position(&mut self, id: impl Into<NodeId>) {
        let id = id.into();
        let parent = self.parent_pose(id);
        if let Some(node) = self.node_mut(id) {
            node.clear_absolute_position(parent.as_ref());
        }
    }

    /// Make the relative orientation authoritative.
    pub fn clear_absolute_orientation(&mut self, id: impl Into<NodeId>) {
        let id = id.into();
        let parent = self.parent_pose(id);
        if let Some(node) = self.node_mut(id) {
            node.clear_absolute_orientation(parent.as_ref());
        }
    }

    /// Make the absolute position authoritative, so `id` stays in place.
    pub fn clear_relative_position(&mut self, id: impl Into<NodeId>) {
        let id = id.into();
        let parent = self.parent_pose(id);
        if let Some(node) = self.node_mut(id) {
            node.clear_relative_position(parent.as_ref());
        }
    }

    pub fn clear_relative_orientation(&mut self, id: impl Into<NodeId>) {
        let id = id.into();
        let parent = self.parent_pose(id);
        if let Some(node) = self.node_mut(id) {
            node.clear_relative_orientation(parent.as_ref());
        }
    }
}
