//! Transform node primitives: the [`Channel`] state machine, the parent
//! [`Pose`] used to derive one representation from the other, and the
//! [`TransformNode`] shared by joints and sensors.
//!
//! A channel stores exactly one authoritative value, either in world
//! coordinates or relative to the parent.  The other representation is
//! derived on read from the parent's absolute pose, so it can never go stale
//! when an ancestor moves.
//!
//! Conventions (orientation quaternions map world → local):
//!
//! ```text
//! absolute_position    = parent.position + parent.orientation⁻¹ · relative_position
//! relative_position    = parent.orientation · (absolute_position − parent.position)
//! absolute_orientation = relative_orientation ⊗ parent.orientation
//! relative_orientation = absolute_orientation ⊗ parent.orientation⁻¹
//! ```

use chrono::{DateTime, Utc};
use embody_types::{Quaternion, Vec3};

// ────────────────────────────────────────────────────────────────────────────
// Channel
// ────────────────────────────────────────────────────────────────────────────

/// The authoritative representation of one channel of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Channel<T> {
    /// Stored in world coordinates.
    Absolute(T),
    /// Stored relative to the parent node.
    Relative(T),
}

impl<T: Copy> Channel<T> {
    pub fn is_absolute(&self) -> bool {
        matches!(self, Channel::Absolute(_))
    }

    /// The stored value, whichever representation it is in.
    pub fn stored(&self) -> T {
        match *self {
            Channel::Absolute(v) | Channel::Relative(v) => v,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// An absolute pose.  Used as the reference frame when deriving a child's
/// representation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// World position of a point given relative to this pose.
    pub fn to_absolute_position(&self, relative: Vec3) -> Vec3 {
        self.position + self.orientation.rotate_inverse(relative)
    }

    /// Position of a world point relative to this pose.
    pub fn to_relative_position(&self, absolute: Vec3) -> Vec3 {
        self.orientation.rotate(absolute - self.position)
    }

    /// World orientation of an orientation given relative to this pose.
    pub fn to_absolute_orientation(&self, relative: Quaternion) -> Quaternion {
        relative.mul(self.orientation)
    }

    /// Orientation of a world orientation relative to this pose.
    pub fn to_relative_orientation(&self, absolute: Quaternion) -> Quaternion {
        absolute.mul(self.orientation.inverse())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TransformNode
// ────────────────────────────────────────────────────────────────────────────

/// Position and orientation of a scene member plus the instants each channel
/// was last tracked.
///
/// Every accessor that may need to derive a value takes the parent's absolute
/// pose, `None` for a root node (whose relative and absolute values are
/// equal).  The scene resolves that pose; see [`Scene`][crate::Scene].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    position: Channel<Vec3>,
    orientation: Channel<Quaternion>,
    pub position_timestamp: DateTime<Utc>,
    pub orientation_timestamp: DateTime<Utc>,
}

impl TransformNode {
    /// A node placed relative to its parent.
    pub fn relative(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position: Channel::Relative(position),
            orientation: Channel::Relative(orientation),
            position_timestamp: DateTime::<Utc>::UNIX_EPOCH,
            orientation_timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn position_channel(&self) -> Channel<Vec3> {
        self.position
    }

    pub fn orientation_channel(&self) -> Channel<Quaternion> {
        self.orientation
    }

    // ── Position ────────────────────────────────────────────────────────────

    pub fn absolute_position(&self, parent: Option<&Pose>) -> Vec3 {
        match (self.position, parent) {
            (Channel::Absolute(v), _) | (Channel::Relative(v), None) => v,
            (Channel::Relative(v), Some(p)) => p.to_absolute_position(v),
        }
    }

    pub fn relative_position(&self, parent: Option<&Pose>) -> Vec3 {
        match (self.position, parent) {
            (Channel::Relative(v), _) | (Channel::Absolute(v), None) => v,
            (Channel::Absolute(v), Some(p)) => p.to_relative_position(v),
        }
    }

    pub fn set_absolute_position(&mut self, v: Vec3) {
        self.position = Channel::Absolute(v);
    }

    pub fn set_relative_position(&mut self, v: Vec3) {
        self.position = Channel::Relative(v);
    }

    /// Drop the absolute value, keeping the relative one.  The node then
    /// follows its parent.
    pub fn clear_absolute_position(&mut self, parent: Option<&Pose>) {
        self.position = Channel::Relative(self.relative_position(parent));
    }

    /// Drop the relative value, keeping the absolute one.  The node then
    /// stays in place when its parent moves.
    pub fn clear_relative_position(&mut self, parent: Option<&Pose>) {
        self.position = Channel::Absolute(self.absolute_position(parent));
    }

    // ── Orientation ─────────────────────────────────────────────────────────

    pub fn absolute_orientation(&self, parent: Option<&Pose>) -> Quaternion {
        match (self.orientation, parent) {
            (Channel::Absolute(q), _) | (Channel::Relative(q), None) => q,
            (Channel::Relative(q), Some(p)) => p.to_absolute_orientation(q),
        }
    }

    pub fn relative_orientation(&self, parent: Option<&Pose>) -> Quaternion {
        match (self.orientation, parent) {
            (Channel::Relative(q), _) | (Channel::Absolute(q), None) => q,
            (Channel::Absolute(q), Some(p)) => p.to_relative_orientation(q),
        }
    }

    pub fn set_absolute_orientation(&mut self, q: Quaternion) {
        self.orientation = Channel::Absolute(q);
    }

    pub fn set_relative_orientation(&mut self, q: Quaternion) {
        self.orientation = Channel::Relative(q);
    }

    pub fn clear_absolute_orientation(&mut self, parent: Option<&Pose>) {
        self.orientation = Channel::Relative(self.relative_orientation(parent));
    }

    pub fn clear_relative_orientation(&mut self, parent: Option<&Pose>) {
        self.orientation = Channel::Absolute(self.absolute_orientation(parent));
    }

    /// Absolute pose given the parent's absolute pose.
    pub fn absolute_pose(&self, parent: Option<&Pose>) -> Pose {
        Pose::new(
            self.absolute_position(parent),
            self.absolute_orientation(parent),
        )
    }
}
