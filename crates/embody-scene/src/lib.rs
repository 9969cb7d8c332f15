//! `embody-scene` – the body model.
//!
//! A [`Scene`] is a tree of [`Joint`]s with [`SensorNode`]s hung from it.
//! Each node stores one authoritative representation per channel (see
//! [`Channel`]) and derives the other through its parent chain.  Scenes are
//! built from a [`SkeletonTemplate`] and exported through [`export`].

pub mod export;
pub mod joint;
pub mod node;
pub mod scene;
pub mod skeleton;

pub use export::{Field, Layout};
pub use joint::{Joint, NodeId, SensorKey, SensorNode, SensorSource};
pub use node::{Channel, Pose, TransformNode};
pub use scene::Scene;
pub use skeleton::{JointOverride, ModelType, SkeletonTemplate};
