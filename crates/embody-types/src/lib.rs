//! `embody-types` – shared vocabulary of the body-tracking stack.
//!
//! Every other crate speaks in these types: geometric primitives
//! ([`Vec3`], [`Quaternion`]), the joint identity key ([`JointType`]), what a
//! sensor reports ([`CandidateJoint`], [`SensorData`]), plugin construction
//! arguments ([`Arguments`]), and the error taxonomy ([`EmbodyError`],
//! [`DispatchError`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod args;
pub mod joint_type;
pub mod math;

pub use args::Arguments;
pub use joint_type::JointType;
pub use math::{Quaternion, Vec3};

// ─────────────────────────────────────────────────────────────────────────────
// Sensor readings
// ─────────────────────────────────────────────────────────────────────────────

/// One sensor's reading for one joint.
///
/// Either channel may be missing.  Whether the values are absolute or in
/// the sensor's own frame is a property of the sensor, not of the reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateJoint {
    pub position: Option<Vec3>,
    pub orientation: Option<Quaternion>,
    /// Reliability of `position` in `[0, 1]`.
    pub position_confidence: f64,
    /// Reliability of `orientation` in `[0, 1]`.
    pub orientation_confidence: f64,
}

impl CandidateJoint {
    /// A reading that reports neither channel.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Vec3, confidence: f64) -> Self {
        self.position = Some(position);
        self.position_confidence = confidence;
        self
    }

    pub fn with_orientation(mut self, orientation: Quaternion, confidence: f64) -> Self {
        self.orientation = Some(orientation);
        self.orientation_confidence = confidence;
        self
    }
}

/// Everything a sensor currently sees, keyed by joint.
pub type SensorData = BTreeMap<JointType, CandidateJoint>;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning configuration, geometry, sensors, and queries.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EmbodyError {
    #[error("Invalid quaternion ({w}, {x}, {y}, {z}): components must not be NaN")]
    InvalidQuaternion { w: f64, x: f64, y: f64, z: f64 },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid value '{value}' for argument '{key}'")]
    InvalidArgument { key: String, value: String },

    #[error("Sensor '{sensor}' failed to initialise: {details}")]
    SensorInit { sensor: String, details: String },

    #[error("Invalid joint type: {0}")]
    UnknownJointType(String),

    #[error("The model does not contain a joint of type {0}")]
    JointNotInModel(JointType),

    #[error("Unknown {category} '{name}'")]
    UnknownPlugin { category: String, name: String },

    #[error("No scene is active")]
    NoActiveScene,

    #[error("History index must be greater than 0")]
    HistoryIndex,

    #[error("Scene history is not big enough: requested {requested}, holding {available}")]
    HistoryOutOfRange { requested: usize, available: usize },

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

/// Failure modes of invoking a named command on a sensor.
///
/// These are values reported back to the caller; dispatch never panics.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchError {
    #[error("There is no sensor with id '{0}'")]
    NoSuchSensor(String),

    #[error("Sensor '{sensor}' has no method '{method}'")]
    NoSuchMethod { sensor: String, method: String },

    #[error("Method '{method}' is not accessible")]
    NotAccessible { method: String },

    #[error("Method '{method}' takes {expected} argument(s), got {given}")]
    BadArguments {
        method: String,
        expected: usize,
        given: usize,
    },

    #[error("Method '{method}' failed: {details}")]
    Failed { method: String, details: String },
}
