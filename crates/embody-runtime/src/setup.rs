//! Model assembly from configuration.
//!
//! A [`ModelConfig`] is the TOML description of one body model: timing,
//! skeleton detail, joint overrides, the fuser and filter by registry name,
//! and the sensors to place.  [`ModelConfig::build`] validates everything and
//! yields a [`Model`] ready to hand to a [`SceneController`].  Any problem is
//! reported as [`EmbodyError::Config`] before a single sensor is started.
//!
//! ```toml
//! frames_per_second = 30
//! return_to_default_ms = 2000
//! frame_history = 60
//!
//! [model]
//! torso = "simple"
//! hands = "complex"
//! feet = "none"
//!
//! [[model.joints]]
//! joint = "HEAD"
//! parent = "SPINE_SHOULDER"
//! default_position = [0.0, 25.0, 0.0]
//!
//! [fuser]
//! kind = "confidence_weighted"
//!
//! [filter]
//! kind = "adaptive_double_exponential"
//! arguments = { alpha_low = 0.4 }
//!
//! [[sensors]]
//! kind = "sim"
//! id = "left-cam"
//! parent = "SPINE_BASE"
//! arguments = { joints = "HEAD,WRIST_LEFT" }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use embody_fusion::{Filter, Fuser, PluginContext, PluginRegistry};
use embody_hal::SensorRegistry;
use embody_middleware::FrameBus;
use embody_scene::{JointOverride, ModelType, Scene, SkeletonTemplate};
use embody_types::{Arguments, EmbodyError, JointType, Quaternion, Vec3};

use crate::controller::{
    ControllerConfig, DEFAULT_FRAME_HISTORY, DEFAULT_UPDATE_FREQUENCY, SceneController,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration schema
// ─────────────────────────────────────────────────────────────────────────────

/// One body model as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_frames_per_second")]
    pub frames_per_second: f64,

    #[serde(default = "default_return_to_default_ms")]
    pub return_to_default_ms: u64,

    /// Past snapshots kept; `0` disables the history.
    #[serde(default = "default_frame_history")]
    pub frame_history: usize,

    #[serde(default)]
    pub model: SkeletonConfig,

    #[serde(default)]
    pub fuser: PluginConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PluginConfig>,

    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

/// Skeleton detail per region plus joint overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonConfig {
    #[serde(default)]
    pub torso: ModelType,
    #[serde(default)]
    pub hands: ModelType,
    #[serde(default)]
    pub feet: ModelType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joints: Vec<JointConfig>,
}

/// Re-parents an existing joint or adds a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub joint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_orientation: Option<[f64; 4]>,
}

/// A fuser or filter by registry name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Arguments::is_empty")]
    pub arguments: Arguments,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            kind: PluginRegistry::DEFAULT_FUSER.to_string(),
            arguments: Arguments::new(),
        }
    }
}

/// A sensor driver by registry name, and where it sits in the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub relative_position: [f64; 3],
    #[serde(default = "identity")]
    pub relative_orientation: [f64; 4],
    #[serde(default, skip_serializing_if = "Arguments::is_empty")]
    pub arguments: Arguments,
}

fn default_frames_per_second() -> f64 {
    DEFAULT_UPDATE_FREQUENCY
}
fn default_return_to_default_ms() -> u64 {
    2000
}
fn default_frame_history() -> usize {
    DEFAULT_FRAME_HISTORY
}
fn identity() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            frames_per_second: default_frames_per_second(),
            return_to_default_ms: default_return_to_default_ms(),
            frame_history: default_frame_history(),
            model: SkeletonConfig::default(),
            fuser: PluginConfig::default(),
            filter: None,
            sensors: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembly
// ─────────────────────────────────────────────────────────────────────────────

/// A validated model: the initial scene with its sensors, the fusion
/// pipeline, and the controller timing.
pub struct Model {
    pub controller: ControllerConfig,
    pub scene: Scene,
    pub fuser: Box<dyn Fuser>,
    pub filter: Option<Box<dyn Filter>>,
}

impl Model {
    /// Create a controller publishing on `bus` and start this model on it.
    pub fn launch(self, bus: FrameBus) -> SceneController {
        let controller = SceneController::with_bus(self.controller, bus);
        controller.reset(self.scene, self.fuser, self.filter);
        controller
    }
}

impl ModelConfig {
    /// A simple skeleton watched by one simulated sensor.
    pub fn demo() -> Self {
        Self {
            filter: Some(PluginConfig {
                kind: "double_exponential".to_string(),
                arguments: Arguments::new(),
            }),
            sensors: vec![SensorConfig {
                kind: "sim".to_string(),
                id: Some("demo".to_string()),
                parent: None,
                relative_position: [0.0; 3],
                relative_orientation: identity(),
                arguments: Arguments::new()
                    .with("joints", "HEAD,WRIST_LEFT,WRIST_RIGHT")
                    .with("origin", "0,100,300"),
            }],
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::Config`] for malformed TOML or values of the
    /// wrong shape.
    pub fn from_toml(raw: &str) -> Result<Self, EmbodyError> {
        toml::from_str(raw).map_err(|e| EmbodyError::Config(format!("invalid model: {e}")))
    }

    /// Render as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::Serialization`] when the model cannot be
    /// represented in TOML.
    pub fn to_toml(&self) -> Result<String, EmbodyError> {
        toml::to_string_pretty(self).map_err(|e| EmbodyError::Serialization(e.to_string()))
    }

    /// Timing settings for the controller.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::Config`] for a non-positive or non-finite
    /// frame rate.
    pub fn controller_config(&self) -> Result<ControllerConfig, EmbodyError> {
        if !(self.frames_per_second.is_finite() && self.frames_per_second > 0.0) {
            return Err(EmbodyError::Config(format!(
                "frames_per_second must be positive, got {}",
                self.frames_per_second
            )));
        }
        Ok(ControllerConfig {
            update_frequency: self.frames_per_second,
            return_to_default: Duration::from_millis(self.return_to_default_ms),
            frame_history: self.frame_history,
        })
    }

    /// Validate the configuration and assemble the model.
    ///
    /// Sensors are constructed but not started; that happens in
    /// [`SceneController::reset`].
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::Config`] describing the first problem found.
    pub fn build(
        &self,
        sensors: &SensorRegistry,
        plugins: &PluginRegistry,
    ) -> Result<Model, EmbodyError> {
        let controller = self.controller_config()?;
        let ctx = PluginContext {
            update_frequency: controller.update_frequency,
            return_to_default: controller.return_to_default,
        };

        let overrides = self
            .model
            .joints
            .iter()
            .map(JointConfig::to_override)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| config_error("joint override", e))?;
        let template = SkeletonTemplate::new(self.model.torso, self.model.hands, self.model.feet);
        let mut scene = template
            .build_with(&overrides)
            .map_err(|e| config_error("skeleton", e))?;

        for sensor in &self.sensors {
            let context = format!("sensor '{}'", sensor.kind);
            let parent = parse_joint(sensor.parent.as_deref()).map_err(|e| config_error(&context, e))?;
            let orientation = Quaternion::try_from(sensor.relative_orientation)
                .map_err(|e| config_error(&context, e))?;
            let driver = sensors
                .create(&sensor.kind, sensor.id.clone(), &sensor.arguments)
                .map_err(|e| config_error(&context, e))?;
            if scene.sensor_by_id(driver.id()).is_some() {
                return Err(EmbodyError::Config(format!(
                    "{context}: sensor id '{}' is used twice",
                    driver.id()
                )));
            }
            scene
                .add_sensor(driver, parent, Vec3::from(sensor.relative_position), orientation)
                .map_err(|e| config_error(&context, e))?;
        }

        let fuser = plugins
            .create_fuser(&self.fuser.kind, &ctx, &self.fuser.arguments)
            .map_err(|e| config_error("fuser", e))?;
        let filter = self
            .filter
            .as_ref()
            .map(|f| plugins.create_filter(&f.kind, &ctx, &f.arguments))
            .transpose()
            .map_err(|e| config_error("filter", e))?;

        info!(
            joints = scene.joint_count(),
            sensors = scene.sensor_count(),
            fuser = fuser.name(),
            filter = filter.as_ref().map(|f| f.name()).unwrap_or("none"),
            "model assembled"
        );

        Ok(Model {
            controller,
            scene,
            fuser,
            filter,
        })
    }
}

impl JointConfig {
    fn to_override(&self) -> Result<JointOverride, EmbodyError> {
        Ok(JointOverride {
            joint: self.joint.parse()?,
            parent: parse_joint(self.parent.as_deref())?,
            default_position: self.default_position.map(Vec3::from),
            default_orientation: self
                .default_orientation
                .map(Quaternion::try_from)
                .transpose()?,
        })
    }
}

fn parse_joint(name: Option<&str>) -> Result<Option<JointType>, EmbodyError> {
    name.map(str::parse).transpose()
}

fn config_error(context: &str, e: EmbodyError) -> EmbodyError {
    match e {
        EmbodyError::Config(msg) => EmbodyError::Config(format!("{context}: {msg}")),
        other => EmbodyError::Config(format!("{context}: {other}")),
    }
}
