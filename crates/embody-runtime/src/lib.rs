//! `embody-runtime` – runs a body model.
//!
//! # Modules
//!
//! - [`controller`] – [`SceneController`]: sensor lifecycles, the
//!   fuse → filter → publish tick, the bounded snapshot history, export, and
//!   sensor command dispatch.
//! - [`ticker`] – [`Ticker`]: calls [`SceneController::tick`] at the
//!   configured rate on a Tokio task with explicit start and stop.
//! - [`setup`] – [`ModelConfig`]: the TOML model description and its
//!   validation into a ready-to-run [`Model`].
//! - [`telemetry`] – [`init_tracing`]: console or JSON logs with optional
//!   OTLP span export.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use embody_fusion::PluginRegistry;
//! use embody_hal::SensorRegistry;
//! use embody_middleware::FrameBus;
//! use embody_runtime::{ModelConfig, Ticker};
//!
//! # async fn run() -> Result<(), embody_types::EmbodyError> {
//! let model = ModelConfig::demo().build(&SensorRegistry::new(), &PluginRegistry::new())?;
//! let controller = Arc::new(model.launch(FrameBus::default()));
//! let ticker = Ticker::start(controller.clone());
//! // ...
//! ticker.stop().await;
//! controller.terminate();
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod setup;
pub mod telemetry;
pub mod ticker;

pub use controller::{ControllerConfig, SceneController, SensorState};
pub use setup::{JointConfig, Model, ModelConfig, PluginConfig, SensorConfig, SkeletonConfig};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use ticker::Ticker;
