//! `embody-fusion` – turns sensor readings into a smooth body pose.
//!
//! # Modules
//!
//! - [`fuser`] – the [`Fuser`] contract and the traversal shared by the
//!   fusion policies.
//! - [`dominance`] – [`ConfidenceDominanceFuser`]: the most confident
//!   reading wins.
//! - [`weighted`] – [`ConfidenceWeightedFuser`]: inverse-variance weighted
//!   mean of all readings.
//! - [`filter`] – the [`Filter`] contract and double-exponential state.
//! - [`double_exponential`] – [`DoubleExponentialFilter`] with fixed gains.
//! - [`adaptive`] – [`AdaptiveDoubleExponentialFilter`] with speed-dependent
//!   gains.
//! - [`registry`] – [`PluginRegistry`], name → constructor.

pub mod adaptive;
pub mod dominance;
pub mod double_exponential;
pub mod filter;
pub mod fuser;
pub mod registry;
pub mod weighted;

pub use adaptive::{AdaptiveDoubleExponentialFilter, AdaptiveParams, VelocityBounds};
pub use dominance::ConfidenceDominanceFuser;
pub use double_exponential::DoubleExponentialFilter;
pub use filter::Filter;
pub use fuser::{Blend, Candidate, Fuser};
pub use registry::{FilterConstructor, FuserConstructor, PluginContext, PluginRegistry};
pub use weighted::ConfidenceWeightedFuser;
