//! `embody-middleware` – hands finished frames to whoever is listening.
//!
//! # Modules
//!
//! - [`bus`] – [`FrameBus`], a Tokio broadcast channel of immutable scene
//!   snapshots.

pub mod bus;

pub use bus::{DEFAULT_CAPACITY, Frame, FrameBus, FrameSubscriber};
