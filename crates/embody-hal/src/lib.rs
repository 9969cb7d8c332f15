//! `embody-hal` – the sensor driver layer.
//!
//! Defines the [`Sensor`] contract the controller drives, helpers that make
//! writing a driver straightforward ([`DataSlot`], [`StopSignal`],
//! [`CommandTable`]), simulated drivers, and the [`SensorRegistry`] used to
//! instantiate drivers by name.

pub mod command;
pub mod registry;
pub mod sensor;
pub mod sim;

pub use command::CommandTable;
pub use registry::{SensorConstructor, SensorRegistry};
pub use sensor::{DataSlot, Sensor, SensorSettings, StopSignal};
pub use sim::{FixedSensor, SimSensor};
