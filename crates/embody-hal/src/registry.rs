//! [`SensorRegistry`] – maps a driver name to its constructor.
//!
//! Configuration names a sensor by `kind`; the registry turns that name plus
//! the sensor's arguments into a live [`Sensor`].  Additional drivers are
//! added with [`SensorRegistry::register`] before the model is assembled.

use std::collections::HashMap;
use std::sync::Arc;

use embody_types::{Arguments, EmbodyError};

use crate::sensor::Sensor;
use crate::sim::{FixedSensor, SimSensor};

/// Driver constructor: optional id plus arguments.
pub type SensorConstructor =
    fn(Option<String>, &Arguments) -> Result<Arc<dyn Sensor>, EmbodyError>;

/// Name-indexed sensor driver registry.
///
/// [`Default`] yields a registry holding the built-in `sim` and `fixed`
/// drivers; [`SensorRegistry::empty`] holds none.
pub struct SensorRegistry {
    constructors: HashMap<String, SensorConstructor>,
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::empty()
            .with(SimSensor::KIND, |id, args| {
                Ok(Arc::new(SimSensor::from_args(id, args)?))
            })
            .with(FixedSensor::KIND, |id, args| {
                Ok(Arc::new(FixedSensor::from_args(id, args)?))
            })
    }
}

impl SensorRegistry {
    /// Create a registry with the built-in drivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry without any driver.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a driver.  A previous driver with the same name is replaced.
    pub fn register(&mut self, kind: impl Into<String>, constructor: SensorConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    /// Builder-style [`register`][Self::register].
    pub fn with(mut self, kind: impl Into<String>, constructor: SensorConstructor) -> Self {
        self.register(kind, constructor);
        self
    }

    /// Registered driver names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct a sensor of driver `kind`.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::UnknownPlugin`] when `kind` is not registered.
    /// - Any error the driver constructor reports for its arguments.
    pub fn create(
        &self,
        kind: &str,
        id: Option<String>,
        args: &Arguments,
    ) -> Result<Arc<dyn Sensor>, EmbodyError> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| EmbodyError::UnknownPlugin {
                category: "sensor".to_string(),
                name: kind.to_string(),
            })?;
        constructor(id, args)
    }
}
