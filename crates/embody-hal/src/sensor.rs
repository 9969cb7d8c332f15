//! The [`Sensor`] contract every tracking device driver implements.
//!
//! The controller owns a sensor's thread: it calls [`Sensor::init`] once,
//! spawns a dedicated thread running [`Sensor::run`], and on shutdown calls
//! [`Sensor::terminate`] and joins that thread.  The fusion pipeline never
//! talks to hardware; it only reads [`Sensor::current_data`], which must
//! return quickly with the latest published frame.
//!
//! Drivers keep their latest frame in a [`DataSlot`] and use a
//! [`StopSignal`] to leave their acquisition loop promptly.

use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use embody_types::{Arguments, DispatchError, EmbodyError, SensorData};

/// A tracking device placed in the body model.
///
/// Methods take `&self`; implementations use interior mutability because
/// the acquisition thread and the controller share one instance.
pub trait Sensor: Send + Sync {
    /// Stable identifier, unique within a scene.
    fn id(&self) -> &str;

    /// Registry name of the driver, e.g. `"sim"`.
    fn kind(&self) -> &str;

    /// `true` when readings are already in world coordinates; `false` when
    /// they are expressed in the sensor's own frame.
    fn collects_absolute_data(&self) -> bool;

    /// Connect to the device.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::SensorInit`] when the device is unavailable.
    /// The controller drops the sensor and carries on without it.
    fn init(&self) -> Result<(), EmbodyError>;

    /// Acquisition loop.  Blocks until [`terminate`][Sensor::terminate] is
    /// called.
    fn run(&self);

    /// Ask the acquisition loop to stop.  Must not block.
    fn terminate(&self);

    /// Latest published frame.  Never blocks on the device.
    fn current_data(&self) -> Arc<SensorData>;

    /// Invoke a named command with zero or one string argument.
    ///
    /// The default implementation exposes no commands.
    fn invoke(&self, method: &str, _args: &[String]) -> Result<String, DispatchError> {
        Err(DispatchError::NoSuchMethod {
            sensor: self.id().to_string(),
            method: method.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared settings
// ─────────────────────────────────────────────────────────────────────────────

/// Settings every driver accepts in addition to its own arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSettings {
    pub id: String,
    /// Confidence to report for positions, overriding the driver default.
    pub position_confidence: Option<f64>,
    /// Confidence to report for orientations, overriding the driver default.
    pub orientation_confidence: Option<f64>,
    /// Whether readings are absolute (see
    /// [`Sensor::collects_absolute_data`]).
    pub absolute: bool,
}

impl SensorSettings {
    /// Argument keys consumed here.
    pub const KEYS: &'static [&'static str] =
        &["position_confidence", "orientation_confidence", "absolute"];

    /// Read the shared settings.  A missing `id` becomes a random UUID.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] for unparsable values.
    pub fn from_args(id: Option<String>, args: &Arguments) -> Result<Self, EmbodyError> {
        Ok(Self {
            id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            position_confidence: args.parse("position_confidence")?,
            orientation_confidence: args.parse("orientation_confidence")?,
            absolute: args.parse_or("absolute", true)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DataSlot
// ─────────────────────────────────────────────────────────────────────────────

/// Single-writer slot holding a driver's latest frame.
///
/// Readers receive an `Arc` to an immutable frame, so a snapshot can never
/// be torn by a concurrent publish.
#[derive(Debug, Default)]
pub struct DataSlot {
    latest: RwLock<Arc<SensorData>>,
}

impl DataSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame.
    pub fn publish(&self, data: SensorData) {
        let frame = Arc::new(data);
        let mut guard = self.latest.write().unwrap_or_else(|e| e.into_inner());
        *guard = frame;
    }

    /// The most recently published frame.
    pub fn snapshot(&self) -> Arc<SensorData> {
        let guard = self.latest.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StopSignal
// ─────────────────────────────────────────────────────────────────────────────

/// Cooperative stop flag an acquisition loop can sleep on.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arm after a previous stop.
    pub fn reset(&self) {
        *self.stopped.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }

    /// Raise the flag and wake every waiter.
    pub fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.cv.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for up to `timeout`.  Returns `true` if the flag was raised.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .cv
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }

    /// Block until the flag is raised.
    pub fn wait_forever(&self) {
        let guard = self.stopped.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = self
            .cv
            .wait_while(guard, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_types::{CandidateJoint, JointType, Vec3};
    use std::thread;

    #[test]
    fn settings_default_to_random_id_and_absolute() {
        let s = SensorSettings::from_args(None, &Arguments::new()).unwrap();
        assert_eq!(s.id.len(), 36, "expected a UUID, got {}", s.id);
        assert!(s.absolute);
        assert_eq!(s.position_confidence, None);
    }

    #[test]
    fn settings_read_overrides() {
        let args = Arguments::new()
            .with("position_confidence", 0.4)
            .with("absolute", false);
        let s = SensorSettings::from_args(Some("glove".into()), &args).unwrap();
        assert_eq!(s.id, "glove");
        assert_eq!(s.position_confidence, Some(0.4));
        assert!(!s.absolute);
    }

    #[test]
    fn data_slot_snapshot_is_point_in_time() {
        let slot = DataSlot::new();
        let mut frame = SensorData::new();
        frame.insert(
            JointType::Head,
            CandidateJoint::new().with_position(Vec3::new(1.0, 0.0, 0.0), 1.0),
        );
        slot.publish(frame);
        let before = slot.snapshot();

        slot.publish(SensorData::new());
        assert_eq!(before.len(), 1, "earlier snapshot must not change");
        assert!(slot.snapshot().is_empty());
    }

    #[test]
    fn stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.stop();
        assert!(waiter.join().unwrap(), "waiter should observe the stop");
        assert!(signal.is_stopped());

        signal.reset();
        assert!(!signal.wait(Duration::from_millis(5)));
    }
}
