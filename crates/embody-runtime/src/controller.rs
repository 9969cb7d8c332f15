//! [`SceneController`] – the body model's tick loop and its outside surface.
//!
//! The controller owns a private *working* scene whose sensor nodes are
//! live.  Each [`tick`][SceneController::tick]:
//!
//! 1. fuses the latest sensor readings into the working scene,
//! 2. smooths it with the configured filter (if any),
//! 3. stamps it with the tick time,
//! 4. archives the previously published snapshot in the bounded history,
//! 5. publishes a frozen clone as the new current snapshot, and
//! 6. broadcasts that snapshot on the [`FrameBus`].
//!
//! Readers only ever see published snapshots, which are immutable
//! `Arc<Scene>` values, so a half-updated scene is never observable.  The
//! current snapshot and the history sit behind two separate locks that are
//! held only for the pointer swap or the append, never across fusion.
//!
//! Sensor acquisition loops run on dedicated OS threads owned by the
//! controller.  [`terminate`][SceneController::terminate] stops and joins
//! every one of them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use embody_fusion::{Filter, Fuser};
use embody_hal::Sensor;
use embody_middleware::{Frame, FrameBus, FrameSubscriber};
use embody_scene::{Field, Layout, Scene, export};
use embody_types::{DispatchError, EmbodyError};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_UPDATE_FREQUENCY: f64 = 30.0;
pub const DEFAULT_RETURN_TO_DEFAULT: Duration = Duration::from_millis(2000);
pub const DEFAULT_FRAME_HISTORY: usize = 60;

/// Timing and retention settings of a [`SceneController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Ticks per second.
    pub update_frequency: f64,
    /// How long an untracked channel keeps its last pose before snapping
    /// back to the joint's default.
    pub return_to_default: Duration,
    /// Number of past snapshots kept.  `0` disables the history.
    pub frame_history: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
            return_to_default: DEFAULT_RETURN_TO_DEFAULT,
            frame_history: DEFAULT_FRAME_HISTORY,
        }
    }
}

impl ControllerConfig {
    /// Time between two ticks.  Falls back to one second for a
    /// non-positive or non-finite frequency.
    pub fn tick_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.update_frequency)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sensor lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a sensor under the controller.
///
/// `Uninitialized → Initializing → Running → Terminated`, or
/// `Initializing → Ignored` when the device fails to start.  An ignored
/// sensor stays ignored until the next [`SceneController::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorState {
    Uninitialized,
    Initializing,
    Running,
    Terminated,
    Ignored,
}

struct SensorEntry {
    sensor: Arc<dyn Sensor>,
    state: SensorState,
    thread: Option<JoinHandle<()>>,
}

struct Pipeline {
    working: Scene,
    fuser: Box<dyn Fuser>,
    filter: Option<Box<dyn Filter>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// SceneController
// ─────────────────────────────────────────────────────────────────────────────

/// Drives one body model.  Share it behind an `Arc`; every method takes
/// `&self`.
pub struct SceneController {
    config: ControllerConfig,
    bus: FrameBus,
    pipeline: Mutex<Option<Pipeline>>,
    current: RwLock<Option<Arc<Scene>>>,
    /// Oldest first and always contiguous, so filters can borrow it as one
    /// slice.  Shared copy-on-write with the filter of the running tick.
    history: Mutex<Arc<VecDeque<Arc<Scene>>>>,
    sensors: Mutex<Vec<SensorEntry>>,
    sequence: AtomicU64,
}

impl SceneController {
    /// A controller with no active scene, publishing on a fresh bus.
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_bus(config, FrameBus::default())
    }

    /// A controller publishing on `bus`.
    pub fn with_bus(config: ControllerConfig, bus: FrameBus) -> Self {
        Self {
            config,
            bus,
            pipeline: Mutex::new(None),
            current: RwLock::new(None),
            history: Mutex::new(Arc::new(VecDeque::with_capacity(config.frame_history))),
            sensors: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// A handle to the bus frames are published on.
    pub fn bus(&self) -> FrameBus {
        self.bus.clone()
    }

    pub fn subscribe(&self) -> FrameSubscriber {
        self.bus.subscribe()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.pipeline).is_some()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Install `scene` with its fuser and optional filter and start its
    /// sensors.
    ///
    /// An active scene is terminated first.  Every live sensor in `scene` is
    /// initialised and, on success, gets its own acquisition thread.  A
    /// sensor whose initialisation fails is logged, removed from the scene,
    /// and reported as [`SensorState::Ignored`].
    pub fn reset(&self, mut scene: Scene, fuser: Box<dyn Fuser>, filter: Option<Box<dyn Filter>>) {
        if self.is_active() {
            self.terminate();
        }

        let live: Vec<_> = scene
            .sensors()
            .filter_map(|node| node.live().map(|s| (node.key(), Arc::clone(s))))
            .collect();
        *lock(&self.sensors) = live
            .iter()
            .map(|(_, sensor)| SensorEntry {
                sensor: Arc::clone(sensor),
                state: SensorState::Uninitialized,
                thread: None,
            })
            .collect();

        for (index, (key, sensor)) in live.into_iter().enumerate() {
            self.set_state(index, SensorState::Initializing, None);
            match start_sensor(&sensor) {
                Ok(handle) => {
                    info!(sensor = %sensor.id(), kind = sensor.kind(), "sensor running");
                    self.set_state(index, SensorState::Running, Some(handle));
                }
                Err(e) => {
                    warn!(sensor = %sensor.id(), error = %e, "sensor failed to initialise; it will be ignored");
                    scene.remove_sensor(key);
                    self.set_state(index, SensorState::Ignored, None);
                }
            }
        }
        scene.invalidate_roots();
        scene.set_timestamp(Utc::now());

        info!(
            fuser = fuser.name(),
            filter = filter.as_ref().map(|f| f.name()).unwrap_or("none"),
            joints = scene.joint_count(),
            sensors = scene.sensor_count(),
            "scene controller reset"
        );

        Arc::make_mut(&mut lock(&self.history)).clear();
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(scene.clone()));
        self.sequence.store(0, Ordering::SeqCst);
        *lock(&self.pipeline) = Some(Pipeline {
            working: scene,
            fuser,
            filter,
        });
    }

    /// Stop every sensor, join their threads, and release the scene.
    ///
    /// Blocks until every acquisition loop has returned.  Does nothing when
    /// no scene is active.
    pub fn terminate(&self) {
        let Some(pipeline) = lock(&self.pipeline).take() else {
            return;
        };

        let mut sensors = lock(&self.sensors);
        for entry in sensors.iter().filter(|e| e.state == SensorState::Running) {
            entry.sensor.terminate();
        }
        for entry in sensors.iter_mut() {
            let Some(handle) = entry.thread.take() else {
                continue;
            };
            if handle.join().is_err() {
                error!(sensor = %entry.sensor.id(), "sensor thread panicked");
            }
            entry.state = SensorState::Terminated;
        }
        drop(sensors);

        drop(pipeline);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        Arc::make_mut(&mut lock(&self.history)).clear();
        info!("scene controller terminated");
    }

    // ── Tick ────────────────────────────────────────────────────────────────

    /// Run one fuse → filter → publish cycle.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::NoActiveScene`] before the first
    /// [`reset`][Self::reset] or after [`terminate`][Self::terminate].
    pub fn tick(&self) -> Result<Frame, EmbodyError> {
        let mut guard = lock(&self.pipeline);
        let pipeline = guard.as_mut().ok_or(EmbodyError::NoActiveScene)?;
        let previous = self.current();
        let now = Utc::now();
        debug!("tick started");

        pipeline.fuser.fuse(&mut pipeline.working, now);
        if let Some(filter) = pipeline.filter.as_mut() {
            let history = Arc::clone(&lock(&self.history));
            filter.filter(history.as_slices().0, &mut pipeline.working);
        }
        pipeline.working.set_timestamp(now);

        if let Some(previous) = previous {
            self.archive(previous);
        }
        let snapshot = Arc::new(pipeline.working.clone());
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&snapshot));
        drop(guard);

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = Frame {
            sequence,
            timestamp: now,
            scene: snapshot,
        };
        let receivers = self.bus.publish(frame.clone());
        debug!(sequence, receivers, "tick finished");
        Ok(frame)
    }

    fn archive(&self, scene: Arc<Scene>) {
        let capacity = self.config.frame_history;
        if capacity == 0 {
            return;
        }
        let mut guard = lock(&self.history);
        let history = Arc::make_mut(&mut guard);
        while history.len() >= capacity {
            history.pop_front();
        }
        history.push_back(scene);
        history.make_contiguous();
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    fn current(&self) -> Option<Arc<Scene>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recently published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::NoActiveScene`] when no scene is active.
    pub fn snapshot(&self) -> Result<Arc<Scene>, EmbodyError> {
        self.current().ok_or(EmbodyError::NoActiveScene)
    }

    /// Number of ticks since the last reset.
    pub fn frame_count(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    /// A past snapshot; `1` is the one published just before the current.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::HistoryIndex`] for `index == 0`.
    /// - [`EmbodyError::HistoryOutOfRange`] when fewer than `index`
    ///   snapshots are archived.
    pub fn history_frame(&self, index: usize) -> Result<Arc<Scene>, EmbodyError> {
        if index == 0 {
            return Err(EmbodyError::HistoryIndex);
        }
        let history = lock(&self.history);
        let available = history.len();
        if index > available {
            return Err(EmbodyError::HistoryOutOfRange {
                requested: index,
                available,
            });
        }
        Ok(Arc::clone(&history[available - index]))
    }

    /// Lifecycle state of every sensor of the active scene, by id.
    pub fn sensor_states(&self) -> Vec<(String, SensorState)> {
        lock(&self.sensors)
            .iter()
            .map(|e| (e.sensor.id().to_string(), e.state))
            .collect()
    }

    fn set_state(&self, index: usize, state: SensorState, thread: Option<JoinHandle<()>>) {
        if let Some(entry) = lock(&self.sensors).get_mut(index) {
            entry.state = state;
            if thread.is_some() {
                entry.thread = thread;
            }
        }
    }

    // ── Export ──────────────────────────────────────────────────────────────

    pub fn export_hierarchy(&self) -> Result<Value, EmbodyError> {
        Ok(export::export_hierarchy(&*self.snapshot()?))
    }

    pub fn export_list(&self) -> Result<Value, EmbodyError> {
        Ok(export::export_list(&*self.snapshot()?))
    }

    pub fn export_custom(&self, layout: Layout, fields: &[Field]) -> Result<Value, EmbodyError> {
        Ok(export::export_custom(&*self.snapshot()?, layout, fields))
    }

    /// The named joints of the current snapshot.
    ///
    /// # Errors
    ///
    /// [`EmbodyError::UnknownJointType`] or [`EmbodyError::JointNotInModel`]
    /// for a bad name, besides [`EmbodyError::NoActiveScene`].
    pub fn export_joints<S: AsRef<str>>(
        &self,
        names: &[S],
        fields: &[Field],
    ) -> Result<Value, EmbodyError> {
        export::export_joints(&*self.snapshot()?, names, fields)
    }

    pub fn export_sensors(&self) -> Result<Value, EmbodyError> {
        Ok(export::export_sensors(&*self.snapshot()?))
    }

    /// `[joints, sensors]` of the archived snapshot at `index`; see
    /// [`history_frame`][Self::history_frame].
    pub fn export_history(&self, index: usize) -> Result<Value, EmbodyError> {
        Ok(export::export_elapsed(&*self.history_frame(index)?))
    }

    // ── Command dispatch ────────────────────────────────────────────────────

    /// Invoke `method` on the running sensor `id`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoSuchSensor`] when no running sensor has that id;
    /// otherwise whatever the sensor's command table reports.
    pub fn dispatch(&self, id: &str, method: &str, args: &[String]) -> Result<String, DispatchError> {
        let sensor = lock(&self.sensors)
            .iter()
            .find(|e| e.state == SensorState::Running && e.sensor.id() == id)
            .map(|e| Arc::clone(&e.sensor))
            .ok_or_else(|| DispatchError::NoSuchSensor(id.to_string()))?;
        debug!(sensor = %id, method, "dispatching sensor command");
        sensor.invoke(method, args)
    }
}

impl Drop for SceneController {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn start_sensor(sensor: &Arc<dyn Sensor>) -> Result<JoinHandle<()>, EmbodyError> {
    sensor.init()?;
    let runner = Arc::clone(sensor);
    thread::Builder::new()
        .name(format!("sensor-{}", sensor.id()))
        .spawn(move || runner.run())
        .map_err(|e| {
            sensor.terminate();
            EmbodyError::SensorInit {
                sensor: sensor.id().to_string(),
                details: e.to_string(),
            }
        })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_fusion::{ConfidenceDominanceFuser, DoubleExponentialFilter};
    use embody_hal::{FixedSensor, SensorSettings};
    use embody_types::{CandidateJoint, JointType, Quaternion, SensorData, Vec3};

    fn settings(id: &str) -> SensorSettings {
        SensorSettings {
            id: id.to_string(),
            position_confidence: None,
            orientation_confidence: None,
            absolute: true,
        }
    }

    fn head_at(x: f64) -> SensorData {
        let mut frame = SensorData::new();
        frame.insert(
            JointType::Head,
            CandidateJoint::new().with_position(Vec3::new(x, 100.0, 300.0), 0.9),
        );
        frame
    }

    fn body() -> Scene {
        let id = Quaternion::identity();
        let mut scene = Scene::new();
        scene
            .add_joint(JointType::SpineBase, Vec3::new(0.0, 20.0, 300.0), id, None)
            .unwrap();
        scene
            .add_joint(JointType::Head, Vec3::new(0.0, 76.8, 0.0), id, Some(JointType::SpineBase))
            .unwrap();
        scene
    }

    fn with_sensor(scene: &mut Scene, sensor: Arc<dyn Sensor>) {
        scene
            .add_sensor(sensor, None, Vec3::zero(), Quaternion::identity())
            .unwrap();
    }

    fn fuser() -> Box<dyn Fuser> {
        Box::new(ConfidenceDominanceFuser::new(DEFAULT_RETURN_TO_DEFAULT))
    }

    fn controller(frame_history: usize) -> (SceneController, Arc<FixedSensor>) {
        let controller = SceneController::new(ControllerConfig {
            frame_history,
            ..ControllerConfig::default()
        });
        let sensor = Arc::new(FixedSensor::new(settings("cam"), head_at(1.0)));
        let mut scene = body();
        with_sensor(&mut scene, sensor.clone());
        controller.reset(scene, fuser(), None);
        (controller, sensor)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    #[test]
    fn tick_without_scene_fails() {
        let controller = SceneController::new(ControllerConfig::default());
        assert_eq!(controller.tick().err(), Some(EmbodyError::NoActiveScene));
        assert_eq!(controller.snapshot().err(), Some(EmbodyError::NoActiveScene));
    }

    #[test]
    fn failing_sensor_is_ignored() {
        let controller = SceneController::new(ControllerConfig::default());
        let mut scene = body();
        with_sensor(&mut scene, Arc::new(FixedSensor::new(settings("good"), head_at(0.0))));
        with_sensor(&mut scene, Arc::new(FixedSensor::failing(settings("bad"))));
        controller.reset(scene, fuser(), None);

        assert_eq!(
            controller.sensor_states(),
            vec![
                ("good".to_string(), SensorState::Running),
                ("bad".to_string(), SensorState::Ignored),
            ]
        );
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.sensor_count(), 1);
        assert!(snapshot.sensor_by_id("bad").is_none());
        assert_eq!(snapshot.root_nodes().len(), 2, "SPINE_BASE and the good sensor");
    }

    #[test]
    fn terminate_joins_sensor_threads() {
        let (controller, _sensor) = controller(4);
        controller.terminate();
        assert!(!controller.is_active());
        assert_eq!(
            controller.sensor_states(),
            vec![("cam".to_string(), SensorState::Terminated)]
        );
        assert_eq!(controller.snapshot().err(), Some(EmbodyError::NoActiveScene));

        // A second terminate is a no-op.
        controller.terminate();
    }

    #[test]
    fn reset_replaces_active_scene() {
        let (controller, _sensor) = controller(4);
        controller.tick().unwrap();

        let mut scene = body();
        with_sensor(&mut scene, Arc::new(FixedSensor::new(settings("other"), head_at(5.0))));
        controller.reset(scene, fuser(), Some(Box::new(DoubleExponentialFilter::default())));

        assert_eq!(controller.frame_count(), 0);
        assert_eq!(controller.history_len(), 0);
        assert_eq!(
            controller.sensor_states(),
            vec![("other".to_string(), SensorState::Running)]
        );
    }

    // ── Tick ────────────────────────────────────────────────────────────────

    #[test]
    fn tick_publishes_fused_snapshot() {
        let (controller, _sensor) = controller(4);
        let frame = controller.tick().unwrap();
        assert_eq!(frame.sequence, 1);

        let snapshot = controller.snapshot().unwrap();
        assert!(Arc::ptr_eq(&snapshot, &frame.scene));
        assert_eq!(snapshot.timestamp(), frame.timestamp);
        assert_eq!(
            snapshot.absolute_position(JointType::Head),
            Some(Vec3::new(1.0, 100.0, 300.0))
        );
        let head = snapshot.joint(JointType::Head).unwrap();
        assert!(head.position_tracked);
        assert!(snapshot.sensors().all(|s| s.is_frozen()));
    }

    #[test]
    fn published_snapshots_are_independent() {
        let (controller, sensor) = controller(4);
        let first = controller.tick().unwrap().scene;

        sensor.set_frame(head_at(7.0));
        let second = controller.tick().unwrap().scene;

        let x1 = first.absolute_position(JointType::Head).unwrap().x;
        let x2 = second.absolute_position(JointType::Head).unwrap().x;
        assert!((x1 - 1.0).abs() < 1e-9, "first frame should keep x ~1, got {x1}");
        assert!((x2 - 7.0).abs() < 1e-9, "second frame should have x ~7, got {x2}");
    }

    // ── History ─────────────────────────────────────────────────────────────

    #[test]
    fn history_is_bounded() {
        const N: usize = 3;
        let (controller, _sensor) = controller(N);
        let frames: Vec<Frame> = (0..=N).map(|_| controller.tick().unwrap()).collect();

        assert_eq!(controller.history_len(), N);
        assert_eq!(
            controller.history_frame(N + 1).err(),
            Some(EmbodyError::HistoryOutOfRange {
                requested: N + 1,
                available: N
            })
        );
        assert_eq!(controller.history_frame(0).err(), Some(EmbodyError::HistoryIndex));

        let previous = controller.history_frame(1).unwrap();
        assert!(Arc::ptr_eq(&previous, &frames[N - 1].scene));
        let oldest = controller.history_frame(N).unwrap();
        assert!(Arc::ptr_eq(&oldest, &frames[0].scene));
    }

    /// Records the history each tick hands to the filter.
    struct Recorder(Arc<Mutex<Vec<Vec<Arc<Scene>>>>>);

    impl Filter for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn filter(&mut self, history: &[Arc<Scene>], _scene: &mut Scene) {
            lock(&self.0).push(history.to_vec());
        }
    }

    #[test]
    fn filter_sees_history_oldest_first() {
        const N: usize = 2;
        let controller = SceneController::new(ControllerConfig {
            frame_history: N,
            ..ControllerConfig::default()
        });
        let mut scene = body();
        with_sensor(&mut scene, Arc::new(FixedSensor::new(settings("cam"), head_at(1.0))));
        let seen = Arc::new(Mutex::new(Vec::new()));
        controller.reset(scene, fuser(), Some(Box::new(Recorder(seen.clone()))));

        let frames: Vec<Frame> = (0..4).map(|_| controller.tick().unwrap()).collect();

        let seen = lock(&seen);
        let lengths: Vec<usize> = seen.iter().map(Vec::len).collect();
        // The reset snapshot is archived by the first tick.
        assert_eq!(lengths, vec![0, 1, 2, 2]);
        let last = &seen[3];
        assert!(Arc::ptr_eq(&last[0], &frames[0].scene));
        assert!(Arc::ptr_eq(&last[1], &frames[1].scene));
        assert_eq!(controller.history_len(), N);
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let (controller, _sensor) = controller(0);
        controller.tick().unwrap();
        controller.tick().unwrap();
        assert_eq!(controller.history_len(), 0);
        assert!(controller.history_frame(1).is_err());
    }

    #[test]
    fn history_export_holds_joints_and_sensors() {
        let (controller, _sensor) = controller(2);
        controller.tick().unwrap();
        let value = controller.export_history(1).unwrap();
        let parts = value.as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_array().unwrap().len(), 2);
        assert_eq!(parts[1][0]["id"], "cam");
    }

    // ── Dispatch ────────────────────────────────────────────────────────────

    #[test]
    fn dispatch_reaches_running_sensor() {
        let (controller, _sensor) = controller(2);
        assert_eq!(controller.dispatch("cam", "joints", &[]).unwrap(), "HEAD");
        assert_eq!(
            controller.dispatch("cam", "clear", &[]),
            Err(DispatchError::NotAccessible {
                method: "clear".to_string()
            })
        );
        assert!(matches!(
            controller.dispatch("cam", "explode", &[]),
            Err(DispatchError::NoSuchMethod { .. })
        ));
        assert_eq!(
            controller.dispatch("nobody", "joints", &[]),
            Err(DispatchError::NoSuchSensor("nobody".to_string()))
        );
    }

    // ── Bus ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn ticks_are_broadcast() {
        let (controller, _sensor) = controller(2);
        let mut sub = controller.subscribe();
        controller.tick().unwrap();
        controller.tick().unwrap();
        assert_eq!(sub.recv().await.unwrap().sequence, 1);
        assert_eq!(sub.recv().await.unwrap().sequence, 2);
    }

    #[test]
    fn tick_interval_follows_frequency() {
        let config = ControllerConfig::default();
        let interval = config.tick_interval();
        assert!((interval.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
        let broken = ControllerConfig {
            update_frequency: 0.0,
            ..config
        };
        assert_eq!(broken.tick_interval(), Duration::from_secs(1));
    }
}
