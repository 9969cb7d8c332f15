//! Simulated tracking devices for headless runs and tests.
//!
//! - [`SimSensor`] animates a set of joints on its own acquisition thread.
//! - [`FixedSensor`] reports a constant frame that tests can swap at will.
//!
//! Both accept the shared [`SensorSettings`] arguments on top of their own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use embody_types::{
    Arguments, CandidateJoint, DispatchError, EmbodyError, JointType, Quaternion, SensorData,
    Vec3,
};
use tracing::{debug, info, warn};

use crate::command::CommandTable;
use crate::sensor::{DataSlot, Sensor, SensorSettings, StopSignal};

// ────────────────────────────────────────────────────────────────────────────
// Argument helpers
// ────────────────────────────────────────────────────────────────────────────

fn invalid(key: &str, value: &str) -> EmbodyError {
    EmbodyError::InvalidArgument {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_components<const N: usize>(key: &str, raw: &str) -> Result<[f64; N], EmbodyError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid(key, raw))?;
    parts.try_into().map_err(|_| invalid(key, raw))
}

/// Parse `"x,y,z"`.
fn parse_vec3(key: &str, raw: &str) -> Result<Vec3, EmbodyError> {
    parse_components::<3>(key, raw).map(Vec3::from)
}

/// Parse `"w,x,y,z"`, rejecting NaN components.
fn parse_quaternion(key: &str, raw: &str) -> Result<Quaternion, EmbodyError> {
    Quaternion::try_from(parse_components::<4>(key, raw)?)
}

/// Parse a comma-separated list of joint names.
fn parse_joint_list(key: &str, raw: &str) -> Result<Vec<JointType>, EmbodyError> {
    raw.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<JointType>().map_err(|_| invalid(key, raw)))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// SimSensor
// ────────────────────────────────────────────────────────────────────────────

const SIM_DEFAULT_POSITION_CONFIDENCE: f64 = 0.8;
const SIM_DEFAULT_ORIENTATION_CONFIDENCE: f64 = 0.6;

/// An animated sensor: every configured joint travels along a circle around
/// `origin` and spins about the z axis, one revolution per `period`.
///
/// # Arguments
///
/// | key          | default   | meaning                                  |
/// |--------------|-----------|------------------------------------------|
/// | `joints`     | `HEAD`    | comma-separated joint names               |
/// | `origin`     | `0,0,0`   | circle centre, `x,y,z`                    |
/// | `amplitude`  | `10`      | circle radius                             |
/// | `period_ms`  | `2000`    | duration of one revolution                |
/// | `rate_hz`    | `60`      | acquisition rate                          |
/// | `fail_init`  | `false`   | make [`Sensor::init`] fail                |
pub struct SimSensor {
    settings: SensorSettings,
    joints: Vec<JointType>,
    origin: Vec3,
    amplitude: Mutex<f64>,
    period: Duration,
    rate_hz: f64,
    fail_init: bool,
    frames: AtomicU64,
    running: AtomicBool,
    slot: DataSlot,
    stop: StopSignal,
}

impl SimSensor {
    pub const KIND: &'static str = "sim";
    const KEYS: &'static [&'static str] = &[
        "joints",
        "origin",
        "amplitude",
        "period_ms",
        "rate_hz",
        "fail_init",
    ];

    /// Build from configuration arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] for unparsable values and for
    /// a non-positive `rate_hz` or `period_ms`.
    pub fn from_args(id: Option<String>, args: &Arguments) -> Result<Self, EmbodyError> {
        let known: Vec<&str> = Self::KEYS
            .iter()
            .chain(SensorSettings::KEYS)
            .copied()
            .collect();
        args.warn_unknown(Self::KIND, &known);

        let settings = SensorSettings::from_args(id, args)?;
        let joints = match args.get("joints") {
            Some(raw) => parse_joint_list("joints", raw)?,
            None => vec![JointType::Head],
        };
        let origin = match args.get("origin") {
            Some(raw) => parse_vec3("origin", raw)?,
            None => Vec3::zero(),
        };
        let period_ms: u64 = args.parse_or("period_ms", 2000)?;
        if period_ms == 0 {
            return Err(invalid("period_ms", "0"));
        }
        let rate_hz: f64 = args.parse_or("rate_hz", 60.0)?;
        if rate_hz <= 0.0 || !rate_hz.is_finite() {
            return Err(invalid("rate_hz", &rate_hz.to_string()));
        }

        Ok(Self {
            settings,
            joints,
            origin,
            amplitude: Mutex::new(args.parse_or("amplitude", 10.0)?),
            period: Duration::from_millis(period_ms),
            rate_hz,
            fail_init: args.parse_or("fail_init", false)?,
            frames: AtomicU64::new(0),
            running: AtomicBool::new(false),
            slot: DataSlot::new(),
            stop: StopSignal::new(),
        })
    }

    /// Number of frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    fn amplitude(&self) -> f64 {
        *self.amplitude.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Synthesise the frame for acquisition step `step`.
    fn frame_at(&self, step: u64) -> SensorData {
        let t = step as f64 / self.rate_hz;
        let phase = std::f64::consts::TAU * t / self.period.as_secs_f64();
        let amplitude = self.amplitude();
        let pc = self
            .settings
            .position_confidence
            .unwrap_or(SIM_DEFAULT_POSITION_CONFIDENCE);
        let oc = self
            .settings
            .orientation_confidence
            .unwrap_or(SIM_DEFAULT_ORIENTATION_CONFIDENCE);

        self.joints
            .iter()
            .enumerate()
            .map(|(i, &jt)| {
                let a = phase + i as f64 * 0.5;
                let position = self.origin + Vec3::new(a.cos(), a.sin(), 0.0).scale(amplitude);
                let half = a / 2.0;
                let orientation = Quaternion::new(half.cos(), 0.0, 0.0, half.sin());
                let candidate = CandidateJoint::new()
                    .with_position(position, pc)
                    .with_orientation(orientation, oc);
                (jt, candidate)
            })
            .collect()
    }

    fn commands() -> &'static CommandTable<SimSensor> {
        static TABLE: OnceLock<CommandTable<SimSensor>> = OnceLock::new();
        TABLE.get_or_init(|| {
            CommandTable::<Self>::new()
                .public("status", |s| {
                    Ok(if s.running.load(Ordering::SeqCst) {
                        "running".to_string()
                    } else {
                        "idle".to_string()
                    })
                })
                .public("frames", |s| Ok(s.frames().to_string()))
                .public_unary("set_amplitude", |s, arg| {
                    let value: f64 = arg
                        .trim()
                        .parse()
                        .map_err(|_| format!("'{arg}' is not a number"))?;
                    *s.amplitude.lock().unwrap_or_else(|e| e.into_inner()) = value;
                    Ok(value.to_string())
                })
                .public("recalibrate", |_| {
                    Err("no calibration rig attached to a simulated sensor".to_string())
                })
                .internal("reset_hardware", |s| {
                    s.frames.store(0, Ordering::SeqCst);
                    Ok(String::new())
                })
        })
    }
}

impl Sensor for SimSensor {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn collects_absolute_data(&self) -> bool {
        self.settings.absolute
    }

    fn init(&self) -> Result<(), EmbodyError> {
        if self.fail_init {
            return Err(EmbodyError::SensorInit {
                sensor: self.settings.id.clone(),
                details: "simulated device refused to start".to_string(),
            });
        }
        self.stop.reset();
        self.slot.publish(self.frame_at(0));
        info!(sensor = %self.settings.id, joints = self.joints.len(), "sim sensor ready");
        Ok(())
    }

    fn run(&self) {
        let interval = Duration::from_secs_f64(1.0 / self.rate_hz);
        self.running.store(true, Ordering::SeqCst);
        loop {
            let step = self.frames.fetch_add(1, Ordering::SeqCst);
            self.slot.publish(self.frame_at(step));
            if self.stop.wait(interval) {
                break;
            }
        }
        self.running.store(false, Ordering::SeqCst);
        debug!(sensor = %self.settings.id, frames = self.frames(), "sim sensor stopped");
    }

    fn terminate(&self) {
        self.stop.stop();
    }

    fn current_data(&self) -> Arc<SensorData> {
        self.slot.snapshot()
    }

    fn invoke(&self, method: &str, args: &[String]) -> Result<String, DispatchError> {
        Self::commands().invoke(&self.settings.id, self, method, args)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FixedSensor
// ────────────────────────────────────────────────────────────────────────────

/// A sensor that reports a constant frame.
///
/// Every argument whose key names a joint contributes one reading, written
/// as `"x,y,z"` (position only), `";w,x,y,z"` (orientation only) or
/// `"x,y,z;w,x,y,z"` (both).  Confidences default to 1.
pub struct FixedSensor {
    settings: SensorSettings,
    fail_init: bool,
    slot: DataSlot,
    stop: StopSignal,
}

impl FixedSensor {
    pub const KIND: &'static str = "fixed";

    /// A sensor that reports `frame` as given.
    pub fn new(settings: SensorSettings, frame: SensorData) -> Self {
        let slot = DataSlot::new();
        slot.publish(frame);
        Self {
            settings,
            fail_init: false,
            slot,
            stop: StopSignal::new(),
        }
    }

    /// A sensor whose [`Sensor::init`] always fails.
    pub fn failing(settings: SensorSettings) -> Self {
        Self {
            fail_init: true,
            ..Self::new(settings, SensorData::new())
        }
    }

    /// Build from configuration arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] for unparsable readings.
    pub fn from_args(id: Option<String>, args: &Arguments) -> Result<Self, EmbodyError> {
        let settings = SensorSettings::from_args(id, args)?;
        let pc = settings.position_confidence.unwrap_or(1.0);
        let oc = settings.orientation_confidence.unwrap_or(1.0);

        let mut frame = SensorData::new();
        for (key, raw) in args.iter() {
            if key == "fail_init" || SensorSettings::KEYS.contains(&key) {
                continue;
            }
            let Ok(jt) = key.parse::<JointType>() else {
                warn!(component = Self::KIND, key, "unknown argument; it will be ignored");
                continue;
            };
            let (pos, ori) = raw.split_once(';').unwrap_or((raw, ""));
            let mut candidate = CandidateJoint::new();
            if !pos.trim().is_empty() {
                candidate = candidate.with_position(parse_vec3(key, pos)?, pc);
            }
            if !ori.trim().is_empty() {
                candidate = candidate.with_orientation(parse_quaternion(key, ori)?, oc);
            }
            frame.insert(jt, candidate);
        }

        Ok(Self {
            fail_init: args.parse_or("fail_init", false)?,
            ..Self::new(settings, frame)
        })
    }

    /// Replace the reported frame.
    pub fn set_frame(&self, frame: SensorData) {
        self.slot.publish(frame);
    }

    fn commands() -> &'static CommandTable<FixedSensor> {
        static TABLE: OnceLock<CommandTable<FixedSensor>> = OnceLock::new();
        TABLE.get_or_init(|| {
            CommandTable::<Self>::new()
                .public("joints", |s| {
                    let names: Vec<&str> =
                        s.slot.snapshot().keys().map(|jt| jt.as_str()).collect();
                    Ok(names.join(","))
                })
                .internal("clear", |s| {
                    s.slot.publish(SensorData::new());
                    Ok(String::new())
                })
        })
    }
}

impl Sensor for FixedSensor {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn collects_absolute_data(&self) -> bool {
        self.settings.absolute
    }

    fn init(&self) -> Result<(), EmbodyError> {
        if self.fail_init {
            return Err(EmbodyError::SensorInit {
                sensor: self.settings.id.clone(),
                details: "configured to fail".to_string(),
            });
        }
        self.stop.reset();
        Ok(())
    }

    fn run(&self) {
        self.stop.wait_forever();
    }

    fn terminate(&self) {
        self.stop.stop();
    }

    fn current_data(&self) -> Arc<SensorData> {
        self.slot.snapshot()
    }

    fn invoke(&self, method: &str, args: &[String]) -> Result<String, DispatchError> {
        Self::commands().invoke(&self.settings.id, self, method, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sim(args: Arguments) -> SimSensor {
        SimSensor::from_args(Some("sim-1".into()), &args).unwrap()
    }

    // ── SimSensor ───────────────────────────────────────────────────────────

    #[test]
    fn sim_init_publishes_first_frame() {
        let s = sim(Arguments::new().with("joints", "HEAD,WRIST_LEFT").with("amplitude", 5));
        assert!(s.current_data().is_empty());
        s.init().unwrap();
        let data = s.current_data();
        assert_eq!(data.len(), 2);
        let head = data[&JointType::Head];
        let p = head.position.unwrap();
        assert!((p.x - 5.0).abs() < 1e-9, "x should be ~5, got {}", p.x);
        assert!((head.position_confidence - SIM_DEFAULT_POSITION_CONFIDENCE).abs() < 1e-12);
    }

    #[test]
    fn sim_run_stops_on_terminate() {
        let s = Arc::new(sim(Arguments::new().with("rate_hz", 200)));
        s.init().unwrap();
        let handle = {
            let s = Arc::clone(&s);
            thread::spawn(move || s.run())
        };
        thread::sleep(Duration::from_millis(50));
        s.terminate();
        handle.join().unwrap();
        assert!(s.frames() > 0, "acquisition loop should have produced frames");
        assert_eq!(s.invoke("status", &[]).unwrap(), "idle");
    }

    #[test]
    fn sim_fail_init() {
        let s = sim(Arguments::new().with("fail_init", true));
        assert!(matches!(s.init(), Err(EmbodyError::SensorInit { .. })));
    }

    #[test]
    fn sim_rejects_bad_arguments() {
        let err = SimSensor::from_args(None, &Arguments::new().with("joints", "HEAD,TAIL"))
            .err()
            .unwrap();
        assert!(matches!(err, EmbodyError::InvalidArgument { .. }));
        assert!(SimSensor::from_args(None, &Arguments::new().with("rate_hz", 0)).is_err());
        assert!(SimSensor::from_args(None, &Arguments::new().with("origin", "1,2")).is_err());
    }

    #[test]
    fn sim_commands() {
        let s = sim(Arguments::new());
        assert_eq!(s.invoke("set_amplitude", &["2.5".into()]).unwrap(), "2.5");
        assert!((s.amplitude() - 2.5).abs() < 1e-12);
        assert!(matches!(
            s.invoke("reset_hardware", &[]),
            Err(DispatchError::NotAccessible { .. })
        ));
        assert!(matches!(
            s.invoke("recalibrate", &[]),
            Err(DispatchError::Failed { .. })
        ));
        assert!(matches!(
            s.invoke("set_amplitude", &[]),
            Err(DispatchError::BadArguments { .. })
        ));
    }

    // ── FixedSensor ─────────────────────────────────────────────────────────

    #[test]
    fn fixed_parses_readings() {
        let args = Arguments::new()
            .with("HEAD", "1,2,3")
            .with("WRIST_LEFT", "0,0,1;0,1,0,0")
            .with("wrist_right", ";1,0,0,0")
            .with("orientation_confidence", 0.5)
            .with("absolute", false);
        let s = FixedSensor::from_args(Some("f".into()), &args).unwrap();
        assert!(!s.collects_absolute_data());

        let data = s.current_data();
        assert_eq!(data.len(), 3);
        assert_eq!(data[&JointType::Head].position, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(data[&JointType::Head].orientation, None);
        let wl = data[&JointType::WristLeft];
        assert_eq!(wl.orientation, Some(Quaternion::new(0.0, 1.0, 0.0, 0.0)));
        assert!((wl.orientation_confidence - 0.5).abs() < 1e-12);
        assert!((wl.position_confidence - 1.0).abs() < 1e-12);
        assert_eq!(data[&JointType::WristRight].position, None);
    }

    #[test]
    fn fixed_rejects_malformed_reading() {
        let args = Arguments::new().with("HEAD", "1,2,x");
        assert!(FixedSensor::from_args(None, &args).is_err());
        let args = Arguments::new().with("HEAD", "1,2,3;1,0,0");
        assert!(FixedSensor::from_args(None, &args).is_err());
    }

    #[test]
    fn fixed_set_frame_and_commands() {
        let s = FixedSensor::new(
            SensorSettings::from_args(Some("f".into()), &Arguments::new()).unwrap(),
            SensorData::new(),
        );
        let mut frame = SensorData::new();
        frame.insert(JointType::Head, CandidateJoint::new());
        frame.insert(JointType::Neck, CandidateJoint::new());
        s.set_frame(frame);
        let joints = s.invoke("joints", &[]).unwrap();
        assert!(joints.contains("HEAD") && joints.contains("NECK"));
    }

    #[test]
    fn fixed_run_returns_after_terminate() {
        let s = Arc::new(FixedSensor::new(
            SensorSettings::from_args(None, &Arguments::new()).unwrap(),
            SensorData::new(),
        ));
        s.init().unwrap();
        let handle = {
            let s = Arc::clone(&s);
            thread::spawn(move || s.run())
        };
        s.terminate();
        handle.join().unwrap();
    }
}
