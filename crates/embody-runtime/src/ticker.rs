//! [`Ticker`] – drives [`SceneController::tick`] at the configured rate.
//!
//! The ticker is a Tokio task with an explicit start and stop.  A tick that
//! overruns its period delays the next one instead of bursting to catch up,
//! and a failed or panicking tick is logged without ending the loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::controller::SceneController;

/// Handle to a running tick loop.
pub struct Ticker {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl Ticker {
    /// Spawn the tick loop on the current Tokio runtime.
    ///
    /// Dropping the returned handle also ends the loop at its next wake-up.
    pub fn start(controller: Arc<SceneController>) -> Self {
        let period = controller.config().tick_interval();
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        match panic::catch_unwind(AssertUnwindSafe(|| controller.tick())) {
                            Ok(Ok(_)) => ticks += 1,
                            Ok(Err(e)) => debug!(error = %e, "tick skipped"),
                            Err(_) => error!("tick panicked; continuing with the next one"),
                        }
                    }
                }
            }
            ticks
        });

        info!(period_ms = period.as_millis() as u64, "ticker started");
        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for the tick in progress to finish.
    ///
    /// Returns the number of successful ticks.
    pub async fn stop(mut self) -> u64 {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        match handle.await {
            Ok(ticks) => {
                info!(ticks, "ticker stopped");
                ticks
            }
            Err(e) => {
                error!(error = %e, "ticker task failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use embody_fusion::ConfidenceWeightedFuser;
    use embody_hal::Sensor;
    use embody_scene::{ModelType, SkeletonTemplate};
    use embody_types::{EmbodyError, JointType, Quaternion, SensorData, Vec3};

    use crate::controller::{ControllerConfig, DEFAULT_RETURN_TO_DEFAULT};

    fn fast_controller() -> Arc<SceneController> {
        Arc::new(SceneController::new(ControllerConfig {
            update_frequency: 200.0,
            ..ControllerConfig::default()
        }))
    }

    #[tokio::test]
    async fn ticks_until_stopped() {
        let controller = fast_controller();
        let template = SkeletonTemplate::new(ModelType::Simple, ModelType::None, ModelType::None);
        controller.reset(
            template.build().unwrap(),
            Box::new(ConfidenceWeightedFuser::new(DEFAULT_RETURN_TO_DEFAULT)),
            None,
        );

        let ticker = Ticker::start(controller.clone());
        assert!(ticker.is_running());
        tokio::time::sleep(Duration::from_millis(100)).await;
        let ticks = ticker.stop().await;

        assert!(ticks > 0, "expected at least one tick");
        assert_eq!(controller.frame_count(), ticks);

        // Nothing ticks after stop.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(controller.frame_count(), ticks);
    }

    /// A driver whose readings cannot be fetched once `broken` is set.
    struct BrokenSensor {
        broken: AtomicBool,
    }

    impl Sensor for BrokenSensor {
        fn id(&self) -> &str {
            "broken"
        }
        fn kind(&self) -> &str {
            "broken"
        }
        fn collects_absolute_data(&self) -> bool {
            true
        }
        fn init(&self) -> Result<(), EmbodyError> {
            Ok(())
        }
        fn run(&self) {}
        fn terminate(&self) {}
        fn current_data(&self) -> Arc<SensorData> {
            if self.broken.load(Ordering::SeqCst) {
                panic!("device vanished");
            }
            Arc::new(SensorData::new())
        }
    }

    #[tokio::test]
    async fn panicking_tick_does_not_end_the_loop() {
        let controller = fast_controller();
        let mut scene = SkeletonTemplate::new(ModelType::Simple, ModelType::None, ModelType::None)
            .build()
            .unwrap();
        let sensor = Arc::new(BrokenSensor {
            broken: AtomicBool::new(false),
        });
        scene
            .add_sensor(
                sensor.clone(),
                Some(JointType::SpineBase),
                Vec3::zero(),
                Quaternion::identity(),
            )
            .unwrap();
        controller.reset(
            scene,
            Box::new(ConfidenceWeightedFuser::new(DEFAULT_RETURN_TO_DEFAULT)),
            None,
        );

        sensor.broken.store(true, Ordering::SeqCst);

        let ticker = Ticker::start(controller.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ticker.is_running(), "a panicking tick must not end the loop");
        assert_eq!(ticker.stop().await, 0);
        assert!(controller.is_active());
    }

    #[tokio::test]
    async fn inactive_controller_is_tolerated() {
        let controller = fast_controller();
        let ticker = Ticker::start(controller.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(ticker.is_running(), "failed ticks must not end the loop");
        assert_eq!(ticker.stop().await, 0);
    }
}
