//! Publish/subscribe channel for finished frames.
//!
//! Uses [`tokio::sync::broadcast`] so every subscriber receives every frame
//! and a slow subscriber never blocks the controller.  A subscriber that
//! falls more than the channel capacity behind skips the frames it missed.
//!
//! Frames carry an `Arc<Scene>`: publishing never copies the scene and
//! subscribers cannot mutate it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use embody_scene::Scene;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity (frames buffered per subscriber before the
/// oldest is dropped).
pub const DEFAULT_CAPACITY: usize = 256;

/// One published snapshot of the body model.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Tick counter, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub scene: Arc<Scene>,
}

/// Shared frame channel.  Clone it cheaply; all clones share the same
/// underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct FrameBus {
    sender: broadcast::Sender<Frame>,
}

impl FrameBus {
    /// Create a bus buffering up to `capacity` frames per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `frame` to every current subscriber.
    ///
    /// Returns the number of subscribers handed the frame.  Having none is
    /// normal and yields 0.
    pub fn publish(&self, frame: Frame) -> usize {
        let sequence = frame.sequence;
        match self.sender.send(frame) {
            Ok(n) => n,
            Err(broadcast::error::SendError(_)) => {
                debug!(sequence, "no frame subscribers");
                0
            }
        }
    }

    /// Subscribe to frames published from now on.
    pub fn subscribe(&self) -> FrameSubscriber {
        FrameSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FrameBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receives frames from a [`FrameBus`].
pub struct FrameSubscriber {
    receiver: broadcast::Receiver<Frame>,
}

impl FrameSubscriber {
    /// Wait for the next frame.
    ///
    /// Frames missed by lagging behind are skipped with a warning.  Returns
    /// `None` once every [`FrameBus`] clone has been dropped.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.receiver.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "frame subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The next frame if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        loop {
            match self.receiver.try_recv() {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "frame subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_types::{JointType, Quaternion, Vec3};

    fn frame(sequence: u64) -> Frame {
        let mut scene = Scene::new();
        scene
            .add_joint(JointType::SpineBase, Vec3::zero(), Quaternion::identity(), None)
            .unwrap();
        Frame {
            sequence,
            timestamp: Utc::now(),
            scene: Arc::new(scene),
        }
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = FrameBus::default();
        let mut sub = bus.subscribe();

        assert_eq!(bus.publish(frame(1)), 1);

        let received = sub.recv().await.expect("subscriber must receive");
        assert_eq!(received.sequence, 1);
        assert_eq!(received.scene.joint_count(), 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_share_one_scene() {
        let bus = FrameBus::default();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let f = frame(7);
        let scene = Arc::clone(&f.scene);
        assert_eq!(bus.publish(f), 2);

        let r1 = sub1.recv().await.expect("subscriber 1 must receive");
        let r2 = sub2.recv().await.expect("subscriber 2 must receive");
        assert!(Arc::ptr_eq(&r1.scene, &scene));
        assert!(Arc::ptr_eq(&r2.scene, &scene));
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = FrameBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(frame(1)), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_skips_to_recent_frames() {
        let bus = FrameBus::new(4);
        let mut slow = bus.subscribe();
        for seq in 1..=20 {
            bus.publish(frame(seq));
        }
        let first = slow.recv().await.expect("frames must still arrive");
        assert!(first.sequence > 1, "oldest frames should have been dropped");
        assert!(slow.try_recv().is_some());
    }

    #[tokio::test]
    async fn closed_bus_ends_subscription() {
        let bus = FrameBus::default();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}
