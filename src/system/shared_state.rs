//! Shared state between the sensor callback and the presentation pass.
//!
//! The track registry is the only shared mutable resource. It sits behind a
//! single mutex that the sensor side holds for a whole association step and
//! the presentation side holds for a whole read pass, so neither ever sees a
//! half-updated track set.
//!
//! The camera-to-world transform is kept apart under its own lock: it is
//! written once the host's coordinate system becomes available and read
//! without touching the registry lock. A stale or missing value only means
//! the identity fallback is used for a frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::Matrix4;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::TrackingConfig;
use crate::geometry::CoordinateTransformer;
use crate::tracking::{HandTrack, RegistryStats, TrackRegistry};

use super::messages::SensorFrameMsg;

/// State accessible by both the sensor ingest thread and the presentation side.
pub struct SharedState {
    /// All hand tracks. Lock for the full duration of an update or a read pass.
    pub(crate) registry: Mutex<TrackRegistry>,

    /// Camera-to-world relation from the host's coordinate system, if known.
    camera_to_world: RwLock<Option<Matrix4<f64>>>,

    /// Request the ingest thread to exit.
    shutdown_requested: AtomicBool,
}

impl SharedState {
    /// Create a new SharedState with an empty registry.
    pub fn new(config: TrackingConfig) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(TrackRegistry::new(config)),
            camera_to_world: RwLock::new(None),
            shutdown_requested: AtomicBool::new(false),
        })
    }

    /// Run one association step for a sensor frame.
    ///
    /// The world transform is resolved before the registry lock is taken;
    /// the lock is then held for the whole update.
    pub fn apply_frame(&self, msg: &SensorFrameMsg) {
        let camera_to_world = self.camera_to_world();
        let transformer = CoordinateTransformer::new(&msg.camera_view, camera_to_world.as_ref());

        let mut registry = self.registry.lock();
        match transformer {
            Some(t) => registry.ingest(&msg.hands, &t),
            None => {
                debug!(
                    "Frame {} dropped: camera view not invertible ({} hands)",
                    msg.timestamp_ns,
                    msg.hands.len()
                );
                registry.record_rejected(msg.hands.len() as u64);
                registry.update(&[]);
            }
        }
    }

    /// Publish the camera-to-world transform.
    pub fn set_camera_to_world(&self, transform: Matrix4<f64>) {
        *self.camera_to_world.write() = Some(transform);
    }

    pub fn camera_to_world(&self) -> Option<Matrix4<f64>> {
        *self.camera_to_world.read()
    }

    /// Owned copy of all tracks, taken under the registry lock.
    pub fn snapshot(&self) -> Vec<HandTrack> {
        self.registry.lock().tracks().to_vec()
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.lock().stats().clone()
    }

    /// Request shutdown of the ingest thread.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown was requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Roi;
    use crate::tracking::LandmarkFrame;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn hand(z: f64) -> LandmarkFrame {
        LandmarkFrame::new(
            Vector3::new(0.2, 0.0, z),
            Vector3::new(0.2, 0.1, z),
            vec![],
            Roi::new(0, 0, 10, 10),
        )
    }

    #[test]
    fn test_apply_frame_uses_camera_to_world() {
        let shared = SharedState::new(TrackingConfig::default());
        shared.set_camera_to_world(Matrix4::new_translation(&Vector3::new(0.0, 1.5, 0.0)));
        shared.apply_frame(&SensorFrameMsg::new(1, vec![hand(0.5)]));

        let tracks = shared.snapshot();
        assert_eq!(tracks.len(), 1);
        assert_relative_eq!(*tracks[0].position(), Vector3::new(0.2, 1.5, -0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_transform_degrades_to_camera_relative() {
        let shared = SharedState::new(TrackingConfig::default());
        shared.apply_frame(&SensorFrameMsg::new(1, vec![hand(0.5)]));
        assert_relative_eq!(
            *shared.snapshot()[0].position(),
            Vector3::new(0.2, 0.0, -0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_singular_view_counts_as_missed_frame() {
        let shared = SharedState::new(TrackingConfig::default());
        shared.apply_frame(&SensorFrameMsg::new(1, vec![hand(0.5)]));

        let mut msg = SensorFrameMsg::new(2, vec![hand(0.6)]);
        msg.camera_view = Matrix4::zeros();
        shared.apply_frame(&msg);

        let stats = shared.stats();
        assert_eq!(stats.rejected_samples, 1);
        assert_eq!(stats.frames_processed, 2);
        assert_eq!(shared.snapshot()[0].state(), crate::tracking::TrackState::Stale);
    }

    #[test]
    fn test_shutdown_flag() {
        let shared = SharedState::new(TrackingConfig::default());
        assert!(!shared.is_shutdown_requested());
        shared.request_shutdown();
        assert!(shared.is_shutdown_requested());
    }
}
