//! Hand tracking system - main entry point and thread orchestration.
//!
//! The `HandTrackingSystem` owns the shared state, spawns the sensor ingest
//! thread and runs the presentation pass on the caller's thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use nalgebra::{Matrix4, Vector3};
use tracing::{debug, info};

use crate::config::{CursorConfig, HandTrackingConfig};
use crate::pointing::{PointingEstimator, PointingRay, project_cursor};
use crate::tracking::{HandTrack, RegistryStats, TrackId};

use super::messages::SensorFrameMsg;
use super::shared_state::SharedState;

/// Capacity of the frame channel between the sensor callback and ingest.
/// When the channel is full, `submit` blocks briefly.
const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Timeout for receiving frames. Allows periodic shutdown checks.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Everything the presentation layer needs for one rendered frame.
#[derive(Debug, Clone)]
pub struct PresentationFrame {
    /// Owned copy of all tracks at the time of the pass.
    pub tracks: Vec<HandTrack>,

    /// Track driving the pointing ray, if any.
    pub active: Option<TrackId>,

    pub ray: Option<PointingRay>,

    /// Cursor position along the ray.
    pub cursor: Option<Vector3<f64>>,

    pub stats: RegistryStats,
}

impl PresentationFrame {
    /// The track driving the pointing ray.
    pub fn active_track(&self) -> Option<&HandTrack> {
        let id = self.active?;
        self.tracks.iter().find(|t| t.id() == id)
    }
}

/// Top-level hand tracking system.
pub struct HandTrackingSystem {
    /// Shared state (registry, transform handle, flags).
    shared: Arc<SharedState>,

    /// Pointing state lives on the presentation side only.
    estimator: PointingEstimator,

    cursor: CursorConfig,

    /// Channel sender for sensor frames (callback -> ingest).
    frame_sender: Option<Sender<SensorFrameMsg>>,

    /// Handle to the ingest thread.
    ingest_handle: Option<JoinHandle<()>>,
}

impl HandTrackingSystem {
    /// Validate `config`, create the shared state and spawn the ingest thread.
    pub fn new(config: HandTrackingConfig) -> Result<Self> {
        config.validate()?;
        let shared = SharedState::new(config.tracking.clone());

        let (frame_sender, frame_receiver) = bounded::<SensorFrameMsg>(FRAME_CHANNEL_CAPACITY);
        let ingest_handle = Self::spawn_ingest(shared.clone(), frame_receiver)?;

        Ok(Self {
            shared,
            estimator: PointingEstimator::new(config.pointing),
            cursor: config.cursor,
            frame_sender: Some(frame_sender),
            ingest_handle: Some(ingest_handle),
        })
    }

    /// Spawn the sensor ingest thread.
    fn spawn_ingest(
        shared: Arc<SharedState>,
        frame_receiver: Receiver<SensorFrameMsg>,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("hand-ingest".to_string())
            .spawn(move || run_ingest(frame_receiver, shared))
            .context("Failed to spawn hand ingest thread")
    }

    /// Sender for a sensor callback running on its own thread.
    pub fn frame_sender(&self) -> Option<Sender<SensorFrameMsg>> {
        self.frame_sender.clone()
    }

    /// Queue a sensor frame for the ingest thread.
    pub fn submit(&self, msg: SensorFrameMsg) -> Result<()> {
        let sender = self
            .frame_sender
            .as_ref()
            .ok_or_else(|| anyhow!("Hand tracking system is shut down"))?;
        sender
            .send(msg)
            .map_err(|_| anyhow!("Hand ingest thread has exited"))
    }

    /// Apply a sensor frame synchronously on the calling thread.
    pub fn on_hand_update(&self, msg: &SensorFrameMsg) {
        self.shared.apply_frame(msg);
    }

    /// Publish the camera-to-world transform once the host's coordinate
    /// system is available.
    pub fn set_camera_to_world(&self, transform: Matrix4<f64>) {
        self.shared.set_camera_to_world(transform);
    }

    /// Run one presentation pass.
    ///
    /// Holds the registry lock while the tracks are copied and the pointing
    /// ray is estimated, so the result reflects one consistent track set.
    pub fn present(&mut self, body_reference: &Vector3<f64>) -> PresentationFrame {
        let (tracks, ray, stats) = {
            let registry = self.shared.registry.lock();
            let ray = self.estimator.update(registry.tracks(), body_reference);
            (registry.tracks().to_vec(), ray, registry.stats().clone())
        };

        let active = ray.map(|r| r.track_id);
        let cursor = ray.and_then(|r| {
            tracks
                .iter()
                .find(|t| t.id() == r.track_id)
                .map(|t| project_cursor(&r.direction, body_reference, t.position(), &self.cursor))
        });

        PresentationFrame {
            tracks,
            active,
            ray,
            cursor,
            stats,
        }
    }

    /// Get a reference to the shared state.
    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Shutdown the system gracefully.
    ///
    /// Closes our end of the frame channel, signals the ingest thread and
    /// waits for it. Frames still queued are dropped.
    pub fn shutdown(&mut self) {
        // External senders may outlive us, so the flag is what stops the loop.
        self.frame_sender = None;
        if let Some(handle) = self.ingest_handle.take() {
            self.shared.request_shutdown();
            let _ = handle.join();
        }
    }
}

impl Drop for HandTrackingSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Ingest thread loop: receive frames and run association until shutdown.
fn run_ingest(frame_receiver: Receiver<SensorFrameMsg>, shared: Arc<SharedState>) {
    info!("Hand ingest thread started");
    let mut frames = 0u64;

    loop {
        if shared.is_shutdown_requested() {
            break;
        }

        match frame_receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(msg) => {
                shared.apply_frame(&msg);
                frames += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Frame channel disconnected");
                break;
            }
        }
    }

    info!("Hand ingest thread exiting after {} frames", frames);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Roi;
    use crate::tracking::{LandmarkFrame, TrackState};
    use approx::assert_relative_eq;
    use std::time::Instant;

    const BODY: Vector3<f64> = Vector3::new(0.0, 0.0, 0.0);

    fn hand_at(palm: Vector3<f64>, wrist: Vector3<f64>, roi: Roi) -> LandmarkFrame {
        LandmarkFrame::new(palm, wrist, vec![], roi)
    }

    fn wait_for_frames(system: &HandTrackingSystem, n: u64) {
        let start = Instant::now();
        while system.shared_state().stats().frames_processed < n {
            assert!(start.elapsed() < Duration::from_secs(5), "ingest thread stalled");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_present_without_hands() {
        let mut system = HandTrackingSystem::new(HandTrackingConfig::default()).unwrap();
        let frame = system.present(&BODY);
        assert!(frame.tracks.is_empty());
        assert!(frame.ray.is_none());
        assert!(frame.cursor.is_none());
        assert!(frame.active_track().is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = HandTrackingConfig::default();
        config.tracking.liveness_max = 0;
        assert!(HandTrackingSystem::new(config).is_err());
    }

    #[test]
    fn test_synchronous_update_drives_pointing() {
        let mut system = HandTrackingSystem::new(HandTrackingConfig::default()).unwrap();
        // Camera-space z = -0.5 maps to world z = +0.5.
        let msg = SensorFrameMsg::new(
            1,
            vec![hand_at(
                Vector3::new(0.3, 0.0, -0.5),
                Vector3::new(0.3, 0.0, -0.3),
                Roi::new(0, 0, 10, 10),
            )],
        );
        system.on_hand_update(&msg);

        let frame = system.present(&BODY);
        assert_eq!(frame.tracks.len(), 1);
        let ray = frame.ray.unwrap();
        assert_eq!(frame.active, Some(ray.track_id));
        assert_relative_eq!(
            ray.direction.into_inner(),
            Vector3::new(0.0, 0.0, 1.0),
            epsilon = 1e-12
        );
        assert!(frame.cursor.is_some());
        assert_eq!(frame.active_track().unwrap().state(), TrackState::Detected);
    }

    #[test]
    fn test_ingest_thread_processes_submitted_frames() {
        let mut system = HandTrackingSystem::new(HandTrackingConfig::default()).unwrap();
        for i in 0..3 {
            let shift = i * 2;
            system
                .submit(SensorFrameMsg::new(
                    i as u64,
                    vec![hand_at(
                        Vector3::new(0.3, 0.0, -0.5),
                        Vector3::new(0.3, 0.0, -0.3),
                        Roi::new(shift, shift, 10 + shift, 10 + shift),
                    )],
                ))
                .unwrap();
        }
        wait_for_frames(&system, 3);

        let frame = system.present(&BODY);
        assert_eq!(frame.tracks.len(), 1);
        assert_eq!(frame.tracks[0].frames_matched(), 3);
        assert_eq!(frame.stats.tracks_created, 1);
    }

    #[test]
    fn test_external_sender_from_callback_thread() {
        let mut system = HandTrackingSystem::new(HandTrackingConfig::default()).unwrap();
        let sender = system.frame_sender().unwrap();
        let callback = thread::spawn(move || {
            for i in 0..10u64 {
                let hand = hand_at(
                    Vector3::new(0.3, 0.0, -0.5),
                    Vector3::new(0.3, 0.0, -0.3),
                    Roi::new(0, 0, 10, 10),
                );
                sender.send(SensorFrameMsg::new(i, vec![hand])).unwrap();
            }
        });

        // Presentation passes interleave with ingest and must always see a
        // whole track set: zero or one track, never a torn update.
        let start = Instant::now();
        while system.shared_state().stats().frames_processed < 10 {
            let frame = system.present(&BODY);
            assert!(frame.tracks.len() <= 1);
            assert!(start.elapsed() < Duration::from_secs(5), "ingest thread stalled");
        }
        callback.join().unwrap();
        assert_eq!(system.present(&BODY).tracks[0].frames_matched(), 10);
    }

    #[test]
    fn test_replay_sample_session() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_session.csv");
        let recording = crate::io::Recording::load(path).unwrap();
        let mut system = HandTrackingSystem::new(HandTrackingConfig::default()).unwrap();

        let empty_frames = recording.frames.iter().filter(|f| f.hands.is_empty()).count();
        assert_eq!(empty_frames, 2);

        let mut rays = 0;
        let mut stale_passes = 0;
        for msg in &recording.frames {
            system.on_hand_update(msg);
            let frame = system.present(&BODY);
            let ray = frame.ray.unwrap();
            rays += 1;
            assert_eq!(ray.track_id, TrackId::new(0));
            assert_relative_eq!(ray.direction.norm(), 1.0, epsilon = 1e-12);

            // Frames without hands leave the sweeping hand stale but still pointing.
            let state = frame.active_track().unwrap().state();
            if msg.hands.is_empty() {
                assert_eq!(state, TrackState::Stale);
                stale_passes += 1;
            } else {
                assert_eq!(state, TrackState::Detected);
            }
        }
        assert_eq!(stale_passes, 2);

        // The on-body detection gets its own track but never drives the ray.
        let frame = system.present(&BODY);
        assert_eq!(frame.stats.tracks_created, 2);
        assert_eq!(frame.stats.tracks_removed, 0);
        assert_eq!(frame.tracks.len(), 2);
        assert_eq!(frame.active, Some(TrackId::new(0)));
        assert_eq!(rays, recording.len());
        assert_eq!(recording.len(), 14);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut system = HandTrackingSystem::new(HandTrackingConfig::default()).unwrap();
        system.shutdown();
        assert!(system.submit(SensorFrameMsg::new(0, vec![])).is_err());
        assert!(system.frame_sender().is_none());
    }
}
