//! Track registry: per-frame association, creation and aging of hand tracks.
//!
//! # Association policy
//!
//! Each incoming observation has its ROI grown by `margin_pixels` and is
//! matched to the **first** unmatched track (in registry order) whose stored
//! ROI intersects it. There is no best-fit search and no reassignment within
//! a frame: with at most a couple of hands in view, first-fit is stable and
//! costs `O(tracks * observations)`.
//!
//! Unmatched observations start new tracks at the end of the registry.
//! Unmatched tracks lose liveness and are dropped once it reaches zero.

use tracing::debug;

use crate::config::TrackingConfig;
use crate::geometry::CoordinateTransformer;
use crate::tracking::landmarks::{HandObservation, LandmarkFrame};
use crate::tracking::state::TrackState;
use crate::tracking::track::HandTrack;
use crate::tracking::types::TrackId;

/// Counters accumulated over the registry's lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of `update` calls.
    pub frames_processed: u64,

    /// Number of observations associated or used to create tracks.
    pub observations_processed: u64,

    /// Number of tracks created.
    pub tracks_created: u64,

    /// Number of tracks removed, by exhausted liveness or `clear`.
    pub tracks_removed: u64,

    /// Number of hand detections dropped for degenerate geometry.
    pub rejected_samples: u64,
}

/// Owner of all live hand tracks.
pub struct TrackRegistry {
    config: TrackingConfig,

    /// Live tracks in creation order. Order decides first-fit association.
    tracks: Vec<HandTrack>,

    next_id: u64,

    stats: RegistryStats,
}

impl TrackRegistry {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 0,
            stats: RegistryStats::default(),
        }
    }

    /// Transform raw camera-space detections and run one association step.
    ///
    /// Detections with degenerate geometry are counted and otherwise treated
    /// as if the hand had not been seen this frame.
    pub fn ingest(&mut self, frames: &[LandmarkFrame], transformer: &CoordinateTransformer) {
        let mut observations = Vec::with_capacity(frames.len());
        for frame in frames {
            match frame.to_world(transformer) {
                Some(obs) => observations.push(obs),
                None => {
                    self.stats.rejected_samples += 1;
                    debug!("Rejected degenerate hand detection at ROI {}", frame.roi);
                }
            }
        }
        self.update(&observations);
    }

    /// Run one association step with world-space observations.
    pub fn update(&mut self, hands: &[HandObservation]) {
        self.stats.frames_processed += 1;

        for track in &mut self.tracks {
            track.begin_frame();
        }

        let margin = self.config.margin_pixels;
        let liveness_max = self.config.liveness_max;

        for obs in hands {
            self.stats.observations_processed += 1;
            let search_roi = obs.roi.expanded(margin);

            let matched = self
                .tracks
                .iter_mut()
                .find(|t| !t.matched_this_frame() && t.roi().intersects(&search_roi));

            match matched {
                Some(track) => track.update(obs, liveness_max),
                None => {
                    let id = TrackId::new(self.next_id);
                    self.next_id += 1;
                    self.stats.tracks_created += 1;
                    debug!("New hand track {} at ROI {}", id, obs.roi);
                    self.tracks.push(HandTrack::new(
                        id,
                        obs,
                        self.config.default_smoothing_factor,
                        liveness_max,
                    ));
                }
            }
        }

        let decrement = self.config.liveness_decrement;
        let mut removed = 0;
        self.tracks.retain_mut(|track| {
            if track.matched_this_frame() {
                return true;
            }
            if track.mark_missed(decrement) == TrackState::Removed {
                debug!("Hand track {} removed after missed frames", track.id());
                removed += 1;
                false
            } else {
                true
            }
        });
        self.stats.tracks_removed += removed;
    }

    /// Count detections dropped before they reached the registry.
    pub fn record_rejected(&mut self, count: u64) {
        self.stats.rejected_samples += count;
    }

    /// All live tracks in registry order.
    pub fn tracks(&self) -> &[HandTrack] {
        &self.tracks
    }

    /// Tracks the presentation layer may consume.
    pub fn valid_tracks(&self) -> impl Iterator<Item = &HandTrack> {
        self.tracks.iter().filter(|t| t.is_valid())
    }

    pub fn get(&self, id: TrackId) -> Option<&HandTrack> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drop every track. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.stats.tracks_removed += self.tracks.len() as u64;
        self.tracks.clear();
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}
