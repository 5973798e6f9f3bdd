//! Smoothed pointing direction from the active hand track.
//!
//! The ray starts at the reference fingertip and points away from the palm.
//! Without a fingertip it starts at the palm and points away from the wrist.
//! Directions are exponentially smoothed frame to frame; the very first
//! direction after a reset has no history and is taken as-is.

use nalgebra::{Unit, Vector3};
use tracing::debug;

use crate::config::PointingConfig;
use crate::tracking::{HandTrack, TrackId, exponential_smooth};

use super::ray::PointingRay;

/// Vectors shorter than this have no usable direction.
const MIN_DIRECTION_NORM: f64 = 1e-9;

/// Horizontal (x/z plane) distance between a hand and the body reference.
pub fn horizontal_distance(position: &Vector3<f64>, body_reference: &Vector3<f64>) -> f64 {
    let d = position - body_reference;
    d.x.hypot(d.z)
}

/// First valid track far enough from the body to be a pointing hand.
pub fn select_active_track<'a>(
    tracks: &'a [HandTrack],
    body_reference: &Vector3<f64>,
    min_distance: f64,
) -> Option<&'a HandTrack> {
    tracks
        .iter()
        .find(|t| t.is_valid() && horizontal_distance(t.position(), body_reference) > min_distance)
}

/// Frame-to-frame pointing direction smoother.
pub struct PointingEstimator {
    config: PointingConfig,

    /// Last emitted direction; `None` until the first estimate after a reset.
    prev_direction: Option<Unit<Vector3<f64>>>,

    /// Track the last ray came from.
    active: Option<TrackId>,
}

impl PointingEstimator {
    pub fn new(config: PointingConfig) -> Self {
        Self {
            config,
            prev_direction: None,
            active: None,
        }
    }

    /// Pick the active hand among `tracks` and estimate its ray.
    ///
    /// Resets the smoothing history when no track qualifies.
    pub fn update(
        &mut self,
        tracks: &[HandTrack],
        body_reference: &Vector3<f64>,
    ) -> Option<PointingRay> {
        match select_active_track(tracks, body_reference, self.config.on_body_min_distance) {
            Some(track) => self.estimate(track, body_reference),
            None => {
                self.reset();
                None
            }
        }
    }

    /// Estimate the ray for `track`.
    ///
    /// Returns `None` (and resets) if the track is invalid or within the
    /// on-body distance of `body_reference`.
    pub fn estimate(
        &mut self,
        track: &HandTrack,
        body_reference: &Vector3<f64>,
    ) -> Option<PointingRay> {
        if !track.is_valid()
            || horizontal_distance(track.position(), body_reference)
                <= self.config.on_body_min_distance
        {
            self.reset();
            return None;
        }

        if self.active != Some(track.id()) {
            debug!("Pointing hand is now track {}", track.id());
            self.active = Some(track.id());
        }

        let (origin, raw) = match track.reference_fingertip() {
            Some(tip) => (
                tip.position,
                Unit::try_new(tip.position - track.position(), MIN_DIRECTION_NORM),
            ),
            None => (
                *track.position(),
                Unit::try_new(track.position() - track.wrist_position(), MIN_DIRECTION_NORM),
            ),
        };

        let alpha = track
            .smoothing_factor()
            .unwrap_or(self.config.fallback_smoothing_factor);

        let direction = match (raw, self.prev_direction) {
            (Some(raw), None) => raw,
            (Some(raw), Some(prev)) => {
                let blended = exponential_smooth(&raw.into_inner(), &prev.into_inner(), alpha);
                // Opposite directions can cancel out; fall back to the sample.
                Unit::try_new(blended, MIN_DIRECTION_NORM).unwrap_or(raw)
            }
            (None, Some(prev)) => prev,
            (None, None) => {
                debug!("Track {} has no usable pointing direction yet", track.id());
                return None;
            }
        };
        self.prev_direction = Some(direction);

        Some(PointingRay {
            track_id: track.id(),
            origin,
            direction,
        })
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        if self.active.take().is_some() {
            debug!("Pointing hand lost");
        }
        self.prev_direction = None;
    }

    pub fn previous_direction(&self) -> Option<&Unit<Vector3<f64>>> {
        self.prev_direction.as_ref()
    }

    pub fn active_track(&self) -> Option<TrackId> {
        self.active
    }

    pub fn config(&self) -> &PointingConfig {
        &self.config
    }
}
