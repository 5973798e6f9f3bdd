//! Per-hand accumulated state.

use nalgebra::Vector3;

use crate::geometry::Roi;
use crate::tracking::landmarks::HandObservation;
use crate::tracking::state::TrackState;
use crate::tracking::types::TrackId;

/// Single-pole exponential smoothing: `(1 - alpha) * sample + alpha * history`.
pub fn exponential_smooth(
    sample: &Vector3<f64>,
    history: &Vector3<f64>,
    alpha: f64,
) -> Vector3<f64> {
    sample * (1.0 - alpha) + history * alpha
}

/// The fingertip currently anchoring the pointing ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFingertip {
    /// Index into the track's fingertip list for the latest matched frame.
    pub index: usize,
    /// Smoothed world position.
    pub position: Vector3<f64>,
}

/// One tracked hand.
///
/// Owned by the [`TrackRegistry`](crate::tracking::TrackRegistry); the
/// presentation layer only ever sees clones.
#[derive(Debug, Clone, PartialEq)]
pub struct HandTrack {
    id: TrackId,

    /// Smoothed palm position (world).
    position: Vector3<f64>,

    /// Smoothed wrist position (world).
    wrist_position: Vector3<f64>,

    /// Raw ROI of the latest matched detection.
    roi: Roi,

    /// Fingertips of the latest matched detection, unsmoothed.
    fingertips: Vec<Vector3<f64>>,

    reference_fingertip: Option<ReferenceFingertip>,

    /// Weight given to history; `None` takes samples as-is.
    smoothing_factor: Option<f64>,

    matched_this_frame: bool,

    /// Hysteresis counter; reset on match, decremented on miss.
    liveness: u32,

    state: TrackState,

    /// Number of frames this track has been matched, including creation.
    frames_matched: u64,
}

impl HandTrack {
    /// Seed a track from its first observation. No smoothing is applied.
    pub fn new(
        id: TrackId,
        observation: &HandObservation,
        smoothing_factor: Option<f64>,
        liveness_max: u32,
    ) -> Self {
        Self {
            id,
            position: observation.palm,
            wrist_position: observation.wrist,
            roi: observation.roi,
            fingertips: observation.fingertips.clone(),
            reference_fingertip: observation
                .reference_fingertip()
                .map(|(index, position)| ReferenceFingertip { index, position }),
            smoothing_factor,
            matched_this_frame: true,
            liveness: liveness_max,
            state: TrackState::Detected,
            frames_matched: 1,
        }
    }

    /// Clear the per-frame match flag.
    pub fn begin_frame(&mut self) {
        self.matched_this_frame = false;
    }

    /// Fold a matched observation into the track.
    pub fn update(&mut self, observation: &HandObservation, liveness_max: u32) {
        let alpha = self.smoothing_factor.unwrap_or(0.0);

        self.position = exponential_smooth(&observation.palm, &self.position, alpha);
        self.wrist_position = exponential_smooth(&observation.wrist, &self.wrist_position, alpha);

        self.fingertips.clear();
        self.fingertips.extend_from_slice(&observation.fingertips);

        self.reference_fingertip = observation.reference_fingertip().map(|(index, sample)| {
            let position = match self.reference_fingertip {
                Some(prev) => exponential_smooth(&sample, &prev.position, alpha),
                None => sample,
            };
            ReferenceFingertip { index, position }
        });

        self.roi = observation.roi;
        self.matched_this_frame = true;
        self.liveness = liveness_max;
        self.state = TrackState::Detected;
        self.frames_matched += 1;
    }

    /// Apply the "undetected" transition and return the new state.
    pub fn mark_missed(&mut self, decrement: u32) -> TrackState {
        self.liveness = self.liveness.saturating_sub(decrement);
        self.state = if self.liveness > 0 {
            TrackState::Stale
        } else {
            TrackState::Removed
        };
        self.state
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn wrist_position(&self) -> &Vector3<f64> {
        &self.wrist_position
    }

    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    pub fn fingertips(&self) -> &[Vector3<f64>] {
        &self.fingertips
    }

    pub fn reference_fingertip(&self) -> Option<&ReferenceFingertip> {
        self.reference_fingertip.as_ref()
    }

    pub fn smoothing_factor(&self) -> Option<f64> {
        self.smoothing_factor
    }

    pub fn matched_this_frame(&self) -> bool {
        self.matched_this_frame
    }

    pub fn liveness(&self) -> u32 {
        self.liveness
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn frames_matched(&self) -> u64 {
        self.frames_matched
    }

    /// Whether the presentation layer may use this track.
    pub fn is_valid(&self) -> bool {
        self.state.is_live() && self.liveness > 0
    }
}
