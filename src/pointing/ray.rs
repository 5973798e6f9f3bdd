//! Pointing ray handed to the presentation layer.

use nalgebra::{Unit, Vector3};

use crate::tracking::TrackId;

/// World-space pointing ray derived from the active hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointingRay {
    /// Track that produced this ray.
    pub track_id: TrackId,
    pub origin: Vector3<f64>,
    pub direction: Unit<Vector3<f64>>,
}
