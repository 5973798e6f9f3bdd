//! Per-hand sensor records and their world-space form.
//!
//! A [`LandmarkFrame`] is what the sensor reports for one hand in one frame,
//! in camera space. A [`HandObservation`] is the same detection after it went
//! through the [`CoordinateTransformer`]; it is what the track registry
//! associates against.

use nalgebra::{Vector3, Vector4};

use crate::geometry::{CoordinateTransformer, Roi};

/// Raw per-hand detection in camera space.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    /// Homogeneous palm position.
    pub palm: Vector4<f64>,
    /// Homogeneous wrist position.
    pub wrist: Vector4<f64>,
    /// Homogeneous fingertip positions, in sensor order.
    pub fingertips: Vec<Vector4<f64>>,
    /// Bounding box of the hand in sensor pixels.
    pub roi: Roi,
}

impl LandmarkFrame {
    /// Build a frame from 3D camera-space points (`w = 1`).
    pub fn new(
        palm: Vector3<f64>,
        wrist: Vector3<f64>,
        fingertips: Vec<Vector3<f64>>,
        roi: Roi,
    ) -> Self {
        Self {
            palm: palm.push(1.0),
            wrist: wrist.push(1.0),
            fingertips: fingertips.into_iter().map(|f| f.push(1.0)).collect(),
            roi,
        }
    }

    /// Index of the topmost fingertip: the smallest camera-space `y / w`.
    ///
    /// Every candidate is compared on its own coordinate. Ties keep the
    /// earliest fingertip; candidates without a finite `y / w` are skipped.
    pub fn topmost_fingertip(&self) -> Option<usize> {
        self.fingertips
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.y / f.w))
            .filter(|(_, y)| y.is_finite())
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }

    /// Map this detection into world space.
    ///
    /// Returns `None` if any landmark is degenerate (zero or non-finite `w`,
    /// non-finite result); the whole hand is then treated as undetected for
    /// this frame.
    pub fn to_world(&self, transformer: &CoordinateTransformer) -> Option<HandObservation> {
        let palm = transformer.apply(&self.palm)?;
        let wrist = transformer.apply(&self.wrist)?;
        let fingertips = self
            .fingertips
            .iter()
            .map(|f| transformer.apply(f))
            .collect::<Option<Vec<_>>>()?;

        Some(HandObservation {
            palm,
            wrist,
            fingertips,
            reference_index: self.topmost_fingertip(),
            roi: self.roi,
        })
    }
}

/// One hand detection in world space, ready for association.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    pub palm: Vector3<f64>,
    pub wrist: Vector3<f64>,
    pub fingertips: Vec<Vector3<f64>>,
    /// Index into `fingertips` of the pointing reference, if any.
    pub reference_index: Option<usize>,
    pub roi: Roi,
}

impl HandObservation {
    /// Observation with no reference fingertip selected.
    pub fn new(
        palm: Vector3<f64>,
        wrist: Vector3<f64>,
        fingertips: Vec<Vector3<f64>>,
        roi: Roi,
    ) -> Self {
        Self {
            palm,
            wrist,
            fingertips,
            reference_index: None,
            roi,
        }
    }

    /// Select fingertip `index` as the pointing reference. Out-of-range
    /// indices clear the selection.
    pub fn with_reference_fingertip(mut self, index: usize) -> Self {
        self.reference_index = (index < self.fingertips.len()).then_some(index);
        self
    }

    /// World position of the reference fingertip.
    pub fn reference_fingertip(&self) -> Option<(usize, Vector3<f64>)> {
        self.reference_index
            .and_then(|i| self.fingertips.get(i).map(|p| (i, *p)))
    }
}
