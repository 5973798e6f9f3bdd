//! Messages delivered by the sensor callback.

use nalgebra::Matrix4;

use crate::tracking::LandmarkFrame;

/// Everything the sensor reports for one frame.
#[derive(Debug, Clone)]
pub struct SensorFrameMsg {
    /// Sensor timestamp in nanoseconds.
    pub timestamp_ns: u64,

    /// Camera view transform in effect for this frame (column-vector
    /// convention). Inverted before use.
    pub camera_view: Matrix4<f64>,

    /// One record per detected hand, in sensor order.
    pub hands: Vec<LandmarkFrame>,
}

impl SensorFrameMsg {
    /// Frame with an identity camera view.
    pub fn new(timestamp_ns: u64, hands: Vec<LandmarkFrame>) -> Self {
        Self {
            timestamp_ns,
            camera_view: Matrix4::identity(),
            hands,
        }
    }
}
