//! Pointing: ray estimation from the active hand and cursor placement.

pub mod cursor;
pub mod estimator;
pub mod ray;

pub use cursor::{cursor_anchor, project_cursor};
pub use estimator::{PointingEstimator, horizontal_distance, select_active_track};
pub use ray::PointingRay;
