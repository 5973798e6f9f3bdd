//! Geometry utilities: camera-to-world landmark transforms, ROI boxes.

pub mod frames;
pub mod roi;

pub use frames::{CoordinateTransformer, perspective_divide, transform};
pub use roi::Roi;
