//! Input/output: recorded sensor sessions.

pub mod recording;

pub use recording::Recording;
