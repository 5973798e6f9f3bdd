//! Hand tracking: turns per-frame landmark detections into stable tracks.
//!
//! - Landmark records and their world-space form (`landmarks`)
//! - Per-hand smoothed state (`track`)
//! - Detected / Stale / Removed lifecycle (`state`)
//! - ROI association, creation and aging (`registry`)

pub mod landmarks;
pub mod registry;
pub mod state;
pub mod track;
pub mod types;

pub use landmarks::{HandObservation, LandmarkFrame};
pub use registry::{RegistryStats, TrackRegistry};
pub use state::TrackState;
pub use track::{HandTrack, ReferenceFingertip, exponential_smooth};
pub use types::TrackId;
