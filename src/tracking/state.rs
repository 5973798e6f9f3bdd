//! Hand track lifecycle states.

/// Lifecycle state of a hand track.
///
/// ```text
///            match                 miss, liveness > 0
///   ┌──────────────────┐        ┌──────────────────┐
///   ▼                  │        ▼                  │
/// Detected ──miss──► Stale ─────┘
///   ▲                  │
///   └──────match───────┘
///                      │ miss, liveness == 0
///                      ▼
///                   Removed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Matched to a detection in the most recent sensor frame.
    Detected,
    /// Missed one or more recent frames but still within its liveness budget.
    /// Keeps its last smoothed position and may still drive pointing.
    Stale,
    /// Liveness exhausted. Terminal; the registry drops the track.
    Removed,
}

impl TrackState {
    /// Whether a track in this state may be consumed by the presentation layer.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Detected | Self::Stale)
    }
}

impl Default for TrackState {
    fn default() -> Self {
        Self::Detected
    }
}
