//! Core ID types for tracked hands.

/// Unique identifier for a hand track within a registry.
///
/// TrackIds are assigned sequentially when tracks are created and never
/// reused, so a presentation layer can tell a re-acquired hand from the
/// track it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl TrackId {
    /// Create a new TrackId with the given value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "H{}", self.0)
    }
}
