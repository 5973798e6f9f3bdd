//! Cursor placement along the pointing direction.
//!
//! The cursor is cast from an anchor below the body reference point (about
//! shoulder height when the reference is the head). Reaching further out
//! pushes the cursor further away, so small arm movements cover the room.

use nalgebra::{Unit, Vector3};

use crate::config::CursorConfig;

/// Ray anchor for a given body reference point.
pub fn cursor_anchor(body_reference: &Vector3<f64>, config: &CursorConfig) -> Vector3<f64> {
    body_reference + config.anchor_offset
}

/// World position of the cursor.
///
/// `anchor + direction * (gain * max(|anchor - hand|, min_reach) - offset)`
pub fn project_cursor(
    direction: &Unit<Vector3<f64>>,
    body_reference: &Vector3<f64>,
    hand_position: &Vector3<f64>,
    config: &CursorConfig,
) -> Vector3<f64> {
    let anchor = cursor_anchor(body_reference, config);
    let reach = (anchor - hand_position).norm().max(config.min_reach);
    anchor + direction.into_inner() * (config.gain * reach - config.offset)
}
