//! System orchestration and thread management.
//!
//! This module contains the top-level `HandTrackingSystem` that spawns the
//! sensor ingest thread and runs presentation passes, along with the shared
//! state and the sensor message type.

mod hand_system;
pub mod messages;
pub mod shared_state;

pub use hand_system::{HandTrackingSystem, PresentationFrame};
pub use messages::SensorFrameMsg;
pub use shared_state::SharedState;
