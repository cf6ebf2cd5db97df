//! # Hand Robot Library
//!
//! Shared types and utilities for the hand-tracked robotic arm controller.
//! Landmark frames go in, bounded actuator commands come out, and the
//! transport module delivers them to a board or relay.

pub mod transport;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use transport::*;
pub use types::*;
pub use utils::*;
