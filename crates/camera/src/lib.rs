//! Camera controller for the viewer.
//!
//! Holds the eye position and look direction, turns pointer deltas into
//! yaw/pitch, and moves along the look frame.
//!
//! # Invariants
//! - `forward` is unit length after every mutation.
//! - `up` is world-up and never changes.
//! - A single pointer sample can rotate at most `max_pointer_step` units per axis.

mod camera;
mod mode;

pub use camera::{Camera, CameraParams, clamp_pointer_step};
pub use mode::CameraMode;
