//! Input boundary: discrete key events keyed by a small ordinal, raw pointer
//! samples, and the movement intent derived from them.
//!
//! # Invariants
//! - Nothing in this crate talks back to the windowing layer.
//! - Key ordinals outside the table are ignored, never panicked on.

pub mod intent;
pub mod keys;
pub mod state;

pub use intent::{KeyBindings, MoveIntent};
pub use keys::{Key, KeyTable};
pub use state::InputState;
