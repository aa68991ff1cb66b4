//! Frame orchestration for the physview viewer.
//!
//! One [`Orchestrator::tick`] per timer callback runs, in order: clamp the
//! frame time, step and read back physics, apply pointer look, move the
//! camera or write the avatar's velocity back, record and execute the shadow
//! pass, record and execute the main pass, present.
//!
//! # Invariants
//! - A tick with no elapsed time does nothing; a long stall steps at most `max_dt`.
//! - Physics is read back before anything reads a pose, and written back
//!   before the next step.
//! - The shadow pass is executed before the main pass that samples it.
//! - Teardown releases the scene, then physics, then the renderer.

pub mod clock;
pub mod config;
pub mod context;
pub mod orchestrator;
pub mod scene;

pub use clock::{FpsCounter, FrameClock, clamp_dt};
pub use config::{
    AssetsConfig, AvatarConfig, CameraConfig, ConfigError, PhysicsConfig, PropsConfig,
    RenderConfig, TimingConfig, ViewerConfig,
};
pub use context::FrameContext;
pub use orchestrator::{FrameError, Orchestrator, TickReport};
pub use scene::{LoadedScene, SplitMix64, populate};
