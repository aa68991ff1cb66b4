//! Physics: the service boundary the viewer talks to, the registry that maps
//! scene objects onto bodies, and a small in-process reference service.
//!
//! # Invariants
//! - Every registration happens before `commit`; nothing is registered after.
//! - A tick runs `step -> readback -> writeback*`, never out of that order.
//! - Empty geometry never reaches the service.

pub mod avatar;
pub mod grid;
pub mod registry;
pub mod service;
pub mod sim;

pub use avatar::AvatarMotion;
pub use grid::{CellCoord, SpatialGrid};
pub use registry::{BodyRecord, BodyRole, Phase, PhysicsRegistry};
pub use service::{BodyDesc, BodyState, PhysicsError, PhysicsService};
pub use sim::{SimConfig, SimWorld};
