use glam::{Quat, Vec3};
use physview_common::{BodyHandle, Transform};

use crate::registry::Phase;

/// Errors raised by the registry or a physics service.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("collision shape has no vertices")]
    EmptyGeometry,
    #[error("triangle indices are invalid: {0}")]
    InvalidIndices(String),
    #[error("cannot register bodies after commit")]
    RegistrationClosed,
    #[error("simulation has not been committed")]
    NotCommitted,
    #[error("simulation was already committed")]
    AlreadyCommitted,
    #[error("`{op}` is not allowed in phase {phase:?}")]
    OutOfOrder { op: &'static str, phase: Phase },
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),
    #[error("step size must be finite and non-negative, got {0}")]
    NonFiniteStep(f32),
}

/// Initial pose and mass of a body. A mass of zero registers a static body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
}

impl BodyDesc {
    pub fn new(position: Vec3, rotation: Quat, mass: f32) -> Self {
        Self {
            position,
            rotation,
            mass,
        }
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }
}

/// One body's state as seen on the CPU after a readback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyState {
    pub transform: Transform,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl BodyState {
    pub fn at_rest(transform: Transform) -> Self {
        Self {
            transform,
            ..Self::default()
        }
    }
}

/// The capability the viewer needs from a rigid-body engine.
///
/// Implementations hand out handles densely from zero in registration order,
/// and `readback` fills `out` so that `out[handle.index()]` is that body.
/// Collision detection and solving are entirely up to the implementation.
pub trait PhysicsService {
    /// Human-readable device or engine name, for logs.
    fn name(&self) -> &str;

    /// Register a movable or static body with a convex hull built from `points`.
    fn register_convex(
        &mut self,
        body: BodyDesc,
        points: &[Vec3],
    ) -> Result<BodyHandle, PhysicsError>;

    /// Register a static triangle mesh.
    fn register_concave(
        &mut self,
        body: BodyDesc,
        points: &[Vec3],
        indices: &[u32],
    ) -> Result<BodyHandle, PhysicsError>;

    fn set_gravity(&mut self, gravity: Vec3);

    /// Flush pending registrations into the working set.
    fn commit(&mut self) -> Result<(), PhysicsError>;

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError>;

    fn readback(&mut self, out: &mut Vec<BodyState>) -> Result<(), PhysicsError>;

    /// Override a body's linear velocity before the next step.
    fn writeback(&mut self, handle: BodyHandle, linear_velocity: Vec3)
    -> Result<(), PhysicsError>;

    /// Release engine resources. The service is not used afterwards.
    fn shutdown(&mut self) {}
}
