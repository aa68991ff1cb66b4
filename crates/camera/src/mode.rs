use physview_common::BodyHandle;

/// How the camera position is driven each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    /// WASD translates the camera directly.
    #[default]
    FreeFly,
    /// The camera sits on top of an avatar body; WASD steers the body.
    AvatarFollow(BodyHandle),
}

impl CameraMode {
    pub fn avatar(&self) -> Option<BodyHandle> {
        match self {
            CameraMode::FreeFly => None,
            CameraMode::AvatarFollow(handle) => Some(*handle),
        }
    }

    pub fn is_free_fly(&self) -> bool {
        matches!(self, CameraMode::FreeFly)
    }
}
