use glam::{Mat4, Vec3};
use physview_common::Viewport;
use serde::{Deserialize, Serialize};

/// Fixed directional light with an orthographic shadow frustum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRig {
    pub position: Vec3,
    pub target: Vec3,
    /// Half width and height of the orthographic frustum.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    /// Edge of the square shadow target in texels.
    pub shadow_resolution: u32,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            position: Vec3::new(32.6785, 85.7038, -39.8369),
            target: Vec3::ZERO,
            half_extent: 30.0,
            near: 1.0,
            far: 200.0,
            shadow_resolution: 2048,
        }
    }
}

impl LightRig {
    /// Unit vector the light travels along.
    pub fn direction(&self) -> Vec3 {
        let dir = (self.target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO { Vec3::NEG_Y } else { dir }
    }

    pub fn view(&self) -> Mat4 {
        // World-up is degenerate for a light straight above the target.
        let up = if self.direction().cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection(&self) -> Mat4 {
        let h = self.half_extent;
        Mat4::orthographic_rh(-h, h, -h, h, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::square(self.shadow_resolution)
    }
}
