use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque rigid body identifier handed out by the physics service on registration.
///
/// Valid for the lifetime of the simulation and the only key used to read or
/// write a body's pose and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a texture resident in a render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u32);

/// Handle to a static model (vertex buffer plus per-material index buffers) in a render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

/// Spatial pose shared by the camera and physics bodies.
///
/// The rotation is renormalized whenever the transform is turned into a matrix,
/// so accumulated drift never reaches the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: normalize_rotation(rotation),
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Unit-length copy of the orientation.
    pub fn orientation(&self) -> Quat {
        normalize_rotation(self.rotation)
    }

    /// World matrix: translate then rotate.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position)
    }
}

fn normalize_rotation(q: Quat) -> Quat {
    let len_sq = q.length_squared();
    if len_sq <= f32::EPSILON || !len_sq.is_finite() {
        Quat::IDENTITY
    } else {
        q.normalize()
    }
}

/// Vertex layout produced by model import and consumed by the GPU batches.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            tex_coord: tex_coord.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Decoded RGBA8 image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// A single-colour texture.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgba.len() == self.width as usize * self.height as usize * 4
    }
}

/// Framebuffer dimensions, clamped to at least 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Pixel centre, used to recenter the pointer after each look sample.
    pub fn center(&self) -> Vec2 {
        Vec2::new((self.width / 2) as f32, (self.height / 2) as f32)
    }
}

/// Anything that can answer "where is this body right now".
///
/// Implemented by the physics registry's CPU snapshot and read by the render
/// passes when building per-instance world matrices.
pub trait PoseSource {
    fn pose(&self, handle: BodyHandle) -> Option<Transform>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn transform_normalizes_rotation() {
        let t = Transform::new(Vec3::ONE, Quat::from_xyzw(0.0, 2.0, 0.0, 2.0));
        assert!((t.rotation.length() - 1.0).abs() < 1e-6);

        let raw = Transform {
            position: Vec3::ZERO,
            rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 3.0),
        };
        assert!((raw.orientation().length() - 1.0).abs() < 1e-6);
        assert_eq!(raw.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn degenerate_rotation_falls_back_to_identity() {
        let t = Transform::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn matrix_translates_then_rotates() {
        let t = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let p = t.to_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn viewport_clamps_to_one() {
        let v = Viewport::new(0, 0);
        assert_eq!(v.width(), 1);
        assert_eq!(v.height(), 1);
        assert_eq!(v.aspect(), 1.0);

        let v = Viewport::new(1280, 0);
        assert_eq!(v.height(), 1);
        assert_eq!(v.center(), Vec2::new(640.0, 0.0));
    }

    #[test]
    fn solid_texture_has_expected_size() {
        let img = TextureImage::solid(2, 3, [1, 2, 3, 4]);
        assert!(img.is_valid());
        assert_eq!(img.rgba.len(), 24);
        assert_eq!(&img.rgba[4..8], &[1, 2, 3, 4]);
    }
}
