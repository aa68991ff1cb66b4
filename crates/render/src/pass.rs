use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use physview_common::{BodyHandle, ModelId, TextureId, Viewport};

/// Which surface a pass draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    /// The square offscreen colour+depth target seen from the light.
    Shadow,
    /// The visible framebuffer.
    Screen,
}

/// Per-pass uniform block, laid out for a std140 uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz = eye position.
    pub eye: [f32; 4],
    /// xyz = direction the light travels.
    pub light_dir: [f32; 4],
}

impl FrameUniforms {
    pub fn new(view_proj: Mat4, light_view_proj: Mat4, eye: Vec3, light_dir: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            light_dir: light_dir.extend(0.0).to_array(),
        }
    }
}

/// One recorded draw-state change or draw.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Make the shadow target's colour texture available for sampling.
    BindShadowMap,
    /// Bind a material texture. `None` is the plain white texture.
    BindTexture(Option<TextureId>),
    /// Draw one batch of a static model.
    DrawBatch {
        model: ModelId,
        batch: usize,
        world: Mat4,
    },
    /// Draw every batch of `model` for one body, using the bound texture.
    DrawInstance {
        model: ModelId,
        handle: BodyHandle,
        world: Mat4,
    },
    /// Gradient sky box centred on `center`.
    DrawSky { center: Vec3, size: f32 },
}

/// A fully recorded pass, ready for a backend to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecording {
    pub target: PassTarget,
    pub clear: [f32; 4],
    pub viewport: Viewport,
    pub uniforms: FrameUniforms,
    pub commands: Vec<DrawCommand>,
}

impl PassRecording {
    pub fn texture_binds(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::BindTexture(_)))
            .count()
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    DrawCommand::DrawBatch { .. }
                        | DrawCommand::DrawInstance { .. }
                        | DrawCommand::DrawSky { .. }
                )
            })
            .count()
    }
}

/// Camera matrices for the main pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub viewport: Viewport,
}

impl CameraView {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_std140_sized() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        let u = FrameUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ONE, Vec3::NEG_Y);
        assert_eq!(u.eye, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(u.light_dir[3], 0.0);
    }

    #[test]
    fn counters_classify_commands() {
        let pass = PassRecording {
            target: PassTarget::Screen,
            clear: [0.0; 4],
            viewport: Viewport::new(4, 4),
            uniforms: FrameUniforms::zeroed(),
            commands: vec![
                DrawCommand::BindShadowMap,
                DrawCommand::BindTexture(None),
                DrawCommand::DrawBatch {
                    model: ModelId(0),
                    batch: 0,
                    world: Mat4::IDENTITY,
                },
                DrawCommand::DrawSky {
                    center: Vec3::ZERO,
                    size: 300.0,
                },
            ],
        };
        assert_eq!(pass.texture_binds(), 1);
        assert_eq!(pass.draw_calls(), 2);
    }
}
