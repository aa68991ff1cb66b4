use physview_common::PoseSource;

use crate::backend::RenderError;
use crate::light::LightRig;
use crate::pass::{CameraView, DrawCommand, FrameUniforms, PassRecording, PassTarget};
use crate::scene::{RenderScene, body_world};

/// Records the camera's view: static batches, texture-grouped instances,
/// then the sky.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MainPass {
    pub clear: [f32; 4],
    pub sky_size: f32,
}

impl Default for MainPass {
    fn default() -> Self {
        Self {
            clear: [0.5, 0.5, 1.0, 1.0],
            sky_size: 300.0,
        }
    }
}

impl MainPass {
    pub fn new(clear: [f32; 4], sky_size: f32) -> Self {
        Self { clear, sky_size }
    }

    pub fn record<P>(
        &self,
        camera: &CameraView,
        light: &LightRig,
        scene: &RenderScene,
        poses: &P,
    ) -> Result<PassRecording, RenderError>
    where
        P: PoseSource + ?Sized,
    {
        let mut commands = vec![DrawCommand::BindShadowMap];

        for object in &scene.statics {
            for (batch, draw) in object.model.batches().iter().enumerate() {
                commands.push(DrawCommand::BindTexture(draw.texture));
                commands.push(DrawCommand::DrawBatch {
                    model: object.model.id(),
                    batch,
                    world: object.world,
                });
            }
        }

        for set in &scene.instances {
            for (texture, group) in set.groups() {
                commands.push(DrawCommand::BindTexture(Some(texture)));
                for inst in group {
                    commands.push(DrawCommand::DrawInstance {
                        model: set.model(),
                        handle: inst.handle,
                        world: body_world(poses, inst.handle)?,
                    });
                }
            }
        }

        commands.push(DrawCommand::DrawSky {
            center: camera.eye,
            size: self.sky_size,
        });

        Ok(PassRecording {
            target: PassTarget::Screen,
            clear: self.clear,
            viewport: camera.viewport,
            uniforms: FrameUniforms::new(
                camera.view_projection(),
                light.view_projection(),
                camera.eye,
                light.direction(),
            ),
            commands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::InstanceSet;
    use glam::{Mat4, Vec3};
    use physview_common::{BodyHandle, ModelId, TextureId, Transform, Viewport};

    struct Origin;

    impl PoseSource for Origin {
        fn pose(&self, _handle: BodyHandle) -> Option<Transform> {
            Some(Transform::default())
        }
    }

    fn camera() -> CameraView {
        CameraView {
            view: Mat4::look_at_rh(Vec3::new(0.0, 8.0, 20.0), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh(45f32.to_radians(), 1.5, 0.1, 1000.0),
            eye: Vec3::new(0.0, 8.0, 20.0),
            viewport: Viewport::new(1200, 800),
        }
    }

    #[test]
    fn instances_bind_each_texture_once() {
        let (a, b) = (TextureId(10), TextureId(20));
        let mut set = InstanceSet::new(ModelId(0));
        set.push(BodyHandle(0), a);
        set.push(BodyHandle(1), b);
        set.push(BodyHandle(2), a);
        let mut scene = RenderScene::new();
        scene.add_instances(set);

        let pass = MainPass::default()
            .record(&camera(), &LightRig::default(), &scene, &Origin)
            .unwrap();
        assert_eq!(pass.texture_binds(), 2);

        let mut bound = None;
        let mut drawn = Vec::new();
        for cmd in &pass.commands {
            match cmd {
                DrawCommand::BindTexture(t) => bound = *t,
                DrawCommand::DrawInstance { handle, .. } => drawn.push((*handle, bound)),
                _ => {}
            }
        }
        assert_eq!(
            drawn,
            vec![
                (BodyHandle(0), Some(a)),
                (BodyHandle(2), Some(a)),
                (BodyHandle(1), Some(b)),
            ]
        );
    }

    #[test]
    fn shadow_map_first_sky_last() {
        let pass = MainPass::default()
            .record(&camera(), &LightRig::default(), &RenderScene::new(), &Origin)
            .unwrap();
        assert_eq!(pass.commands.first(), Some(&DrawCommand::BindShadowMap));
        assert_eq!(
            pass.commands.last(),
            Some(&DrawCommand::DrawSky {
                center: Vec3::new(0.0, 8.0, 20.0),
                size: 300.0
            })
        );
        assert_eq!(pass.target, PassTarget::Screen);
        assert_eq!(pass.clear, [0.5, 0.5, 1.0, 1.0]);
        assert_eq!(pass.viewport, Viewport::new(1200, 800));
    }
}
