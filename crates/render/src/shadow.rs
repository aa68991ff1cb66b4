use physview_common::PoseSource;

use crate::backend::RenderError;
use crate::light::LightRig;
use crate::pass::{DrawCommand, FrameUniforms, PassRecording, PassTarget};
use crate::scene::{RenderScene, body_world};

/// Records the light's view of every opaque batch and instance.
///
/// No textures are bound: the target only receives depth and light-space
/// distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowPass {
    pub clear: [f32; 4],
}

impl Default for ShadowPass {
    fn default() -> Self {
        Self {
            clear: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl ShadowPass {
    pub fn new(clear: [f32; 4]) -> Self {
        Self { clear }
    }

    pub fn record<P>(
        &self,
        light: &LightRig,
        scene: &RenderScene,
        poses: &P,
    ) -> Result<PassRecording, RenderError>
    where
        P: PoseSource + ?Sized,
    {
        let light_vp = light.view_projection();
        let mut commands = Vec::with_capacity(scene.batch_count() + scene.instance_count());

        for object in &scene.statics {
            for batch in 0..object.model.batches().len() {
                commands.push(DrawCommand::DrawBatch {
                    model: object.model.id(),
                    batch,
                    world: object.world,
                });
            }
        }
        for set in &scene.instances {
            for inst in set.instances() {
                commands.push(DrawCommand::DrawInstance {
                    model: set.model(),
                    handle: inst.handle,
                    world: body_world(poses, inst.handle)?,
                });
            }
        }

        Ok(PassRecording {
            target: PassTarget::Shadow,
            clear: self.clear,
            viewport: light.viewport(),
            uniforms: FrameUniforms::new(light_vp, light_vp, light.position, light.direction()),
            commands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{DrawBatch, ModelLayout, StaticModel};
    use crate::instances::InstanceSet;
    use glam::{Mat4, Vec3};
    use physview_common::{BodyHandle, ModelId, TextureId, Transform};
    use std::collections::HashMap;

    struct Poses(HashMap<BodyHandle, Transform>);

    impl PoseSource for Poses {
        fn pose(&self, handle: BodyHandle) -> Option<Transform> {
            self.0.get(&handle).copied()
        }
    }

    fn two_batch_model(id: u32) -> StaticModel {
        let layout = ModelLayout {
            vertices: Vec::new(),
            indices: Vec::new(),
            batches: vec![
                DrawBatch {
                    indices: 0..3,
                    texture: Some(TextureId(0)),
                },
                DrawBatch {
                    indices: 3..6,
                    texture: None,
                },
            ],
        };
        StaticModel::new(ModelId(id), &layout)
    }

    #[test]
    fn draws_everything_from_light_without_binds() {
        let mut scene = RenderScene::new();
        scene.add_static(two_batch_model(0), Mat4::IDENTITY);
        let mut set = InstanceSet::new(ModelId(1));
        set.push(BodyHandle(0), TextureId(2));
        set.push(BodyHandle(1), TextureId(3));
        scene.add_instances(set);

        let poses = Poses(HashMap::from([
            (BodyHandle(0), Transform::from_position(Vec3::X)),
            (BodyHandle(1), Transform::from_position(Vec3::Y)),
        ]));
        let light = LightRig::default();
        let pass = ShadowPass::default().record(&light, &scene, &poses).unwrap();

        assert_eq!(pass.target, PassTarget::Shadow);
        assert_eq!(pass.clear, [1.0; 4]);
        assert_eq!(pass.viewport, light.viewport());
        assert_eq!(pass.texture_binds(), 0);
        assert_eq!(pass.draw_calls(), 4);
        assert_eq!(
            pass.uniforms.view_proj,
            light.view_projection().to_cols_array_2d()
        );
    }

    #[test]
    fn missing_pose_is_an_error() {
        let mut scene = RenderScene::new();
        let mut set = InstanceSet::new(ModelId(1));
        set.push(BodyHandle(5), TextureId(0));
        scene.add_instances(set);

        let err = ShadowPass::default()
            .record(&LightRig::default(), &scene, &Poses(HashMap::new()))
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingPose(BodyHandle(5))));
    }
}
