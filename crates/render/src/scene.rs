use glam::Mat4;
use physview_common::{BodyHandle, PoseSource};

use crate::backend::RenderError;
use crate::batch::StaticModel;
use crate::instances::InstanceSet;

/// A static model placed once in the world.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub model: StaticModel,
    pub world: Mat4,
}

/// Everything the passes draw: fixed geometry plus body-driven instances.
#[derive(Debug, Clone, Default)]
pub struct RenderScene {
    pub statics: Vec<SceneObject>,
    pub instances: Vec<InstanceSet>,
}

impl RenderScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(&mut self, model: StaticModel, world: Mat4) {
        self.statics.push(SceneObject { model, world });
    }

    pub fn add_instances(&mut self, set: InstanceSet) {
        self.instances.push(set);
    }

    pub fn instance_count(&self) -> usize {
        self.instances.iter().map(InstanceSet::len).sum()
    }

    pub fn batch_count(&self) -> usize {
        self.statics.iter().map(|o| o.model.batches().len()).sum()
    }
}

/// World matrix for a body from the latest pose snapshot.
pub(crate) fn body_world<P>(poses: &P, handle: BodyHandle) -> Result<Mat4, RenderError>
where
    P: PoseSource + ?Sized,
{
    poses
        .pose(handle)
        .map(|t| t.to_matrix())
        .ok_or(RenderError::MissingPose(handle))
}
