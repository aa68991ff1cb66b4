use physview_common::{BodyHandle, ModelId, TextureId};

/// One dynamic object: a body drawn with a fixed texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub handle: BodyHandle,
    pub texture: TextureId,
}

/// Dynamic instances of one model, grouped by texture at draw time.
///
/// Textures are assigned on `push` and never change afterwards.
#[derive(Debug, Clone)]
pub struct InstanceSet {
    model: ModelId,
    instances: Vec<Instance>,
    /// Distinct textures in first-use order.
    textures: Vec<TextureId>,
}

impl InstanceSet {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            instances: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn push(&mut self, handle: BodyHandle, texture: TextureId) {
        if !self.textures.contains(&texture) {
            self.textures.push(texture);
        }
        self.instances.push(Instance { handle, texture });
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances assigned `texture`, by linear scan over the whole set.
    pub fn with_texture(&self, texture: TextureId) -> impl Iterator<Item = &Instance> {
        self.instances
            .iter()
            .filter(move |inst| inst.texture == texture)
    }

    /// One entry per distinct texture with the instances that use it.
    pub fn groups(&self) -> impl Iterator<Item = (TextureId, impl Iterator<Item = &Instance>)> {
        self.textures.iter().map(|&tex| (tex, self.with_texture(tex)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_textures_in_first_use_order() {
        let mut set = InstanceSet::new(ModelId(0));
        set.push(BodyHandle(0), TextureId(7));
        set.push(BodyHandle(1), TextureId(3));
        set.push(BodyHandle(2), TextureId(7));
        assert_eq!(set.textures(), &[TextureId(7), TextureId(3)]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn groups_cover_each_instance_once() {
        let mut set = InstanceSet::new(ModelId(0));
        for i in 0..30u32 {
            set.push(BodyHandle(i), TextureId(i % 4));
        }
        let mut seen = Vec::new();
        for (tex, group) in set.groups() {
            for inst in group {
                assert_eq!(inst.texture, tex);
                seen.push(inst.handle);
            }
        }
        seen.sort();
        assert_eq!(seen, (0..30).map(BodyHandle).collect::<Vec<_>>());
    }

    #[test]
    fn empty_set_has_no_groups() {
        let set = InstanceSet::new(ModelId(1));
        assert!(set.is_empty());
        assert_eq!(set.groups().count(), 0);
    }
}
