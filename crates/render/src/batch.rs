use std::ops::Range;

use glam::Vec3;
use physview_common::{ModelId, TextureId, Vertex};

/// Vertices that share one material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialGroup {
    pub vertices: Vec<Vertex>,
    /// `None` draws with the backend's plain white texture.
    pub texture: Option<TextureId>,
}

/// CPU-side model geometry, one group per material, ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub groups: Vec<MaterialGroup>,
}

/// The buffers a backend uploads for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLayout {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub batches: Vec<DrawBatch>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.vertices.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Every vertex position, in group order. Used as a collision point set.
    pub fn positions(&self) -> Vec<Vec3> {
        self.groups
            .iter()
            .flat_map(|g| g.vertices.iter().map(Vertex::position))
            .collect()
    }

    /// Concatenate all groups into one vertex buffer with a sequential index
    /// buffer and one batch per non-empty group.
    pub fn layout(&self) -> ModelLayout {
        let mut vertices = Vec::with_capacity(self.vertex_count());
        let mut batches = Vec::with_capacity(self.groups.len());
        for group in self.groups.iter().filter(|g| !g.vertices.is_empty()) {
            let start = vertices.len() as u32;
            vertices.extend_from_slice(&group.vertices);
            batches.push(DrawBatch {
                indices: start..vertices.len() as u32,
                texture: group.texture,
            });
        }
        let indices = (0..vertices.len() as u32).collect();
        ModelLayout {
            vertices,
            indices,
            batches,
        }
    }
}

/// A range of a model's index buffer drawn with one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawBatch {
    pub indices: Range<u32>,
    pub texture: Option<TextureId>,
}

impl DrawBatch {
    pub fn index_count(&self) -> u32 {
        self.indices.end - self.indices.start
    }
}

/// A GPU-resident model: its handle plus the batches inside it.
///
/// Built once at upload and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticModel {
    id: ModelId,
    batches: Vec<DrawBatch>,
    vertex_count: u32,
}

impl StaticModel {
    pub fn new(id: ModelId, layout: &ModelLayout) -> Self {
        Self {
            id,
            batches: layout.batches.clone(),
            vertex_count: layout.vertices.len() as u32,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn tri(offset: f32) -> Vec<Vertex> {
        [Vec3::ZERO, Vec3::X, Vec3::Z]
            .into_iter()
            .map(|p| Vertex::new(p + Vec3::splat(offset), Vec3::Y, Vec2::ZERO))
            .collect()
    }

    #[test]
    fn layout_groups_into_contiguous_batches() {
        let mesh = MeshData {
            groups: vec![
                MaterialGroup {
                    vertices: tri(0.0),
                    texture: Some(TextureId(1)),
                },
                MaterialGroup {
                    vertices: Vec::new(),
                    texture: Some(TextureId(9)),
                },
                MaterialGroup {
                    vertices: [tri(1.0), tri(2.0)].concat(),
                    texture: None,
                },
            ],
        };
        let layout = mesh.layout();
        assert_eq!(layout.vertices.len(), 9);
        assert_eq!(layout.indices, (0..9).collect::<Vec<_>>());
        assert_eq!(layout.batches.len(), 2);
        assert_eq!(layout.batches[0].indices, 0..3);
        assert_eq!(layout.batches[1].indices, 3..9);
        assert_eq!(layout.batches[1].index_count(), 6);
        assert_eq!(layout.batches[1].texture, None);

        let model = StaticModel::new(ModelId(4), &layout);
        assert_eq!(model.id(), ModelId(4));
        assert_eq!(model.vertex_count(), 9);
        assert_eq!(model.batches().len(), 2);
    }

    #[test]
    fn positions_follow_group_order() {
        let mesh = MeshData {
            groups: vec![
                MaterialGroup {
                    vertices: tri(0.0),
                    texture: None,
                },
                MaterialGroup {
                    vertices: tri(5.0),
                    texture: None,
                },
            ],
        };
        let pts = mesh.positions();
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[3], Vec3::splat(5.0));
        assert!(!mesh.is_empty());
        assert!(MeshData::default().is_empty());
    }
}
