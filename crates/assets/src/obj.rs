use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4, Vec2, Vec3};
use physview_common::Vertex;

use crate::AssetError;

/// Triangles sharing one material, flattened to three vertices each.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportedGroup {
    pub material: String,
    pub vertices: Vec<Vertex>,
    /// Diffuse texture resolved against the model's directory.
    pub texture: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportedModel {
    pub groups: Vec<ImportedGroup>,
}

impl ImportedModel {
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    /// All positions in group order; the point set for collision shapes.
    pub fn positions(&self) -> Vec<Vec3> {
        self.groups
            .iter()
            .flat_map(|g| g.vertices.iter().map(Vertex::position))
            .collect()
    }

    /// Sequential triangle indices over [`positions`](Self::positions).
    pub fn sequential_indices(&self) -> Vec<u32> {
        (0..self.vertex_count() as u32).collect()
    }

    /// Axis-aligned bounds, or `None` for an empty model.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.groups.iter().flat_map(|g| g.vertices.iter());
        let first = points.next()?.position();
        Some(points.fold((first, first), |(lo, hi), v| {
            (lo.min(v.position()), hi.max(v.position()))
        }))
    }
}

/// Load an OBJ file, bake `transform` into positions and normals, and group
/// the triangles by material.
///
/// Missing or broken MTL files are logged and the model loads untextured.
pub fn import_obj(path: &Path, transform: Mat4) -> Result<ImportedModel, AssetError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| AssetError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), %err, "material library not loaded");
        Vec::new()
    });
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();

    let mut grouped: BTreeMap<Option<usize>, Vec<Vertex>> = BTreeMap::new();
    for model in &models {
        let mesh = &model.mesh;
        let out = grouped.entry(mesh.material_id).or_default();
        for &index in &mesh.indices {
            let i = index as usize;
            let position = Vec3::new(
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            );
            let normal = Vec3::new(
                mesh.normals.get(i * 3).copied().unwrap_or(0.0),
                mesh.normals.get(i * 3 + 1).copied().unwrap_or(1.0),
                mesh.normals.get(i * 3 + 2).copied().unwrap_or(0.0),
            );
            let uv = Vec2::new(
                mesh.texcoords.get(i * 2).copied().unwrap_or(0.0),
                1.0 - mesh.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0),
            );
            out.push(Vertex::new(
                transform.transform_point3(position),
                (normal_matrix * normal).normalize_or_zero(),
                uv,
            ));
        }
    }

    let groups: Vec<ImportedGroup> = grouped
        .into_iter()
        .filter(|(_, vertices)| !vertices.is_empty())
        .map(|(material_id, vertices)| {
            let material = material_id.and_then(|id| materials.get(id));
            ImportedGroup {
                material: material.map(|m| m.name.clone()).unwrap_or_default(),
                texture: material
                    .and_then(|m| m.diffuse_texture.as_ref())
                    .map(|tex| base.join(tex)),
                vertices,
            }
        })
        .collect();

    let imported = ImportedModel { groups };
    if imported.vertex_count() == 0 {
        return Err(AssetError::EmptyModel(path.to_path_buf()));
    }
    tracing::debug!(
        path = %path.display(),
        groups = imported.groups.len(),
        triangles = imported.triangle_count(),
        "imported model"
    );
    Ok(imported)
}
