use glam::{Vec2, Vec3};
use physview_common::{TextureImage, Vertex};

use crate::obj::{ImportedGroup, ImportedModel};

fn single_group(material: &str, vertices: Vec<Vertex>) -> ImportedModel {
    ImportedModel {
        groups: vec![ImportedGroup {
            material: material.to_string(),
            vertices,
            texture: None,
        }],
    }
}

/// Axis-aligned box centred on the origin, flattened to 36 vertices.
pub fn box_model(half_extents: Vec3) -> ImportedModel {
    let h = half_extents;
    // (normal, u axis, v axis) per face; corners are n ± u ± v.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    let mut vertices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let corner = |su: f32, sv: f32| {
            let p = (n + u * su + v * sv) * h;
            Vertex::new(p, n, Vec2::new((su + 1.0) * 0.5, (1.0 - sv) * 0.5))
        };
        let quad = [
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ];
        vertices.extend_from_slice(&[quad[0], quad[1], quad[2], quad[2], quad[3], quad[0]]);
    }
    single_group("box", vertices)
}

/// Flat square ground of `cells x cells` quads at y = 0, UVs tiling once per cell.
pub fn ground_grid(half_extent: f32, cells: u32) -> ImportedModel {
    let cells = cells.max(1);
    let step = 2.0 * half_extent / cells as f32;
    let mut vertices = Vec::with_capacity(cells as usize * cells as usize * 6);
    for iz in 0..cells {
        for ix in 0..cells {
            let x0 = -half_extent + ix as f32 * step;
            let z0 = -half_extent + iz as f32 * step;
            let corner = |dx: f32, dz: f32| {
                Vertex::new(
                    Vec3::new(x0 + dx * step, 0.0, z0 + dz * step),
                    Vec3::Y,
                    Vec2::new(dx, dz),
                )
            };
            // Counter-clockwise seen from above.
            let (a, b) = (corner(0.0, 0.0), corner(0.0, 1.0));
            let (c, d) = (corner(1.0, 1.0), corner(1.0, 0.0));
            vertices.extend_from_slice(&[a, b, c, c, d, a]);
        }
    }
    single_group("ground", vertices)
}

/// Two-colour checkerboard with `tiles x tiles` squares.
pub fn checker_texture(size: u32, tiles: u32, a: [u8; 4], b: [u8; 4]) -> TextureImage {
    let size = size.max(1);
    let tile = (size / tiles.max(1)).max(1);
    let mut rgba = Vec::with_capacity(size as usize * size as usize * 4);
    for y in 0..size {
        for x in 0..size {
            let color = if (x / tile + y / tile) % 2 == 0 { a } else { b };
            rgba.extend_from_slice(&color);
        }
    }
    TextureImage {
        width: size,
        height: size,
        rgba,
    }
}

/// `count` distinct checker textures for props.
pub fn prop_palette(count: usize) -> Vec<TextureImage> {
    const COLORS: [[u8; 4]; 6] = [
        [200, 60, 50, 255],
        [60, 160, 70, 255],
        [60, 90, 200, 255],
        [220, 190, 60, 255],
        [150, 70, 180, 255],
        [230, 130, 40, 255],
    ];
    (0..count)
        .map(|i| {
            let base = COLORS[i % COLORS.len()];
            let dark = [base[0] / 2, base[1] / 2, base[2] / 2, 255];
            let tiles = 2 + (i / COLORS.len()) as u32 * 2;
            checker_texture(64, tiles, base, dark)
        })
        .collect()
}
