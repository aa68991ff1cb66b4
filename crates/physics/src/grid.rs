use std::collections::HashMap;

use glam::Vec3;

/// Integer cell coordinate. Column grids keep `y` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Uniform hash grid over item indices.
///
/// Cells keep items in insertion order, so queries visit items in a stable
/// order when the grid is filled in index order.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<u32>>,
}

impl SpatialGrid {
    /// Non-finite or sub-millimetre cell sizes are raised to a millimetre.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size >= 1e-3 {
            cell_size
        } else {
            1e-3
        };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Drop all placements but keep the allocations.
    pub fn clear(&mut self) {
        for items in self.cells.values_mut() {
            items.clear();
        }
    }

    pub fn cell_of(&self, pos: Vec3) -> CellCoord {
        CellCoord {
            x: (pos.x / self.cell_size).floor() as i32,
            y: (pos.y / self.cell_size).floor() as i32,
            z: (pos.z / self.cell_size).floor() as i32,
        }
    }

    /// The vertical column containing `pos`.
    pub fn column_of(&self, pos: Vec3) -> CellCoord {
        CellCoord {
            y: 0,
            ..self.cell_of(pos)
        }
    }

    pub fn insert(&mut self, id: u32, pos: Vec3) {
        let coord = self.cell_of(pos);
        self.cells.entry(coord).or_default().push(id);
    }

    /// Place `id` in every column its xz bounds overlap.
    pub fn insert_columns(&mut self, id: u32, min: Vec3, max: Vec3) {
        let lo = self.column_of(min);
        let hi = self.column_of(max);
        for x in lo.x..=hi.x {
            for z in lo.z..=hi.z {
                self.cells
                    .entry(CellCoord::new(x, 0, z))
                    .or_default()
                    .push(id);
            }
        }
    }

    pub fn items_in_cell(&self, coord: CellCoord) -> &[u32] {
        self.cells.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append every item in the 3x3x3 block around `center` to `out`.
    pub fn neighbors(&self, center: CellCoord, out: &mut Vec<u32>) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let coord = CellCoord::new(center.x + dx, center.y + dy, center.z + dz);
                    out.extend_from_slice(self.items_in_cell(coord));
                }
            }
        }
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.values().filter(|items| !items.is_empty()).count()
    }

    /// Total number of placements across all cells.
    pub fn total_placements(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}
