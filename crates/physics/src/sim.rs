use glam::{Quat, Vec3};
use physview_common::{BodyHandle, Transform};
use serde::{Deserialize, Serialize};

use crate::grid::SpatialGrid;
use crate::service::{BodyDesc, BodyState, PhysicsError, PhysicsService};

/// Tunables for the reference simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Edge of a broadphase cell, roughly the diameter of a typical body.
    pub cell_size: f32,
    /// Fraction of normal speed kept after a contact.
    pub restitution: f32,
    /// Fraction of tangential speed removed per ground contact.
    pub contact_friction: f32,
    /// Smallest proxy radius for tiny hulls.
    pub min_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.5,
            restitution: 0.2,
            contact_friction: 0.05,
            min_radius: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
struct SimBody {
    transform: Transform,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    inv_mass: f32,
    radius: f32,
}

impl SimBody {
    fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }

    fn state(&self) -> BodyState {
        BodyState {
            transform: self.transform,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
        }
    }
}

/// World-space triangle soup queried as a height field.
#[derive(Debug, Clone)]
struct Terrain {
    triangles: Vec<[Vec3; 3]>,
    columns: SpatialGrid,
}

impl Terrain {
    fn new(cell_size: f32) -> Self {
        Self {
            triangles: Vec::new(),
            columns: SpatialGrid::new(cell_size),
        }
    }

    fn add(&mut self, tri: [Vec3; 3]) {
        let id = self.triangles.len() as u32;
        let min = tri[0].min(tri[1]).min(tri[2]);
        let max = tri[0].max(tri[1]).max(tri[2]);
        self.columns.insert_columns(id, min, max);
        self.triangles.push(tri);
    }

    /// Highest surface under `pos` that is no higher than `ceiling`.
    fn height_below(&self, pos: Vec3, ceiling: f32) -> Option<f32> {
        let column = self.columns.column_of(pos);
        self.columns
            .items_in_cell(column)
            .iter()
            .filter_map(|&id| height_on_triangle(&self.triangles[id as usize], pos.x, pos.z))
            .filter(|&h| h <= ceiling)
            .reduce(f32::max)
    }
}

/// Height of the triangle's plane at (x, z), if the point lies inside it in xz.
fn height_on_triangle(tri: &[Vec3; 3], x: f32, z: f32) -> Option<f32> {
    let [a, b, c] = *tri;
    let det = (b.z - c.z) * (a.x - c.x) + (c.x - b.x) * (a.z - c.z);
    if det.abs() <= f32::EPSILON {
        return None;
    }
    let l1 = ((b.z - c.z) * (x - c.x) + (c.x - b.x) * (z - c.z)) / det;
    let l2 = ((c.z - a.z) * (x - c.x) + (a.x - c.x) * (z - c.z)) / det;
    let l3 = 1.0 - l1 - l2;
    const EDGE: f32 = -1e-4;
    if l1 < EDGE || l2 < EDGE || l3 < EDGE {
        return None;
    }
    Some(l1 * a.y + l2 * b.y + l3 * c.y)
}

/// Small deterministic rigid-body world used where no GPU engine is available.
///
/// Bodies are sphere proxies sized from their hull. Dynamic bodies integrate
/// with semi-implicit Euler, push apart through a hash-grid broadphase and
/// rest on registered triangle meshes treated as height fields. Bodies are
/// always processed in handle order.
pub struct SimWorld {
    config: SimConfig,
    gravity: Vec3,
    bodies: Vec<SimBody>,
    terrain: Terrain,
    broadphase: SpatialGrid,
    committed: bool,
    neighbors: Vec<u32>,
}

impl SimWorld {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            gravity: Vec3::ZERO,
            bodies: Vec::new(),
            terrain: Terrain::new(config.cell_size),
            broadphase: SpatialGrid::new(config.cell_size),
            committed: false,
            neighbors: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn terrain_triangles(&self) -> usize {
        self.terrain.triangles.len()
    }

    fn push_body(&mut self, desc: BodyDesc, radius: f32) -> Result<BodyHandle, PhysicsError> {
        if self.committed {
            return Err(PhysicsError::RegistrationClosed);
        }
        let handle = BodyHandle(self.bodies.len() as u32);
        let inv_mass = if desc.is_static() { 0.0 } else { 1.0 / desc.mass };
        self.bodies.push(SimBody {
            transform: desc.transform(),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inv_mass,
            radius: radius.max(self.config.min_radius),
        });
        Ok(handle)
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.iter_mut().filter(|b| b.is_dynamic()) {
            body.linear_velocity += gravity * dt;
            body.transform.position += body.linear_velocity * dt;
            let spin = body.angular_velocity * dt;
            if spin.length_squared() > 0.0 {
                body.transform.rotation =
                    (Quat::from_scaled_axis(spin) * body.transform.rotation).normalize();
            }
        }
    }

    fn resolve_contacts(&mut self) {
        self.broadphase.clear();
        for (i, body) in self.bodies.iter().enumerate() {
            self.broadphase.insert(i as u32, body.transform.position);
        }

        let restitution = self.config.restitution;
        let mut neighbors = std::mem::take(&mut self.neighbors);
        for i in 0..self.bodies.len() {
            if !self.bodies[i].is_dynamic() {
                continue;
            }
            neighbors.clear();
            let cell = self.broadphase.cell_of(self.bodies[i].transform.position);
            self.broadphase.neighbors(cell, &mut neighbors);
            for &j in &neighbors {
                let j = j as usize;
                // Dynamic pairs once, static partners always.
                if j == i || (j < i && self.bodies[j].is_dynamic()) {
                    continue;
                }
                self.resolve_pair(i, j, restitution);
            }
        }
        self.neighbors = neighbors;
    }

    fn resolve_pair(&mut self, i: usize, j: usize, restitution: f32) {
        let (a, b) = (&self.bodies[i], &self.bodies[j]);
        let delta = b.transform.position - a.transform.position;
        let reach = a.radius + b.radius;
        let dist_sq = delta.length_squared();
        if dist_sq >= reach * reach {
            return;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist > 1e-6 { delta / dist } else { Vec3::Y };
        let (wa, wb) = (a.inv_mass, b.inv_mass);
        let total = wa + wb;
        if total <= 0.0 {
            return;
        }
        let depth = reach - dist;
        let rel = (b.linear_velocity - a.linear_velocity).dot(normal);

        let a = &mut self.bodies[i];
        a.transform.position -= normal * depth * (wa / total);
        if rel < 0.0 {
            a.linear_velocity += normal * ((1.0 + restitution) * rel * wa / total);
        }
        let b = &mut self.bodies[j];
        b.transform.position += normal * depth * (wb / total);
        if rel < 0.0 {
            b.linear_velocity -= normal * ((1.0 + restitution) * rel * wb / total);
        }
    }

    fn resolve_terrain(&mut self) {
        let restitution = self.config.restitution;
        let keep = (1.0 - self.config.contact_friction).clamp(0.0, 1.0);
        for body in self.bodies.iter_mut().filter(|b| b.is_dynamic()) {
            let pos = body.transform.position;
            let Some(ground) = self.terrain.height_below(pos, pos.y + body.radius) else {
                continue;
            };
            if pos.y - body.radius >= ground {
                continue;
            }
            body.transform.position.y = ground + body.radius;
            if body.linear_velocity.y < 0.0 {
                body.linear_velocity.y = -body.linear_velocity.y * restitution;
            }
            body.linear_velocity.x *= keep;
            body.linear_velocity.z *= keep;
            // Roll without slipping.
            let flat = Vec3::new(body.linear_velocity.x, 0.0, body.linear_velocity.z);
            body.angular_velocity = Vec3::Y.cross(flat) / body.radius;
        }
    }
}

/// Distance from the local origin to the farthest hull point.
fn bounding_radius(points: &[Vec3]) -> f32 {
    points.iter().map(|p| p.length()).fold(0.0, f32::max)
}

impl PhysicsService for SimWorld {
    fn name(&self) -> &str {
        "physview reference simulation (cpu)"
    }

    fn register_convex(
        &mut self,
        body: BodyDesc,
        points: &[Vec3],
    ) -> Result<BodyHandle, PhysicsError> {
        if points.is_empty() {
            return Err(PhysicsError::EmptyGeometry);
        }
        self.push_body(body, bounding_radius(points))
    }

    fn register_concave(
        &mut self,
        body: BodyDesc,
        points: &[Vec3],
        indices: &[u32],
    ) -> Result<BodyHandle, PhysicsError> {
        if points.is_empty() {
            return Err(PhysicsError::EmptyGeometry);
        }
        let to_world = body.transform().to_matrix();
        for tri in indices.chunks_exact(3) {
            let corner = |k: usize| {
                points
                    .get(tri[k] as usize)
                    .map(|p| to_world.transform_point3(*p))
                    .ok_or_else(|| PhysicsError::InvalidIndices(format!("index {}", tri[k])))
            };
            self.terrain.add([corner(0)?, corner(1)?, corner(2)?]);
        }
        self.push_body(BodyDesc { mass: 0.0, ..body }, 0.0)
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn commit(&mut self) -> Result<(), PhysicsError> {
        if self.committed {
            return Err(PhysicsError::AlreadyCommitted);
        }
        self.committed = true;
        tracing::debug!(
            bodies = self.bodies.len(),
            triangles = self.terrain.triangles.len(),
            "reference simulation committed"
        );
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        if !self.committed {
            return Err(PhysicsError::NotCommitted);
        }
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::NonFiniteStep(dt));
        }
        self.integrate(dt);
        self.resolve_contacts();
        self.resolve_terrain();
        Ok(())
    }

    fn readback(&mut self, out: &mut Vec<BodyState>) -> Result<(), PhysicsError> {
        if !self.committed {
            return Err(PhysicsError::NotCommitted);
        }
        out.clear();
        out.extend(self.bodies.iter().map(SimBody::state));
        Ok(())
    }

    fn writeback(
        &mut self,
        handle: BodyHandle,
        linear_velocity: Vec3,
    ) -> Result<(), PhysicsError> {
        let body = self
            .bodies
            .get_mut(handle.index())
            .ok_or(PhysicsError::UnknownBody(handle))?;
        if body.is_dynamic() {
            body.linear_velocity = linear_velocity;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.bodies.clear();
        self.terrain.triangles.clear();
        self.committed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball() -> Vec<Vec3> {
        vec![
            Vec3::X * 0.5,
            -Vec3::X * 0.5,
            Vec3::Y * 0.5,
            -Vec3::Y * 0.5,
            Vec3::Z * 0.5,
            -Vec3::Z * 0.5,
        ]
    }

    fn floor(sim: &mut SimWorld, y: f32) {
        let pts = [
            Vec3::new(-50.0, y, -50.0),
            Vec3::new(50.0, y, -50.0),
            Vec3::new(50.0, y, 50.0),
            Vec3::new(-50.0, y, 50.0),
        ];
        sim.register_concave(
            BodyDesc::new(Vec3::ZERO, Quat::IDENTITY, 0.0),
            &pts,
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap();
    }

    fn states(sim: &mut SimWorld) -> Vec<BodyState> {
        let mut out = Vec::new();
        sim.readback(&mut out).unwrap();
        out
    }

    #[test]
    fn triangle_height_interpolates() {
        let tri = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ];
        let h = height_on_triangle(&tri, 1.0, 0.5).unwrap();
        assert!((h - 1.0).abs() < 1e-5);
        assert!(height_on_triangle(&tri, 3.0, 3.0).is_none());
    }

    #[test]
    fn handles_are_dense_and_ordered() {
        let mut sim = SimWorld::new(SimConfig::default());
        let a = sim
            .register_convex(BodyDesc::new(Vec3::ZERO, Quat::IDENTITY, 1.0), &ball())
            .unwrap();
        let b = sim
            .register_convex(BodyDesc::new(Vec3::X, Quat::IDENTITY, 1.0), &ball())
            .unwrap();
        assert_eq!((a, b), (BodyHandle(0), BodyHandle(1)));
    }

    #[test]
    fn bodies_come_to_rest_on_terrain() {
        let mut sim = SimWorld::new(SimConfig::default());
        sim.set_gravity(Vec3::new(0.0, -9.81, 0.0));
        floor(&mut sim, 0.0);
        let h = sim
            .register_convex(BodyDesc::new(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY, 10.0), &ball())
            .unwrap();
        sim.commit().unwrap();
        for _ in 0..600 {
            sim.step(1.0 / 60.0).unwrap();
        }
        let s = states(&mut sim)[h.index()];
        assert!((s.transform.position.y - 0.5).abs() < 0.05, "{s:?}");
        assert!(s.linear_velocity.y.abs() < 0.5);
    }

    #[test]
    fn static_bodies_never_move() {
        let mut sim = SimWorld::new(SimConfig::default());
        sim.set_gravity(Vec3::new(0.0, -9.81, 0.0));
        let h = sim
            .register_convex(BodyDesc::new(Vec3::Y, Quat::IDENTITY, 0.0), &ball())
            .unwrap();
        sim.commit().unwrap();
        sim.step(0.1).unwrap();
        sim.writeback(h, Vec3::X).unwrap();
        sim.step(0.1).unwrap();
        let s = states(&mut sim)[h.index()];
        assert_eq!(s.transform.position, Vec3::Y);
        assert_eq!(s.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn overlapping_bodies_separate() {
        let mut sim = SimWorld::new(SimConfig::default());
        let a = sim
            .register_convex(BodyDesc::new(Vec3::ZERO, Quat::IDENTITY, 1.0), &ball())
            .unwrap();
        let b = sim
            .register_convex(BodyDesc::new(Vec3::X * 0.6, Quat::IDENTITY, 1.0), &ball())
            .unwrap();
        sim.commit().unwrap();
        sim.step(0.0).unwrap();
        let s = states(&mut sim);
        let gap = (s[b.index()].transform.position - s[a.index()].transform.position).length();
        assert!((gap - 1.0).abs() < 1e-4);
    }

    #[test]
    fn simulation_is_deterministic() {
        let run = || {
            let mut sim = SimWorld::new(SimConfig::default());
            sim.set_gravity(Vec3::new(0.0, -9.81, 0.0));
            floor(&mut sim, 0.0);
            for i in 0..40 {
                let p = Vec3::new((i % 4) as f32 * 0.7, 2.0 + (i / 4) as f32 * 0.8, 0.3);
                sim.register_convex(BodyDesc::new(p, Quat::IDENTITY, 10.0), &ball())
                    .unwrap();
            }
            sim.commit().unwrap();
            for _ in 0..120 {
                sim.step(1.0 / 60.0).unwrap();
            }
            states(&mut sim)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn lifecycle_errors() {
        let mut sim = SimWorld::new(SimConfig::default());
        assert!(matches!(sim.step(0.1), Err(PhysicsError::NotCommitted)));
        sim.commit().unwrap();
        assert!(matches!(sim.commit(), Err(PhysicsError::AlreadyCommitted)));
        assert!(matches!(
            sim.register_convex(BodyDesc::new(Vec3::ZERO, Quat::IDENTITY, 1.0), &ball()),
            Err(PhysicsError::RegistrationClosed)
        ));
        assert!(matches!(
            sim.writeback(BodyHandle(0), Vec3::X),
            Err(PhysicsError::UnknownBody(_))
        ));
    }
}
