use glam::{Quat, Vec3};
use physview_common::{BodyHandle, PoseSource, Transform};

use crate::service::{BodyDesc, BodyState, PhysicsError, PhysicsService};

/// Where the registry is within its lifecycle and the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting registrations.
    Building,
    /// Committed; the snapshot holds the registered poses.
    Committed,
    /// Stepped since the last readback; the snapshot is stale.
    Stepped,
    /// Snapshot is current; writebacks are accepted.
    Synced,
}

/// What a body stands for in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRole {
    Ground,
    Prop,
    Avatar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyRecord {
    pub handle: BodyHandle,
    pub role: BodyRole,
    pub mass: f32,
}

/// Maps scene objects onto bodies and enforces the per-tick ordering.
///
/// Owns the physics service and a CPU snapshot of every body, indexed by
/// handle. The snapshot is what the renderer and game logic read.
pub struct PhysicsRegistry<S: PhysicsService> {
    service: S,
    phase: Phase,
    records: Vec<BodyRecord>,
    snapshot: Vec<BodyState>,
    ground: Option<BodyHandle>,
    avatar: Option<BodyHandle>,
    steps: u64,
}

impl<S: PhysicsService> PhysicsRegistry<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            phase: Phase::Building,
            records: Vec::new(),
            snapshot: Vec::new(),
            ground: None,
            avatar: None,
            steps: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.service.set_gravity(gravity);
    }

    /// Register a body with a convex hull built from `points`.
    pub fn register_convex(
        &mut self,
        role: BodyRole,
        position: Vec3,
        rotation: Quat,
        mass: f32,
        points: &[Vec3],
    ) -> Result<BodyHandle, PhysicsError> {
        self.ensure_building()?;
        if points.is_empty() {
            return Err(PhysicsError::EmptyGeometry);
        }
        let desc = BodyDesc::new(position, rotation, mass.max(0.0));
        let handle = self.service.register_convex(desc, points)?;
        self.record(handle, role, desc);
        Ok(handle)
    }

    /// Register static triangle-mesh terrain. A positive mass is ignored.
    pub fn register_concave(
        &mut self,
        position: Vec3,
        rotation: Quat,
        mass: f32,
        points: &[Vec3],
        indices: &[u32],
    ) -> Result<BodyHandle, PhysicsError> {
        self.ensure_building()?;
        if points.is_empty() || indices.is_empty() {
            return Err(PhysicsError::EmptyGeometry);
        }
        validate_indices(indices, points.len())?;
        if mass > 0.0 {
            tracing::warn!(mass, "concave bodies are static; ignoring mass");
        }
        let desc = BodyDesc::new(position, rotation, 0.0);
        let handle = self.service.register_concave(desc, points, indices)?;
        self.record(handle, BodyRole::Ground, desc);
        Ok(handle)
    }

    fn ensure_building(&self) -> Result<(), PhysicsError> {
        match self.phase {
            Phase::Building => Ok(()),
            _ => Err(PhysicsError::RegistrationClosed),
        }
    }

    fn record(&mut self, handle: BodyHandle, role: BodyRole, desc: BodyDesc) {
        match role {
            BodyRole::Ground if self.ground.is_none() => self.ground = Some(handle),
            BodyRole::Avatar => self.avatar = Some(handle),
            _ => {}
        }
        self.records.push(BodyRecord {
            handle,
            role,
            mass: desc.mass,
        });
        let slot = handle.index();
        if self.snapshot.len() <= slot {
            self.snapshot.resize(slot + 1, BodyState::default());
        }
        self.snapshot[slot] = BodyState::at_rest(desc.transform());
    }

    /// Flush every registration to the service. Called once, before the first step.
    pub fn commit(&mut self) -> Result<(), PhysicsError> {
        if self.phase != Phase::Building {
            return Err(PhysicsError::AlreadyCommitted);
        }
        self.service.commit()?;
        self.phase = Phase::Committed;
        tracing::info!(
            bodies = self.records.len(),
            service = self.service.name(),
            "physics committed"
        );
        Ok(())
    }

    /// Advance the simulation. Must be followed by `readback` before the next step.
    pub fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        match self.phase {
            Phase::Building => return Err(PhysicsError::NotCommitted),
            Phase::Stepped => {
                return Err(PhysicsError::OutOfOrder {
                    op: "step",
                    phase: self.phase,
                });
            }
            Phase::Committed | Phase::Synced => {}
        }
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::NonFiniteStep(dt));
        }
        self.service.step(dt)?;
        self.steps += 1;
        self.phase = Phase::Stepped;
        Ok(())
    }

    /// Pull the current state of every body into the CPU snapshot.
    ///
    /// Before the first step this yields the committed poses.
    pub fn readback(&mut self) -> Result<&[BodyState], PhysicsError> {
        if self.phase == Phase::Building {
            return Err(PhysicsError::NotCommitted);
        }
        self.snapshot.clear();
        self.service.readback(&mut self.snapshot)?;
        self.phase = Phase::Synced;
        Ok(&self.snapshot)
    }

    /// Override a body's linear velocity for the next step.
    pub fn writeback(
        &mut self,
        handle: BodyHandle,
        linear_velocity: Vec3,
    ) -> Result<(), PhysicsError> {
        if self.phase != Phase::Synced {
            return Err(PhysicsError::OutOfOrder {
                op: "writeback",
                phase: self.phase,
            });
        }
        let state = self
            .snapshot
            .get_mut(handle.index())
            .ok_or(PhysicsError::UnknownBody(handle))?;
        self.service.writeback(handle, linear_velocity)?;
        state.linear_velocity = linear_velocity;
        Ok(())
    }

    /// Snapshot of one body as of the last readback (or registration).
    pub fn body(&self, handle: BodyHandle) -> Option<&BodyState> {
        self.snapshot.get(handle.index())
    }

    pub fn snapshot(&self) -> &[BodyState] {
        &self.snapshot
    }

    pub fn records(&self) -> &[BodyRecord] {
        &self.records
    }

    pub fn props(&self) -> impl Iterator<Item = &BodyRecord> {
        self.records.iter().filter(|r| r.role == BodyRole::Prop)
    }

    pub fn ground(&self) -> Option<BodyHandle> {
        self.ground
    }

    pub fn avatar(&self) -> Option<BodyHandle> {
        self.avatar
    }

    pub fn body_count(&self) -> usize {
        self.records.len()
    }

    /// Number of successful steps since commit.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn shutdown(&mut self) {
        tracing::info!(service = self.service.name(), "physics shutting down");
        self.service.shutdown();
    }
}

impl<S: PhysicsService> PoseSource for PhysicsRegistry<S> {
    fn pose(&self, handle: BodyHandle) -> Option<Transform> {
        self.body(handle).map(|state| state.transform)
    }
}

fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<(), PhysicsError> {
    if indices.len() % 3 != 0 {
        return Err(PhysicsError::InvalidIndices(format!(
            "{} indices is not a whole number of triangles",
            indices.len()
        )));
    }
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(PhysicsError::InvalidIndices(format!(
            "index {bad} out of range for {vertex_count} vertices"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimConfig, SimWorld};

    fn cube_points() -> Vec<Vec3> {
        let mut pts = Vec::new();
        for x in [-0.5, 0.5] {
            for y in [-0.5, 0.5] {
                for z in [-0.5, 0.5] {
                    pts.push(Vec3::new(x, y, z));
                }
            }
        }
        pts
    }

    fn registry() -> PhysicsRegistry<SimWorld> {
        PhysicsRegistry::new(SimWorld::new(SimConfig::default()))
    }

    fn committed_with_prop(height: f32) -> (PhysicsRegistry<SimWorld>, BodyHandle) {
        let mut reg = registry();
        reg.set_gravity(Vec3::new(0.0, -9.81, 0.0));
        let h = reg
            .register_convex(
                BodyRole::Prop,
                Vec3::new(0.0, height, 0.0),
                Quat::IDENTITY,
                10.0,
                &cube_points(),
            )
            .unwrap();
        reg.commit().unwrap();
        (reg, h)
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let mut reg = registry();
        let err = reg
            .register_convex(BodyRole::Prop, Vec3::ZERO, Quat::IDENTITY, 1.0, &[])
            .unwrap_err();
        assert!(matches!(err, PhysicsError::EmptyGeometry));
        assert_eq!(reg.body_count(), 0);

        let err = reg
            .register_concave(Vec3::ZERO, Quat::IDENTITY, 0.0, &[], &[])
            .unwrap_err();
        assert!(matches!(err, PhysicsError::EmptyGeometry));
    }

    #[test]
    fn bad_triangle_indices_are_rejected() {
        let mut reg = registry();
        let pts = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let err = reg
            .register_concave(Vec3::ZERO, Quat::IDENTITY, 0.0, &pts, &[0, 1])
            .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidIndices(_)));
        let err = reg
            .register_concave(Vec3::ZERO, Quat::IDENTITY, 0.0, &pts, &[0, 1, 3])
            .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidIndices(_)));
    }

    #[test]
    fn concave_is_forced_static() {
        let mut reg = registry();
        let pts = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let h = reg
            .register_concave(Vec3::ZERO, Quat::IDENTITY, 5.0, &pts, &[0, 1, 2])
            .unwrap();
        assert_eq!(reg.ground(), Some(h));
        assert_eq!(reg.records()[0].mass, 0.0);
        assert_eq!(reg.records()[0].role, BodyRole::Ground);
    }

    #[test]
    fn registration_closes_on_commit() {
        let (mut reg, _) = committed_with_prop(5.0);
        let err = reg
            .register_convex(BodyRole::Prop, Vec3::ZERO, Quat::IDENTITY, 1.0, &cube_points())
            .unwrap_err();
        assert!(matches!(err, PhysicsError::RegistrationClosed));
        assert!(matches!(reg.commit(), Err(PhysicsError::AlreadyCommitted)));
    }

    #[test]
    fn step_requires_commit() {
        let mut reg = registry();
        assert!(matches!(reg.step(0.01), Err(PhysicsError::NotCommitted)));
        assert!(matches!(reg.readback(), Err(PhysicsError::NotCommitted)));
    }

    #[test]
    fn readback_before_step_returns_committed_pose() {
        let (mut reg, h) = committed_with_prop(5.0);
        let snapshot = reg.readback().unwrap();
        assert_eq!(snapshot[h.index()].transform.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(snapshot[h.index()].linear_velocity, Vec3::ZERO);
        assert_eq!(reg.phase(), Phase::Synced);
    }

    #[test]
    fn readback_after_step_reflects_exactly_dt() {
        let (mut reg, h) = committed_with_prop(50.0);
        let dt = 0.02;
        reg.step(dt).unwrap();
        let state = reg.readback().unwrap()[h.index()];
        // Semi-implicit Euler from rest: v = g*dt, p = p0 + v*dt.
        let v = -9.81 * dt;
        assert!((state.linear_velocity.y - v).abs() < 1e-5);
        assert!((state.transform.position.y - (50.0 + v * dt)).abs() < 1e-5);
    }

    #[test]
    fn double_step_without_readback_is_out_of_order() {
        let (mut reg, _) = committed_with_prop(5.0);
        reg.step(0.01).unwrap();
        let err = reg.step(0.01).unwrap_err();
        assert!(matches!(
            err,
            PhysicsError::OutOfOrder {
                op: "step",
                phase: Phase::Stepped
            }
        ));
    }

    #[test]
    fn writeback_requires_fresh_readback() {
        let (mut reg, h) = committed_with_prop(5.0);
        let err = reg.writeback(h, Vec3::X).unwrap_err();
        assert!(matches!(err, PhysicsError::OutOfOrder { op: "writeback", .. }));

        reg.step(0.01).unwrap();
        assert!(reg.writeback(h, Vec3::X).is_err());

        reg.readback().unwrap();
        reg.writeback(h, Vec3::X).unwrap();
        assert_eq!(reg.body(h).unwrap().linear_velocity, Vec3::X);
    }

    #[test]
    fn writeback_unknown_body_fails() {
        let (mut reg, _) = committed_with_prop(5.0);
        reg.readback().unwrap();
        let err = reg.writeback(BodyHandle(99), Vec3::X).unwrap_err();
        assert!(matches!(err, PhysicsError::UnknownBody(BodyHandle(99))));
    }

    #[test]
    fn written_velocity_drives_next_step() {
        let (mut reg, h) = committed_with_prop(100.0);
        reg.set_gravity(Vec3::ZERO);
        reg.readback().unwrap();
        reg.writeback(h, Vec3::new(2.0, 0.0, 0.0)).unwrap();
        reg.step(0.5).unwrap();
        let pos = reg.readback().unwrap()[h.index()].transform.position;
        assert!((pos.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn negative_or_nan_step_is_rejected() {
        let (mut reg, _) = committed_with_prop(5.0);
        assert!(matches!(reg.step(-1.0), Err(PhysicsError::NonFiniteStep(_))));
        assert!(matches!(reg.step(f32::NAN), Err(PhysicsError::NonFiniteStep(_))));
        assert_eq!(reg.step_count(), 0);
    }

    #[test]
    fn roles_are_tracked() {
        let mut reg = registry();
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let g = reg
            .register_concave(Vec3::ZERO, Quat::IDENTITY, 0.0, &tri, &[0, 1, 2])
            .unwrap();
        let p = reg
            .register_convex(BodyRole::Prop, Vec3::Y, Quat::IDENTITY, 1.0, &cube_points())
            .unwrap();
        let a = reg
            .register_convex(BodyRole::Avatar, Vec3::Y * 3.0, Quat::IDENTITY, 85.0, &cube_points())
            .unwrap();
        assert_eq!(reg.ground(), Some(g));
        assert_eq!(reg.avatar(), Some(a));
        let props: Vec<_> = reg.props().map(|r| r.handle).collect();
        assert_eq!(props, vec![p]);
        assert_eq!(reg.pose(a).unwrap().position, Vec3::Y * 3.0);
    }
}
