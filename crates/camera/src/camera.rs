use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Tunables for movement, look sensitivity and projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// World units per second for free-fly movement.
    pub move_speed: f32,
    /// Radians per pointer unit.
    pub rotate_speed: f32,
    /// Per-axis clamp applied to each pointer delta before rotating.
    pub max_pointer_step: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            rotate_speed: 0.003,
            max_pointer_step: 20.0,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Clamp one pointer delta to `[-limit, limit]`. Non-finite deltas become zero.
pub fn clamp_pointer_step(delta: f32, limit: f32) -> f32 {
    if !delta.is_finite() {
        return 0.0;
    }
    delta.clamp(-limit, limit)
}

/// Eye position plus a unit look direction and fixed world-up.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    params: CameraParams,
    dt: f32,
    /// Pointer position seen by the last look sample.
    last_pointer: Option<Vec2>,
}

impl Camera {
    /// Place the camera at `eye` looking at `target`.
    pub fn new(eye: Vec3, target: Vec3, params: CameraParams) -> Self {
        let mut camera = Self {
            position: eye,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            params,
            dt: 0.0,
            last_pointer: None,
        };
        camera.init(eye, target);
        camera
    }

    /// Reset position and look direction. A degenerate `target == eye` keeps -Z.
    pub fn init(&mut self, eye: Vec3, target: Vec3) {
        self.position = eye;
        let dir = target - eye;
        self.forward = if dir.length_squared() > f32::EPSILON {
            dir.normalize()
        } else {
            tracing::debug!(?eye, ?target, "camera target coincides with eye, looking down -Z");
            Vec3::NEG_Z
        };
        self.up = Vec3::Y;
        self.last_pointer = None;
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit vector to the right of the look direction.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// Look direction with pitch removed. Zero when looking straight up or down.
    pub fn flat_forward(&self) -> Vec3 {
        Vec3::new(self.forward.x, 0.0, self.forward.z).normalize_or_zero()
    }

    /// The point one unit along the look direction.
    pub fn at(&self) -> Vec3 {
        self.position + self.forward
    }

    /// Store the elapsed time used by the movement calls that follow.
    pub fn update(&mut self, dt: f32) {
        self.dt = dt;
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Apply one pointer delta. Pitch goes first around the local right axis,
    /// then yaw around world-up.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let limit = self.params.max_pointer_step;
        let dx = clamp_pointer_step(dx, limit);
        let dy = clamp_pointer_step(dy, limit);

        let axis_x = self.forward.cross(self.up);
        let pitch = if axis_x.length_squared() > f32::EPSILON {
            Quat::from_axis_angle(axis_x.normalize(), -dy * self.params.rotate_speed)
        } else {
            Quat::IDENTITY
        };
        let yaw = Quat::from_axis_angle(Vec3::Y, -dx * self.params.rotate_speed);

        let rotated = (yaw * pitch) * self.forward;
        if rotated.length_squared() > f32::EPSILON {
            self.forward = rotated.normalize();
        }
    }

    /// Rotate by the distance the pointer travelled since the previous sample.
    ///
    /// The first sample only primes the tracker.
    pub fn look_from_pointer(&mut self, pointer: Vec2) {
        let last = self.last_pointer.unwrap_or(pointer);
        let delta = pointer - last;
        self.last_pointer = Some(pointer);
        self.rotate(delta.x, delta.y);
    }

    /// The platform warped the pointer back to `center`.
    pub fn recenter_pointer(&mut self, center: Vec2) {
        self.last_pointer = Some(center);
    }

    pub fn last_pointer(&self) -> Option<Vec2> {
        self.last_pointer
    }

    /// Translate along an arbitrary direction, scaled by move speed and the stored dt.
    pub fn move_along(&mut self, direction: Vec3) {
        self.position += direction * self.params.move_speed * self.dt;
    }

    pub fn move_forward(&mut self) {
        self.move_along(self.forward);
    }

    pub fn move_backward(&mut self) {
        self.move_along(-self.forward);
    }

    pub fn move_right(&mut self) {
        self.move_along(self.right());
    }

    pub fn move_left(&mut self) {
        self.move_along(-self.right());
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.at(), self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.params.fov_y_degrees.to_radians(),
            aspect.max(f32::EPSILON),
            self.params.near,
            self.params.far,
        )
    }
}
