use glam::Vec3;
use serde::{Deserialize, Serialize};

/// How movement intent turns into avatar body velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarMotion {
    /// Horizontal speed while a movement key is held.
    pub speed: f32,
    /// Multiplier applied to horizontal velocity on idle ticks.
    pub damping: f32,
    /// Keep the simulated vertical velocity (gravity, bounces) untouched.
    pub preserve_vertical_velocity: bool,
    /// Camera height above the body origin.
    pub eye_height: f32,
}

impl Default for AvatarMotion {
    fn default() -> Self {
        Self {
            speed: 6.0,
            damping: 0.9,
            preserve_vertical_velocity: true,
            eye_height: 0.7,
        }
    }
}

impl AvatarMotion {
    /// Velocity to write back given the body's current velocity and a world
    /// direction. Only the horizontal part of `direction` counts, so looking
    /// up never lifts the avatar.
    pub fn velocity(&self, current: Vec3, direction: Vec3) -> Vec3 {
        let vertical = if self.preserve_vertical_velocity {
            current.y
        } else {
            0.0
        };
        let flat = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        let horizontal = if flat == Vec3::ZERO {
            Vec3::new(current.x, 0.0, current.z) * self.damping
        } else {
            flat * self.speed
        };
        Vec3::new(horizontal.x, vertical, horizontal.z)
    }

    pub fn eye_position(&self, body: Vec3) -> Vec3 {
        body + Vec3::Y * self.eye_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_sets_horizontal_speed() {
        let motion = AvatarMotion::default();
        let v = motion.velocity(Vec3::new(0.0, -2.0, 0.0), Vec3::new(3.0, 0.0, 4.0));
        assert!((Vec3::new(v.x, 0.0, v.z).length() - 6.0).abs() < 1e-5);
        assert_eq!(v.y, -2.0);
    }

    #[test]
    fn looking_up_does_not_fly() {
        let motion = AvatarMotion::default();
        let v = motion.velocity(Vec3::ZERO, Vec3::new(0.0, 0.9, -0.1).normalize());
        assert_eq!(v.y, 0.0);
        assert!((v.z + 6.0).abs() < 1e-5);
    }

    #[test]
    fn idle_damping_is_geometric() {
        let motion = AvatarMotion::default();
        let start = Vec3::new(4.0, 0.0, -2.0);
        let mut v = start;
        for _ in 0..10 {
            v = motion.velocity(v, Vec3::ZERO);
        }
        let expected = start * 0.9f32.powi(10);
        assert!((v - expected).length() < 1e-5);
    }

    #[test]
    fn vertical_can_be_dropped() {
        let motion = AvatarMotion {
            preserve_vertical_velocity: false,
            ..AvatarMotion::default()
        };
        assert_eq!(motion.velocity(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO).y, 0.0);
    }

    #[test]
    fn eye_sits_above_body() {
        let motion = AvatarMotion::default();
        assert_eq!(motion.eye_position(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 2.7, 3.0));
    }
}
