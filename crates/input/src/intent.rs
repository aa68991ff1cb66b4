use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::keys::{Key, KeyTable};

/// Which keys drive movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: Key,
    pub backward: Key,
    pub left: Key,
    pub right: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: Key::W,
            backward: Key::S,
            left: Key::A,
            right: Key::D,
        }
    }
}

/// Movement requested this tick, as signed axis values in {-1, 0, 1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveIntent {
    pub forward: i8,
    pub strafe: i8,
}

impl MoveIntent {
    /// Resolve held keys. Opposing keys do not cancel: forward beats backward
    /// and right beats left.
    pub fn from_keys(keys: &KeyTable, bindings: &KeyBindings) -> Self {
        let forward = if keys.is_held(bindings.forward) {
            1
        } else if keys.is_held(bindings.backward) {
            -1
        } else {
            0
        };
        let strafe = if keys.is_held(bindings.right) {
            1
        } else if keys.is_held(bindings.left) {
            -1
        } else {
            0
        };
        Self { forward, strafe }
    }

    pub fn is_idle(&self) -> bool {
        self.forward == 0 && self.strafe == 0
    }

    /// Unit direction in world space relative to `look`, or zero when idle.
    ///
    /// Strafing follows the normalized cross of `look` and `up`.
    pub fn direction(&self, look: Vec3, up: Vec3) -> Vec3 {
        if self.is_idle() {
            return Vec3::ZERO;
        }
        let look = look.normalize_or_zero();
        let right = look.cross(up).normalize_or_zero();
        (look * self.forward as f32 + right * self.strafe as f32).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(keys: &[Key]) -> KeyTable {
        let mut table = KeyTable::new();
        for k in keys {
            table.press(*k);
        }
        table
    }

    #[test]
    fn idle_without_keys() {
        let intent = MoveIntent::from_keys(&KeyTable::new(), &KeyBindings::default());
        assert!(intent.is_idle());
        assert_eq!(intent.direction(Vec3::NEG_Z, Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn forward_beats_backward() {
        let intent = MoveIntent::from_keys(&held(&[Key::W, Key::S]), &KeyBindings::default());
        assert_eq!(intent.forward, 1);
        let intent = MoveIntent::from_keys(&held(&[Key::S]), &KeyBindings::default());
        assert_eq!(intent.forward, -1);
    }

    #[test]
    fn right_beats_left() {
        let intent = MoveIntent::from_keys(&held(&[Key::A, Key::D]), &KeyBindings::default());
        assert_eq!(intent.strafe, 1);
    }

    #[test]
    fn diagonal_is_unit_length() {
        let intent = MoveIntent::from_keys(&held(&[Key::W, Key::D]), &KeyBindings::default());
        let dir = intent.direction(Vec3::new(0.0, -0.5, -1.0), Vec3::Y);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn strafe_right_of_negative_z_is_positive_x() {
        let intent = MoveIntent {
            forward: 0,
            strafe: 1,
        };
        let dir = intent.direction(Vec3::NEG_Z, Vec3::Y);
        assert!((dir - Vec3::X).length() < 1e-6);
    }
}
