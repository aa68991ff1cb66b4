use glam::Vec2;

use crate::keys::{Key, KeyTable};

/// Everything the window layer has told us since startup.
///
/// Owned by the frame context; event handlers write into it and the
/// orchestrator reads it once per tick.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: KeyTable,
    pointer: Option<Vec2>,
    captured: bool,
    quit_requested: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key-down for a raw ordinal. Ordinals outside the table are dropped.
    pub fn key_down(&mut self, ordinal: u32) {
        if let Some(key) = Key::from_ordinal(ordinal) {
            self.keys.press(key);
        }
    }

    pub fn key_up(&mut self, ordinal: u32) {
        if let Some(key) = Key::from_ordinal(ordinal) {
            self.keys.release(key);
        }
    }

    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut KeyTable {
        &mut self.keys
    }

    /// Latest pointer position in viewport pixels.
    pub fn pointer_moved(&mut self, position: Vec2) {
        self.pointer = Some(position);
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn set_captured(&mut self, captured: bool) {
        if self.captured != captured {
            tracing::debug!(captured, "pointer capture changed");
        }
        self.captured = captured;
    }

    pub fn captured(&self) -> bool {
        self.captured
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Focus loss: drop held keys so nothing keeps moving.
    pub fn focus_lost(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_events_update_table() {
        let mut input = InputState::new();
        input.key_down(b'W' as u32);
        assert!(input.keys().is_held(Key::W));
        input.key_up(b'W' as u32);
        assert!(!input.keys().is_held(Key::W));
    }

    #[test]
    fn out_of_range_key_is_ignored() {
        let mut input = InputState::new();
        input.key_down(1_000);
        assert_eq!(input.keys().held_count(), 0);
    }

    #[test]
    fn pointer_and_capture() {
        let mut input = InputState::new();
        assert!(input.pointer().is_none());
        input.pointer_moved(Vec2::new(10.0, 20.0));
        assert_eq!(input.pointer(), Some(Vec2::new(10.0, 20.0)));
        input.set_captured(true);
        assert!(input.captured());
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut input = InputState::new();
        input.key_down(b'D' as u32);
        input.focus_lost();
        assert_eq!(input.keys().held_count(), 0);
    }

    #[test]
    fn quit_is_sticky() {
        let mut input = InputState::new();
        assert!(!input.quit_requested());
        input.request_quit();
        assert!(input.quit_requested());
    }
}
