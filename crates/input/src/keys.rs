use serde::{Deserialize, Serialize};

/// Number of addressable key slots.
pub const KEY_SLOTS: usize = 256;

/// A key identified by a small ordinal (ASCII upper-case for letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub u8);

impl Key {
    pub const W: Key = Key(b'W');
    pub const A: Key = Key(b'A');
    pub const S: Key = Key(b'S');
    pub const D: Key = Key(b'D');
    pub const SPACE: Key = Key(b' ');

    /// Map a raw ordinal into a key, if it fits the table.
    pub fn from_ordinal(ordinal: u32) -> Option<Key> {
        u8::try_from(ordinal).ok().map(Key)
    }

    /// Letters are case-insensitive: `'w'` and `'W'` share a slot.
    pub fn from_char(c: char) -> Option<Key> {
        let c = c.to_ascii_uppercase();
        if c.is_ascii() {
            Some(Key(c as u8))
        } else {
            None
        }
    }
}

/// Held-key state for every ordinal.
#[derive(Debug, Clone)]
pub struct KeyTable {
    held: [bool; KEY_SLOTS],
}

impl Default for KeyTable {
    fn default() -> Self {
        Self {
            held: [false; KEY_SLOTS],
        }
    }
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.held[key.0 as usize] = true;
    }

    pub fn release(&mut self, key: Key) {
        self.held[key.0 as usize] = false;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key.0 as usize]
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held = [false; KEY_SLOTS];
    }

    pub fn held_count(&self) -> usize {
        self.held.iter().filter(|h| **h).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let mut keys = KeyTable::new();
        assert!(!keys.is_held(Key::W));
        keys.press(Key::W);
        assert!(keys.is_held(Key::W));
        assert_eq!(keys.held_count(), 1);
        keys.release(Key::W);
        assert!(!keys.is_held(Key::W));
    }

    #[test]
    fn ordinals_outside_table_are_rejected() {
        assert_eq!(Key::from_ordinal(87), Some(Key::W));
        assert_eq!(Key::from_ordinal(255), Some(Key(255)));
        assert_eq!(Key::from_ordinal(256), None);
        assert_eq!(Key::from_ordinal(0x0100_0000), None);
    }

    #[test]
    fn chars_fold_to_upper_case() {
        assert_eq!(Key::from_char('w'), Some(Key::W));
        assert_eq!(Key::from_char('D'), Some(Key::D));
        assert_eq!(Key::from_char('é'), None);
    }

    #[test]
    fn clear_releases_all() {
        let mut keys = KeyTable::new();
        keys.press(Key::A);
        keys.press(Key::S);
        keys.clear();
        assert_eq!(keys.held_count(), 0);
    }
}
