use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Translate a physical key into the ordinal the input table uses.
///
/// Letters map to their upper-case ASCII code, digits to theirs. Keys the
/// viewer has no use for map to `None`.
pub fn key_ordinal(code: KeyCode) -> Option<u32> {
    let c = match code {
        KeyCode::KeyA => 'A',
        KeyCode::KeyB => 'B',
        KeyCode::KeyC => 'C',
        KeyCode::KeyD => 'D',
        KeyCode::KeyE => 'E',
        KeyCode::KeyF => 'F',
        KeyCode::KeyG => 'G',
        KeyCode::KeyH => 'H',
        KeyCode::KeyI => 'I',
        KeyCode::KeyJ => 'J',
        KeyCode::KeyK => 'K',
        KeyCode::KeyL => 'L',
        KeyCode::KeyM => 'M',
        KeyCode::KeyN => 'N',
        KeyCode::KeyO => 'O',
        KeyCode::KeyP => 'P',
        KeyCode::KeyQ => 'Q',
        KeyCode::KeyR => 'R',
        KeyCode::KeyS => 'S',
        KeyCode::KeyT => 'T',
        KeyCode::KeyU => 'U',
        KeyCode::KeyV => 'V',
        KeyCode::KeyW => 'W',
        KeyCode::KeyX => 'X',
        KeyCode::KeyY => 'Y',
        KeyCode::KeyZ => 'Z',
        KeyCode::Digit0 => '0',
        KeyCode::Digit1 => '1',
        KeyCode::Digit2 => '2',
        KeyCode::Digit3 => '3',
        KeyCode::Digit4 => '4',
        KeyCode::Digit5 => '5',
        KeyCode::Digit6 => '6',
        KeyCode::Digit7 => '7',
        KeyCode::Digit8 => '8',
        KeyCode::Digit9 => '9',
        KeyCode::Space => ' ',
        _ => return None,
    };
    Some(c as u32)
}

/// Pointer capture after a mouse button event. A press captures; a release
/// leaves capture as it was.
pub fn capture_after_button(captured: bool, state: ElementState) -> bool {
    match state {
        ElementState::Pressed => true,
        ElementState::Released => captured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physview_input::Key;

    #[test]
    fn movement_keys_match_bindings() {
        assert_eq!(key_ordinal(KeyCode::KeyW), Some(Key::W.0 as u32));
        assert_eq!(key_ordinal(KeyCode::KeyA), Some(Key::A.0 as u32));
        assert_eq!(key_ordinal(KeyCode::Space), Some(Key::SPACE.0 as u32));
    }

    #[test]
    fn unused_keys_are_dropped() {
        assert_eq!(key_ordinal(KeyCode::F5), None);
        assert_eq!(key_ordinal(KeyCode::Escape), None);
    }

    #[test]
    fn button_release_keeps_capture() {
        let captured = capture_after_button(false, ElementState::Pressed);
        assert!(captured);
        assert!(capture_after_button(captured, ElementState::Released));
        assert!(!capture_after_button(false, ElementState::Released));
    }
}
