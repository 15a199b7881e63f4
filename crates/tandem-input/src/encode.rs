// Translates a routed Event into the byte sequence written to a pane's pty
// (§4.6 "Pane passthrough"). Legacy xterm encoding only — there is no Kitty
// keyboard protocol negotiation in this system.

use tandem_core::{Event, Key, Modifiers, MouseButtons, VtMode};

/// `mode` is the receiving pane's current VT mode, which selects SGR vs.
/// legacy mouse encoding and app-cursor-key mode.
pub fn encode_event(event: &Event, mode: VtMode) -> Vec<u8> {
    match event {
        Event::Key { key, rune, mods } => encode_key(*key, *rune, *mods, mode),
        Event::Mouse { x, y, buttons, mods } => encode_mouse(*x, *y, *buttons, *mods, mode),
        Event::Resize { .. } => Vec::new(),
        Event::Paste { start } => {
            if mode.contains(VtMode::BRACKETED_PASTE) {
                if *start {
                    b"\x1b[200~".to_vec()
                } else {
                    b"\x1b[201~".to_vec()
                }
            } else {
                Vec::new()
            }
        }
    }
}

fn mod_param(mods: Modifiers) -> u8 {
    let mut bits = 0u8;
    if mods.shift {
        bits |= 0b001;
    }
    if mods.alt {
        bits |= 0b010;
    }
    if mods.ctrl {
        bits |= 0b100;
    }
    if bits == 0 {
        0
    } else {
        bits + 1
    }
}

fn encode_key(key: Key, rune: Option<char>, mods: Modifiers, mode: VtMode) -> Vec<u8> {
    let app_cursor = mode.contains(VtMode::APP_CURSOR_KEYS);
    let m = mod_param(mods);

    if let Some(term) = letter_key(key) {
        return if m > 0 {
            format!("\x1b[1;{}{}", m, term as char).into_bytes()
        } else if app_cursor && matches!(key, Key::Up | Key::Down | Key::Left | Key::Right) {
            vec![0x1b, b'O', term]
        } else {
            vec![0x1b, b'[', term]
        };
    }

    if let Some(num) = tilde_key(key) {
        return if m > 0 {
            format!("\x1b[{};{}~", num, m).into_bytes()
        } else {
            format!("\x1b[{}~", num).into_bytes()
        };
    }

    match key {
        Key::Enter => vec![b'\r'],
        Key::Backspace => {
            if mods.alt {
                vec![0x1b, 0x7f]
            } else {
                vec![0x7f]
            }
        }
        Key::Tab => {
            if mods.shift {
                b"\x1b[Z".to_vec()
            } else {
                vec![b'\t']
            }
        }
        Key::Escape => vec![0x1b],
        Key::Char(c) => encode_char(c, rune, mods),
        _ => Vec::new(),
    }
}

/// Arrow/Home/End/F1-F4: `CSI {term}` unmodified, `ESC O {term}` in app-cursor
/// mode, `CSI 1 ; {mod} {term}` with modifiers.
fn letter_key(key: Key) -> Option<u8> {
    Some(match key {
        Key::Up => b'A',
        Key::Down => b'B',
        Key::Right => b'C',
        Key::Left => b'D',
        Key::Home => b'H',
        Key::End => b'F',
        Key::F(1) => b'P',
        Key::F(2) => b'Q',
        Key::F(3) => b'R',
        Key::F(4) => b'S',
        _ => return None,
    })
}

/// Insert/Delete/PageUp/PageDown/F5-F12: `CSI {num} ~`.
fn tilde_key(key: Key) -> Option<u8> {
    Some(match key {
        Key::Insert => 2,
        Key::Delete => 3,
        Key::PageUp => 5,
        Key::PageDown => 6,
        Key::F(5) => 15,
        Key::F(6) => 17,
        Key::F(7) => 18,
        Key::F(8) => 19,
        Key::F(9) => 20,
        Key::F(10) => 21,
        Key::F(11) => 23,
        Key::F(12) => 24,
        _ => return None,
    })
}

fn encode_char(c: char, rune: Option<char>, mods: Modifiers) -> Vec<u8> {
    if mods.ctrl {
        if let Some(c0) = ctrl_byte(c) {
            let mut v = Vec::new();
            if mods.alt {
                v.push(0x1b);
            }
            v.push(c0);
            return v;
        }
    }
    let ch = rune.unwrap_or(c);
    let mut buf = [0u8; 4];
    let bytes = ch.encode_utf8(&mut buf).as_bytes();
    if mods.alt {
        let mut v = vec![0x1b];
        v.extend_from_slice(bytes);
        v
    } else {
        bytes.to_vec()
    }
}

/// Ctrl+letter and friends to their C0 control byte (xterm-compatible).
fn ctrl_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' => Some(c as u8 - b'a' + 1),
        'A'..='Z' => Some(c as u8 - b'A' + 1),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' => Some(0x1f),
        '`' | '2' => Some(0x00),
        '8' => Some(0x7f),
        _ => None,
    }
}

/// `buttons.is_empty()` is treated as a motion/release report (button code 3,
/// lower-case SGR terminator); any held button is reported as a press.
fn encode_mouse(x: u16, y: u16, buttons: MouseButtons, mods: Modifiers, mode: VtMode) -> Vec<u8> {
    if !mode.intersects(VtMode::MOUSE_BUTTON | VtMode::MOUSE_MOTION | VtMode::MOUSE_ANY) {
        return Vec::new();
    }

    let mut code: u16 = if buttons.contains(MouseButtons::LEFT) {
        0
    } else if buttons.contains(MouseButtons::MIDDLE) {
        1
    } else if buttons.contains(MouseButtons::RIGHT) {
        2
    } else {
        3
    };
    if mods.shift {
        code += 4;
    }
    if mods.alt {
        code += 8;
    }
    if mods.ctrl {
        code += 16;
    }

    if mode.contains(VtMode::MOUSE_SGR) {
        let suffix = if buttons.is_empty() { 'm' } else { 'M' };
        format!("\x1b[<{};{};{}{}", code, x + 1, y + 1, suffix).into_bytes()
    } else {
        let cb = (32 + code).min(255) as u8;
        let cx = ((x + 1).min(223) + 32) as u8;
        let cy = ((y + 1).min(223) + 32) as u8;
        vec![0x1b, b'[', b'M', cb, cx, cy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, mods: Modifiers) -> Event {
        Event::Key { key, rune: None, mods }
    }

    #[test]
    fn ctrl_c_produces_etx() {
        let e = key(Key::Char('c'), Modifiers { ctrl: true, ..Modifiers::default() });
        assert_eq!(encode_event(&e, VtMode::empty()), vec![0x03]);
    }

    #[test]
    fn plain_enter_is_carriage_return() {
        let e = key(Key::Enter, Modifiers::default());
        assert_eq!(encode_event(&e, VtMode::empty()), vec![b'\r']);
    }

    #[test]
    fn arrow_up_without_app_cursor_uses_csi() {
        let e = key(Key::Up, Modifiers::default());
        assert_eq!(encode_event(&e, VtMode::empty()), b"\x1b[A");
    }

    #[test]
    fn arrow_up_with_app_cursor_uses_ss3() {
        let e = key(Key::Up, Modifiers::default());
        assert_eq!(encode_event(&e, VtMode::APP_CURSOR_KEYS), b"\x1bOA");
    }

    #[test]
    fn shift_arrow_right_uses_modifier_csi() {
        let e = key(Key::Right, Modifiers { shift: true, ..Modifiers::default() });
        assert_eq!(encode_event(&e, VtMode::empty()), b"\x1b[1;2C");
    }

    #[test]
    fn mouse_click_without_any_mouse_mode_produces_nothing() {
        let e = Event::Mouse { x: 4, y: 2, buttons: MouseButtons::LEFT, mods: Modifiers::default() };
        assert!(encode_event(&e, VtMode::empty()).is_empty());
    }

    #[test]
    fn sgr_mouse_press_encodes_1_based_coordinates() {
        let e = Event::Mouse { x: 4, y: 2, buttons: MouseButtons::LEFT, mods: Modifiers::default() };
        let bytes = encode_event(&e, VtMode::MOUSE_BUTTON | VtMode::MOUSE_SGR);
        assert_eq!(bytes, b"\x1b[<0;5;3M");
    }

    #[test]
    fn sgr_mouse_release_uses_lowercase_terminator() {
        let e = Event::Mouse { x: 4, y: 2, buttons: MouseButtons::NONE, mods: Modifiers::default() };
        let bytes = encode_event(&e, VtMode::MOUSE_BUTTON | VtMode::MOUSE_SGR);
        assert_eq!(bytes, b"\x1b[<3;5;3m");
    }

    #[test]
    fn bracketed_paste_markers_gated_on_mode() {
        let e = Event::Paste { start: true };
        assert!(encode_event(&e, VtMode::empty()).is_empty());
        assert_eq!(encode_event(&e, VtMode::BRACKETED_PASTE), b"\x1b[200~");
    }
}
