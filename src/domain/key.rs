/// Key events in the DOM `KeyboardEvent.code` space.
///
/// `code` names the physical key, not the produced character, so `KeyA`
/// is the same key with or without Shift. The terminal front-end converts
/// crossterm events into this space; everything downstream only sees
/// `KeyPress`.

use std::fmt;

use crossterm::event::{KeyCode as TermKey, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum KeyCode {
    /// Letter key, stored uppercase (`KeyA` → `Letter('A')`).
    Letter(char),
    /// Digit row key, 0..=9.
    Digit(u8),
    Backspace,
    Enter,
    Escape,
    Tab,
    /// Any key the console has no use for.
    Other,
}

impl KeyCode {
    /// Parse a DOM code string such as `KeyZ`, `Digit7`, `Enter`.
    #[allow(dead_code)]
    pub fn parse(code: &str) -> KeyCode {
        if let Some(rest) = code.strip_prefix("Key") {
            let mut chars = rest.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if c.is_ascii_uppercase() {
                    return KeyCode::Letter(c);
                }
            }
            return KeyCode::Other;
        }
        if let Some(rest) = code.strip_prefix("Digit") {
            return match rest.as_bytes() {
                [d @ b'0'..=b'9'] => KeyCode::Digit(d - b'0'),
                _ => KeyCode::Other,
            };
        }
        match code {
            "Backspace" => KeyCode::Backspace,
            "Enter" => KeyCode::Enter,
            "Escape" => KeyCode::Escape,
            "Tab" => KeyCode::Tab,
            _ => KeyCode::Other,
        }
    }

    pub fn is_digit(self) -> bool {
        matches!(self, KeyCode::Digit(_))
    }

    /// Literal character a digit key types.
    pub fn digit(self) -> Option<char> {
        match self {
            KeyCode::Digit(d) => char::from_digit(d as u32, 10),
            _ => None,
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Letter(c) => write!(f, "Key{c}"),
            KeyCode::Digit(d) => write!(f, "Digit{d}"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Escape => f.write_str("Escape"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Other => f.write_str("Unidentified"),
        }
    }
}

/// One key-down event as the dispatcher sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub code: KeyCode,
    pub ctrl: bool,
    pub alt: bool,
    /// Id of the element holding focus when the key went down.
    pub focused: Option<String>,
}

impl KeyPress {
    /// Unmodified press with nothing focused.
    #[allow(dead_code)]
    pub fn plain(code: KeyCode) -> Self {
        KeyPress { code, ctrl: false, alt: false, focused: None }
    }

    #[allow(dead_code)]
    pub fn focused_on(mut self, id: &str) -> Self {
        self.focused = Some(id.to_string());
        self
    }

    /// Convert a terminal key event. `?` and other symbols map to `Other`;
    /// the caller still sees the raw event for host-level handling.
    pub fn from_terminal(key: &KeyEvent, focused: Option<&str>) -> Self {
        let code = match key.code {
            TermKey::Char(c) if c.is_ascii_alphabetic() => KeyCode::Letter(c.to_ascii_uppercase()),
            TermKey::Char(c) if c.is_ascii_digit() => KeyCode::Digit(c as u8 - b'0'),
            TermKey::Backspace => KeyCode::Backspace,
            TermKey::Enter => KeyCode::Enter,
            TermKey::Esc => KeyCode::Escape,
            TermKey::Tab | TermKey::BackTab => KeyCode::Tab,
            _ => KeyCode::Other,
        };
        KeyPress {
            code,
            ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
            alt: key.modifiers.contains(KeyModifiers::ALT),
            focused: focused.map(str::to_string),
        }
    }
}
