/// Keyboard input collector.
///
/// Drains every pending terminal event once per frame without blocking.
/// Only key-down events matter here: `Press`, plus `Repeat` for a key held
/// down, the same events a browser reports as `keydown`. `Release` events
/// (reported when keyboard enhancement is on) are dropped.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct InputState {
    /// Key-down events collected during the most recent drain, in order.
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events.
    /// Call this once per frame, before dispatching.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Release {
                    self.raw_events.push(key);
                }
            }
        }
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| is_ctrl_c(k))
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && (key.code == KeyCode::Char('c') || key.code == KeyCode::Char('C'))
}
