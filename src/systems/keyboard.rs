use crate::ecs::World;
use crate::engine::schedule::System;
use crate::input::{InputManager, KeyCode, KeyEvent};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Weak;

/// Captures the keyboard once per frame so game systems can query key state.
#[derive(Debug, Default)]
pub struct KeyboardSystem {
    input: Weak<RefCell<InputManager>>,
    held: BTreeSet<KeyCode>,
    frame_events: Vec<KeyEvent>,
}

impl KeyboardSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, input: Weak<RefCell<InputManager>>) {
        self.input = input;
        self.held.clear();
        self.frame_events.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.input.strong_count() > 0
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Whether `key` went down during the last captured frame.
    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.frame_events
            .iter()
            .any(|event| event.pressed && event.key == key)
    }

    pub fn frame_events(&self) -> &[KeyEvent] {
        &self.frame_events
    }
}

impl System for KeyboardSystem {
    fn update(&mut self, _world: &mut World, _delta_ms: u32) {
        self.frame_events.clear();
        let Some(input) = self.input.upgrade() else {
            return;
        };
        let mut input = input.borrow_mut();
        let keyboard = match input.keyboard_mut() {
            Ok(keyboard) => keyboard,
            Err(err) => {
                log::debug!("[systems] keyboard unavailable: {err}");
                return;
            }
        };
        self.frame_events = keyboard.capture();
        for event in &self.frame_events {
            if event.pressed {
                self.held.insert(event.key);
            } else {
                self.held.remove(&event.key);
            }
        }
    }

    fn shutdown(&mut self, _world: &mut World) {
        self.attach(Weak::new());
    }
}
