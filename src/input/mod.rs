use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;
use thiserror::Error;

/// Parameter key carrying the native window handle.
pub const WINDOW_PARAM: &str = "WINDOW";

pub type ParamList = BTreeMap<String, String>;

pub type SharedInput = Rc<RefCell<InputManager>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input parameters do not name a window handle")]
    MissingWindowHandle,
    #[error("`{0}` is not a valid native window handle")]
    InvalidWindowHandle(String),
    #[error("input system has been destroyed")]
    Destroyed,
}

pub type InputResult<T> = Result<T, InputError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    Letter(char),
    Digit(u8),
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub pressed: bool,
}

/// Buffered keyboard fed by the window event pump.
#[derive(Debug, Default)]
pub struct Keyboard {
    pending: VecDeque<KeyEvent>,
    down: BTreeSet<KeyCode>,
}

impl Keyboard {
    pub fn inject(&mut self, event: KeyEvent) {
        self.pending.push_back(event);
    }

    /// Applies buffered events to the key state and returns them in arrival order.
    pub fn capture(&mut self) -> Vec<KeyEvent> {
        let events = self.pending.drain(..).collect::<Vec<_>>();
        for event in &events {
            if event.pressed {
                self.down.insert(event.key);
            } else {
                self.down.remove(&event.key);
            }
        }
        events
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.down.contains(&key)
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.down.clear();
    }
}

/// Input devices bound to one native window.
#[derive(Debug)]
pub struct InputManager {
    window_handle: usize,
    keyboard: Keyboard,
    destroyed: bool,
}

impl InputManager {
    pub fn create_input_system(params: &ParamList) -> InputResult<Self> {
        let raw = params
            .get(WINDOW_PARAM)
            .ok_or(InputError::MissingWindowHandle)?;
        let window_handle = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|handle| *handle != 0)
            .ok_or_else(|| InputError::InvalidWindowHandle(raw.clone()))?;

        log::info!("[input] input system bound to window handle {window_handle:#x}");
        Ok(Self {
            window_handle,
            keyboard: Keyboard::default(),
            destroyed: false,
        })
    }

    pub fn params_for_window(handle: usize) -> ParamList {
        let mut params = ParamList::new();
        params.insert(WINDOW_PARAM.to_string(), handle.to_string());
        params
    }

    pub fn window_handle(&self) -> usize {
        self.window_handle
    }

    pub fn inject_key(&mut self, event: KeyEvent) -> InputResult<()> {
        if self.destroyed {
            return Err(InputError::Destroyed);
        }
        self.keyboard.inject(event);
        Ok(())
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> InputResult<&mut Keyboard> {
        if self.destroyed {
            return Err(InputError::Destroyed);
        }
        Ok(&mut self.keyboard)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Releases the devices. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.keyboard.reset();
        self.destroyed = true;
        log::info!("[input] input system for window {:#x} destroyed", self.window_handle);
    }
}
