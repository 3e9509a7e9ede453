use crate::game::QuitSignal;
use crate::render::{WindowEvent, WindowId};
use std::collections::BTreeMap;

/// Window listener. The return value acknowledges the event to the
/// windowing layer.
pub type WindowListener = Box<dyn FnMut(&WindowEvent) -> bool>;

/// Routes pumped window events to the listeners registered for that window.
#[derive(Default)]
pub struct EventPump {
    listeners: BTreeMap<WindowId, Vec<WindowListener>>,
    unacknowledged: u64,
}

impl EventPump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, window: WindowId, listener: WindowListener) {
        self.listeners.entry(window).or_default().push(listener);
    }

    pub fn remove_listeners(&mut self, window: WindowId) -> usize {
        self.listeners
            .remove(&window)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    pub fn listener_count(&self, window: WindowId) -> usize {
        self.listeners.get(&window).map_or(0, Vec::len)
    }

    /// Every listener for the event's window sees the event. `None` when the
    /// window has no listeners, otherwise whether all of them acknowledged it.
    pub fn dispatch(&mut self, event: &WindowEvent) -> Option<bool> {
        let outcome = self.listeners.get_mut(&event.window()).map(|listeners| {
            let mut acknowledged = true;
            for listener in listeners.iter_mut() {
                acknowledged &= listener(event);
            }
            acknowledged
        });
        if outcome != Some(true) {
            self.unacknowledged += 1;
        }
        outcome
    }

    /// Events dispatched so far that no listener acknowledged.
    pub fn unacknowledged_count(&self) -> u64 {
        self.unacknowledged
    }
}

/// Close listener for the engine's window: asks the game to quit when
/// `tracked` is closing and always lets the close proceed.
pub fn close_listener(tracked: WindowId, quit: QuitSignal) -> WindowListener {
    Box::new(move |event| {
        match event {
            WindowEvent::CloseRequested(window) if *window == tracked => {
                log::info!("[engine] window {window:?} closing, requesting quit");
                quit.quit();
            }
            WindowEvent::Resized {
                width, height, ..
            } => {
                log::debug!("[engine] window resized to {width}x{height}");
            }
            _ => {}
        }
        true
    })
}
