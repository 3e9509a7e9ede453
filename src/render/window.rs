//! Desktop display backend on winit.
//!
//! Events are pumped without blocking from the engine's own frame loop
//! instead of handing control to `EventLoop::run`. Drawing itself is not
//! done here; a frame only requests a redraw.

use super::{
    ConfigPrompt, DisplayBackend, DisplayConfig, DisplayConfigStore, DisplayRoot, RenderError,
    RenderResult, RenderWindow, SceneGraph, SharedScene, SharedWindow, Viewport, WindowEvent,
    WindowId,
};
use crate::config::PluginManifest;
use crate::input::KeyCode;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowBuilder};

pub const WINIT_RENDER_SYSTEM: &str = "Winit";

const SCENE_MANAGER_TYPES: &[&str] = &["DefaultSceneManager", "OctreeSceneManager"];

/// Creates roots sharing one winit event loop; the platform allows only one
/// per process.
pub struct WinitBackend {
    event_loop: Option<Rc<RefCell<EventLoop<()>>>>,
    store: DisplayConfigStore,
    prompt: Rc<RefCell<dyn ConfigPrompt>>,
}

impl WinitBackend {
    pub fn new<P: ConfigPrompt + 'static>(store: DisplayConfigStore, prompt: P) -> Self {
        Self {
            event_loop: None,
            store,
            prompt: Rc::new(RefCell::new(prompt)),
        }
    }

    fn event_loop(&mut self) -> RenderResult<Rc<RefCell<EventLoop<()>>>> {
        if let Some(event_loop) = &self.event_loop {
            return Ok(Rc::clone(event_loop));
        }
        let event_loop = EventLoop::new().map_err(|err| RenderError::Backend(err.to_string()))?;
        let event_loop = Rc::new(RefCell::new(event_loop));
        self.event_loop = Some(Rc::clone(&event_loop));
        Ok(event_loop)
    }
}

impl DisplayBackend for WinitBackend {
    fn label(&self) -> &'static str {
        "Winit Display Backend"
    }

    fn create_root(&mut self, plugins: &PluginManifest) -> RenderResult<Box<dyn DisplayRoot>> {
        let event_loop = self.event_loop()?;
        let mut render_systems = vec![WINIT_RENDER_SYSTEM.to_string()];
        render_systems.extend(plugins.render_systems().map(str::to_string));
        log::info!("[render] winit root created, render systems: {render_systems:?}");

        Ok(Box::new(WinitRoot {
            event_loop,
            store: self.store.clone(),
            prompt: Rc::clone(&self.prompt),
            render_systems,
            selected: None,
            window: None,
            scenes: Vec::new(),
            released: false,
        }))
    }
}

struct WinitRoot {
    event_loop: Rc<RefCell<EventLoop<()>>>,
    store: DisplayConfigStore,
    prompt: Rc<RefCell<dyn ConfigPrompt>>,
    render_systems: Vec<String>,
    selected: Option<DisplayConfig>,
    window: Option<Rc<RefCell<WinitWindow>>>,
    scenes: Vec<SharedScene>,
    released: bool,
}

impl WinitRoot {
    fn ensure_live(&self) -> RenderResult<()> {
        if self.released {
            Err(RenderError::Released)
        } else {
            Ok(())
        }
    }
}

impl DisplayRoot for WinitRoot {
    fn label(&self) -> &'static str {
        "Winit Root"
    }

    fn restore_config(&mut self) -> bool {
        let restored = self
            .store
            .load()
            .filter(|config| self.render_systems.contains(&config.render_system));
        match restored {
            Some(config) => {
                log::info!("[render] restored display config {config:?}");
                self.selected = Some(config);
                true
            }
            None => false,
        }
    }

    fn show_config_dialog(&mut self) -> bool {
        let proposed = DisplayConfig::windowed(WINIT_RENDER_SYSTEM, 1280, 720);
        let chosen = self
            .prompt
            .borrow_mut()
            .choose(&self.render_systems, &proposed)
            .filter(|config| self.render_systems.contains(&config.render_system));
        let Some(config) = chosen else {
            return false;
        };
        if let Err(err) = self.store.save(&config) {
            log::warn!("[render] could not save display config: {err}");
        }
        self.selected = Some(config);
        true
    }

    fn initialise(&mut self, title: &str) -> RenderResult<SharedWindow> {
        self.ensure_live()?;
        let config = self.selected.clone().ok_or(RenderError::NoRenderSystem)?;

        let mut builder = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        if config.full_screen {
            builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let event_loop = self.event_loop.borrow();
        let window = builder
            .build(&event_loop)
            .map_err(|err| RenderError::WindowCreation(err.to_string()))?;

        let window = Rc::new(RefCell::new(WinitWindow {
            id: WindowId(u64::from(window.id())),
            title: title.to_string(),
            size: (config.width, config.height),
            viewports: Vec::new(),
            window: Some(window),
        }));
        log::info!(
            "[render] created window '{}' ({}x{}, {})",
            title,
            config.width,
            config.height,
            config.render_system
        );
        self.window = Some(Rc::clone(&window));
        Ok(window)
    }

    fn create_scene_manager(&mut self, kind: &str) -> RenderResult<SharedScene> {
        self.ensure_live()?;
        if !SCENE_MANAGER_TYPES.contains(&kind) {
            return Err(RenderError::UnknownSceneManager(kind.to_string()));
        }
        let scene: SharedScene = Rc::new(RefCell::new(SceneGraph::new(kind)));
        self.scenes.push(Rc::clone(&scene));
        Ok(scene)
    }

    fn pump_messages(&mut self) -> Vec<WindowEvent> {
        if self.released {
            return Vec::new();
        }
        let mut events = Vec::new();
        let status = self
            .event_loop
            .borrow_mut()
            .pump_events(Some(Duration::ZERO), |event, _target| {
                if let Event::WindowEvent { window_id, event } = event {
                    if let Some(event) = translate(WindowId(u64::from(window_id)), event) {
                        events.push(event);
                    }
                }
            });
        if let PumpStatus::Exit(code) = status {
            log::warn!("[render] event loop exited with code {code}");
        }
        if let Some(window) = &self.window {
            let mut window = window.borrow_mut();
            for event in &events {
                if let WindowEvent::Resized { width, height, .. } = event {
                    window.size = (*width, *height);
                }
            }
        }
        events
    }

    fn render_one_frame(&mut self) -> RenderResult<()> {
        self.ensure_live()?;
        let Some(window) = &self.window else {
            return Ok(());
        };
        let window = window.borrow();
        match &window.window {
            Some(native) => {
                native.request_redraw();
                Ok(())
            }
            None => Err(RenderError::WindowDestroyed(window.id)),
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        for scene in self.scenes.drain(..) {
            scene.borrow_mut().clear();
        }
        if let Some(window) = self.window.take() {
            window.borrow_mut().destroy();
        }
        self.released = true;
        log::info!("[render] winit root released");
    }
}

struct WinitWindow {
    id: WindowId,
    title: String,
    size: (u32, u32),
    viewports: Vec<Viewport>,
    window: Option<Window>,
}

impl RenderWindow for WinitWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn native_handle(&self) -> Option<usize> {
        let window = self.window.as_ref()?;
        let handle = window.window_handle().ok()?;
        match handle.as_raw() {
            RawWindowHandle::Xlib(handle) => Some(handle.window as usize),
            RawWindowHandle::Xcb(handle) => Some(handle.window.get() as usize),
            RawWindowHandle::Wayland(handle) => Some(handle.surface.as_ptr() as usize),
            RawWindowHandle::Win32(handle) => Some(handle.hwnd.get() as usize),
            RawWindowHandle::AppKit(handle) => Some(handle.ns_view.as_ptr() as usize),
            _ => None,
        }
    }

    fn add_viewport(&mut self, viewport: Viewport) -> RenderResult<()> {
        if self.window.is_none() {
            return Err(RenderError::WindowDestroyed(self.id));
        }
        self.viewports.retain(|existing| existing.z_order != viewport.z_order);
        self.viewports.push(viewport);
        self.viewports.sort_by_key(|viewport| viewport.z_order);
        Ok(())
    }

    fn remove_viewport(&mut self, z_order: i32) -> bool {
        let before = self.viewports.len();
        self.viewports.retain(|viewport| viewport.z_order != z_order);
        before != self.viewports.len()
    }

    fn viewports(&self) -> Vec<Viewport> {
        self.viewports.clone()
    }

    fn is_closed(&self) -> bool {
        self.window.is_none()
    }

    fn destroy(&mut self) {
        self.viewports.clear();
        // Dropping the winit window closes it.
        self.window = None;
    }
}

fn translate(window: WindowId, event: winit::event::WindowEvent) -> Option<WindowEvent> {
    use winit::event::WindowEvent as Winit;
    match event {
        Winit::CloseRequested => Some(WindowEvent::CloseRequested(window)),
        Winit::Resized(size) => Some(WindowEvent::Resized {
            window,
            width: size.width,
            height: size.height,
        }),
        Winit::Focused(focused) => Some(WindowEvent::FocusChanged { window, focused }),
        Winit::KeyboardInput { event, .. } => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return None;
            };
            Some(WindowEvent::Key {
                window,
                key: map_key(code)?,
                pressed: event.state == ElementState::Pressed,
            })
        }
        _ => None,
    }
}

fn map_key(code: WinitKey) -> Option<KeyCode> {
    let key = match code {
        WinitKey::KeyA => KeyCode::Letter('a'),
        WinitKey::KeyB => KeyCode::Letter('b'),
        WinitKey::KeyC => KeyCode::Letter('c'),
        WinitKey::KeyD => KeyCode::Letter('d'),
        WinitKey::KeyE => KeyCode::Letter('e'),
        WinitKey::KeyF => KeyCode::Letter('f'),
        WinitKey::KeyG => KeyCode::Letter('g'),
        WinitKey::KeyH => KeyCode::Letter('h'),
        WinitKey::KeyI => KeyCode::Letter('i'),
        WinitKey::KeyJ => KeyCode::Letter('j'),
        WinitKey::KeyK => KeyCode::Letter('k'),
        WinitKey::KeyL => KeyCode::Letter('l'),
        WinitKey::KeyM => KeyCode::Letter('m'),
        WinitKey::KeyN => KeyCode::Letter('n'),
        WinitKey::KeyO => KeyCode::Letter('o'),
        WinitKey::KeyP => KeyCode::Letter('p'),
        WinitKey::KeyQ => KeyCode::Letter('q'),
        WinitKey::KeyR => KeyCode::Letter('r'),
        WinitKey::KeyS => KeyCode::Letter('s'),
        WinitKey::KeyT => KeyCode::Letter('t'),
        WinitKey::KeyU => KeyCode::Letter('u'),
        WinitKey::KeyV => KeyCode::Letter('v'),
        WinitKey::KeyW => KeyCode::Letter('w'),
        WinitKey::KeyX => KeyCode::Letter('x'),
        WinitKey::KeyY => KeyCode::Letter('y'),
        WinitKey::KeyZ => KeyCode::Letter('z'),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::ArrowUp => KeyCode::Up,
        WinitKey::ArrowDown => KeyCode::Down,
        WinitKey::ArrowLeft => KeyCode::Left,
        WinitKey::ArrowRight => KeyCode::Right,
        WinitKey::Space => KeyCode::Space,
        WinitKey::Enter => KeyCode::Enter,
        WinitKey::Escape => KeyCode::Escape,
        WinitKey::Tab => KeyCode::Tab,
        WinitKey::Backspace => KeyCode::Backspace,
        WinitKey::ShiftLeft => KeyCode::LeftShift,
        WinitKey::ShiftRight => KeyCode::RightShift,
        WinitKey::ControlLeft => KeyCode::LeftControl,
        WinitKey::ControlRight => KeyCode::RightControl,
        WinitKey::AltLeft => KeyCode::LeftAlt,
        WinitKey::AltRight => KeyCode::RightAlt,
        WinitKey::F1 => KeyCode::Function(1),
        WinitKey::F2 => KeyCode::Function(2),
        WinitKey::F3 => KeyCode::Function(3),
        WinitKey::F4 => KeyCode::Function(4),
        WinitKey::F5 => KeyCode::Function(5),
        WinitKey::F6 => KeyCode::Function(6),
        WinitKey::F7 => KeyCode::Function(7),
        WinitKey::F8 => KeyCode::Function(8),
        WinitKey::F9 => KeyCode::Function(9),
        WinitKey::F10 => KeyCode::Function(10),
        WinitKey::F11 => KeyCode::Function(11),
        WinitKey::F12 => KeyCode::Function(12),
        _ => return None,
    };
    Some(key)
}
