//! Display backend without a platform window.
//!
//! Roots created here keep their windows and scene graphs in memory, record
//! every call in a shared journal and take platform events from an injector,
//! so the whole bootstrap can run in CI or on a server.

use super::{
    ConfigPrompt, DisplayBackend, DisplayConfig, DisplayConfigStore, DisplayRoot, RenderError,
    RenderResult, RenderWindow, SceneGraph, SceneManager, SharedScene, SharedWindow, Viewport,
    WindowEvent, WindowId,
};
use crate::config::PluginManifest;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub const HEADLESS_RENDER_SYSTEM: &str = "Headless";

const SCENE_MANAGER_TYPES: &[&str] = &["DefaultSceneManager", "OctreeSceneManager"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootCall {
    Created { plugins: Vec<String> },
    RestoreConfig { restored: bool },
    ConfigDialog { accepted: bool },
    Initialise { title: String },
    CreateSceneManager { kind: String },
    RenderFrame,
    Released,
}

/// Shared record of root calls, newest last.
#[derive(Clone, Default)]
pub struct HeadlessJournal(Rc<RefCell<Vec<RootCall>>>);

impl HeadlessJournal {
    pub fn calls(&self) -> Vec<RootCall> {
        self.0.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&RootCall) -> bool) -> usize {
        self.0.borrow().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: RootCall) {
        self.0.borrow_mut().push(call);
    }
}

/// Queue of platform events handed out by `pump_messages`.
#[derive(Clone, Default)]
pub struct HeadlessEvents(Rc<RefCell<VecDeque<WindowEvent>>>);

impl HeadlessEvents {
    pub fn push(&self, event: WindowEvent) {
        self.0.borrow_mut().push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.0.borrow().len()
    }

    fn drain(&self) -> Vec<WindowEvent> {
        self.0.borrow_mut().drain(..).collect()
    }
}

pub struct HeadlessBackend {
    store: DisplayConfigStore,
    prompt: Rc<RefCell<dyn ConfigPrompt>>,
    journal: HeadlessJournal,
    events: HeadlessEvents,
    next_window: u64,
}

impl HeadlessBackend {
    pub fn new<P: ConfigPrompt + 'static>(store: DisplayConfigStore, prompt: P) -> Self {
        Self {
            store,
            prompt: Rc::new(RefCell::new(prompt)),
            journal: HeadlessJournal::default(),
            events: HeadlessEvents::default(),
            next_window: 1,
        }
    }

    pub fn journal(&self) -> HeadlessJournal {
        self.journal.clone()
    }

    pub fn events(&self) -> HeadlessEvents {
        self.events.clone()
    }
}

impl DisplayBackend for HeadlessBackend {
    fn label(&self) -> &'static str {
        "Headless Display Backend"
    }

    fn create_root(&mut self, plugins: &PluginManifest) -> RenderResult<Box<dyn DisplayRoot>> {
        self.journal.record(RootCall::Created {
            plugins: plugins.plugins.clone(),
        });

        let mut render_systems = vec![HEADLESS_RENDER_SYSTEM.to_string()];
        render_systems.extend(plugins.render_systems().map(str::to_string));

        let window_id = WindowId(self.next_window);
        self.next_window += 1;

        Ok(Box::new(HeadlessRoot {
            store: self.store.clone(),
            prompt: Rc::clone(&self.prompt),
            journal: self.journal.clone(),
            events: self.events.clone(),
            render_systems,
            selected: None,
            window_id,
            window: None,
            scenes: Vec::new(),
            frames: 0,
            released: false,
        }))
    }
}

struct HeadlessRoot {
    store: DisplayConfigStore,
    prompt: Rc<RefCell<dyn ConfigPrompt>>,
    journal: HeadlessJournal,
    events: HeadlessEvents,
    render_systems: Vec<String>,
    selected: Option<DisplayConfig>,
    window_id: WindowId,
    window: Option<Rc<RefCell<HeadlessWindow>>>,
    scenes: Vec<SharedScene>,
    frames: u64,
    released: bool,
}

impl HeadlessRoot {
    fn ensure_live(&self) -> RenderResult<()> {
        if self.released {
            Err(RenderError::Released)
        } else {
            Ok(())
        }
    }
}

impl DisplayRoot for HeadlessRoot {
    fn label(&self) -> &'static str {
        "Headless Root"
    }

    fn restore_config(&mut self) -> bool {
        let restored = self
            .store
            .load()
            .filter(|config| self.render_systems.contains(&config.render_system));
        let ok = restored.is_some();
        if ok {
            self.selected = restored;
        }
        self.journal.record(RootCall::RestoreConfig { restored: ok });
        ok
    }

    fn show_config_dialog(&mut self) -> bool {
        let proposed = DisplayConfig::windowed(HEADLESS_RENDER_SYSTEM, 1280, 720);
        let chosen = self
            .prompt
            .borrow_mut()
            .choose(&self.render_systems, &proposed)
            .filter(|config| self.render_systems.contains(&config.render_system));

        let accepted = match chosen {
            Some(config) => {
                if let Err(err) = self.store.save(&config) {
                    log::warn!("[render] could not save display config: {err}");
                }
                self.selected = Some(config);
                true
            }
            None => false,
        };
        self.journal.record(RootCall::ConfigDialog { accepted });
        accepted
    }

    fn initialise(&mut self, title: &str) -> RenderResult<SharedWindow> {
        self.ensure_live()?;
        let config = self.selected.clone().ok_or(RenderError::NoRenderSystem)?;
        self.journal.record(RootCall::Initialise {
            title: title.to_string(),
        });

        let window = Rc::new(RefCell::new(HeadlessWindow {
            id: self.window_id,
            title: title.to_string(),
            size: (config.width, config.height),
            viewports: Vec::new(),
            closed: false,
        }));
        log::info!(
            "[render] created headless window {:?} '{}' ({}x{}, {})",
            self.window_id,
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
        self.journal.record(RootCall::CreateSceneManager {
            kind: kind.to_string(),
        });
        let scene: SharedScene = Rc::new(RefCell::new(SceneGraph::new(kind)));
        self.scenes.push(Rc::clone(&scene));
        Ok(scene)
    }

    fn pump_messages(&mut self) -> Vec<WindowEvent> {
        if self.released {
            return Vec::new();
        }
        self.events.drain()
    }

    fn render_one_frame(&mut self) -> RenderResult<()> {
        self.ensure_live()?;
        if let Some(window) = &self.window {
            let window = window.borrow();
            if window.closed {
                return Err(RenderError::WindowDestroyed(window.id));
            }
        }
        self.frames += 1;
        self.journal.record(RootCall::RenderFrame);
        Ok(())
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
        self.journal.record(RootCall::Released);
        log::info!("[render] headless root released after {} frames", self.frames);
    }
}

struct HeadlessWindow {
    id: WindowId,
    title: String,
    size: (u32, u32),
    viewports: Vec<Viewport>,
    closed: bool,
}

impl RenderWindow for HeadlessWindow {
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
        if self.closed {
            None
        } else {
            Some(0x1000 + self.id.0 as usize)
        }
    }

    fn add_viewport(&mut self, viewport: Viewport) -> RenderResult<()> {
        if self.closed {
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
        self.closed
    }

    fn destroy(&mut self) {
        self.viewports.clear();
        self.closed = true;
    }
}
