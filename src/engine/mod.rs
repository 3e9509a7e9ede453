pub mod events;
pub mod schedule;

use self::events::{EventPump, close_listener};
use crate::config::{ConfigError, ConfigFile, EngineConfig, ManifestError, PluginManifest};
use crate::ecs::{EcsError, World};
use crate::game::QuitSignal;
use crate::input::{InputError, InputManager, KeyEvent, SharedInput};
use crate::render::{
    DisplayBackend, RenderError, RenderServices, ResourceError, SharedRoot, SharedScene,
    SharedWindow, WindowEvent,
};
use crate::systems::{
    self, AddSceneNodeSystem, CameraSystem, EntitySystem, KeyboardSystem, LightSystem,
    RemoveSceneNodeSystem, RenderSystem, SceneNodeIndex, SkySystem, UpdateSceneNodeSystem,
    ViewportSystem,
};
use schedule::Scheduler;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("display configuration was declined")]
    ConfigurationDeclined,
    #[error("`{operation}` is not valid while the engine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
    #[error("window does not expose a native handle")]
    MissingNativeHandle,
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    World(#[from] EcsError),
}

impl EngineError {
    /// Declining the display configuration ends the program successfully.
    pub fn is_graceful_exit(&self) -> bool {
        matches!(self, EngineError::ConfigurationDeclined)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Display, scene, input and per-frame graphics systems for one game.
pub struct GraphicsEngine {
    config: EngineConfig,
    backend: Box<dyn DisplayBackend>,
    services: RenderServices,
    quit: QuitSignal,
    scheduler: Scheduler,
    events: EventPump,
    state: EngineState,
    root: Option<SharedRoot>,
    window: Option<SharedWindow>,
    scene_manager: Option<SharedScene>,
    input_manager: Option<SharedInput>,
    keyboard_system: Option<Rc<RefCell<KeyboardSystem>>>,
    viewport_system: Option<Rc<RefCell<ViewportSystem>>>,
}

impl GraphicsEngine {
    pub fn new(
        config: EngineConfig,
        backend: Box<dyn DisplayBackend>,
        services: RenderServices,
        quit: QuitSignal,
    ) -> Self {
        Self {
            config,
            backend,
            services,
            quit,
            scheduler: Scheduler::default(),
            events: EventPump::new(),
            state: EngineState::Uninitialized,
            root: None,
            window: None,
            scene_manager: None,
            input_manager: None,
            keyboard_system: None,
            viewport_system: None,
        }
    }

    pub fn init(&mut self) -> EngineResult<()> {
        self.require_state("init", EngineState::Uninitialized)?;
        match self.bootstrap() {
            Ok(()) => {
                self.state = EngineState::Initialized;
                log::info!(
                    "[engine] initialised with {} systems on {}",
                    self.scheduler.system_names().len(),
                    self.backend.label()
                );
                Ok(())
            }
            Err(err) => {
                if !err.is_graceful_exit() {
                    log::error!("[engine] initialisation failed: {err}");
                }
                self.release_resources();
                Err(err)
            }
        }
    }

    /// Pumps pending window events, then runs one frame of every system.
    pub fn update(&mut self, delta_ms: u32) -> EngineResult<()> {
        self.require_state("update", EngineState::Initialized)?;
        self.pump_events();
        self.scheduler.update(delta_ms);
        Ok(())
    }

    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.require_state("shutdown", EngineState::Initialized)?;
        self.state = EngineState::ShuttingDown;
        self.scheduler.shutdown();
        self.release_resources();
        self.state = EngineState::Uninitialized;
        log::info!("[engine] shut down");
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn services(&self) -> &RenderServices {
        &self.services
    }

    pub fn quit_signal(&self) -> &QuitSignal {
        &self.quit
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn world(&self) -> &World {
        self.scheduler.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.scheduler.world_mut()
    }

    pub fn input_manager(&self) -> Option<&SharedInput> {
        self.input_manager.as_ref()
    }

    pub fn keyboard_system(&self) -> Option<&Rc<RefCell<KeyboardSystem>>> {
        self.keyboard_system.as_ref()
    }

    pub fn root(&self) -> Option<&SharedRoot> {
        self.root.as_ref()
    }

    pub fn scene_manager(&self) -> Option<&SharedScene> {
        self.scene_manager.as_ref()
    }

    pub fn viewport_system(&self) -> Option<&Rc<RefCell<ViewportSystem>>> {
        self.viewport_system.as_ref()
    }

    pub fn window(&self) -> Option<&SharedWindow> {
        self.window.as_ref()
    }

    fn require_state(&self, operation: &'static str, expected: EngineState) -> EngineResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn bootstrap(&mut self) -> EngineResult<()> {
        setup_log(&self.config.log_filter);

        let plugins = PluginManifest::load(&self.config.plugins_manifest)?;
        let root: SharedRoot = Rc::new(RefCell::new(self.backend.create_root(&plugins)?));
        self.root = Some(Rc::clone(&root));

        self.load_resources()?;
        self.load_config(&root)?;

        let window = root.borrow_mut().initialise(&self.config.window_title)?;
        let window_id = window.borrow().id();
        self.events
            .add_listener(window_id, close_listener(window_id, self.quit.clone()));
        self.window = Some(Rc::clone(&window));

        self.services
            .textures
            .borrow_mut()
            .set_default_num_mipmaps(self.config.default_mipmaps);
        self.services.resources.borrow_mut().initialise_all_groups()?;

        let scene = root
            .borrow_mut()
            .create_scene_manager(&self.config.scene_manager_type)?;
        self.scene_manager = Some(Rc::clone(&scene));
        scene
            .borrow_mut()
            .set_ambient_light(self.config.ambient_light);

        let input = self.setup_input_manager(&window)?;
        self.register_systems(&root, &window, &scene, &input);
        self.scheduler.init();
        Ok(())
    }

    fn load_resources(&mut self) -> EngineResult<()> {
        let path = &self.config.resources_manifest;
        let manifest = ConfigFile::load(path)?;
        let base = path.parent().unwrap_or(Path::new(""));
        let mut registry = self.services.resources.borrow_mut();
        for entry in manifest.resource_locations() {
            let location = base.join(&entry.location);
            registry.add_resource_location(
                &location.to_string_lossy(),
                &entry.kind,
                &entry.group,
            );
        }
        Ok(())
    }

    fn load_config(&mut self, root: &SharedRoot) -> EngineResult<()> {
        let mut root = root.borrow_mut();
        if root.restore_config() || root.show_config_dialog() {
            return Ok(());
        }
        log::info!("[engine] display configuration declined, exiting");
        Err(EngineError::ConfigurationDeclined)
    }

    fn setup_input_manager(&mut self, window: &SharedWindow) -> EngineResult<SharedInput> {
        let handle = window
            .borrow()
            .native_handle()
            .ok_or(EngineError::MissingNativeHandle)?;
        let params = InputManager::params_for_window(handle);
        let input = Rc::new(RefCell::new(InputManager::create_input_system(&params)?));
        self.input_manager = Some(Rc::clone(&input));
        Ok(input)
    }

    fn register_systems(
        &mut self,
        root: &SharedRoot,
        window: &SharedWindow,
        scene: &SharedScene,
        input: &SharedInput,
    ) {
        let nodes = SceneNodeIndex::default();
        let weak_scene = Rc::downgrade(scene);

        let keyboard = Rc::clone(
            self.keyboard_system
                .get_or_insert_with(|| Rc::new(RefCell::new(KeyboardSystem::new()))),
        );
        keyboard.borrow_mut().attach(Rc::downgrade(input));

        let viewport = Rc::clone(
            self.viewport_system
                .get_or_insert_with(|| Rc::new(RefCell::new(ViewportSystem::new()))),
        );
        viewport
            .borrow_mut()
            .attach(Rc::downgrade(window), weak_scene.clone());

        self.scheduler.add_system(systems::KEYBOARD, keyboard);
        self.scheduler.add_system(
            systems::ADD_SCENE_NODE,
            AddSceneNodeSystem::new(weak_scene.clone(), nodes.clone()),
        );
        self.scheduler.add_system(
            systems::UPDATE_SCENE_NODE,
            UpdateSceneNodeSystem::new(weak_scene.clone(), nodes.clone()),
        );
        self.scheduler.add_system(
            systems::CAMERA,
            CameraSystem::new(weak_scene.clone(), nodes.clone()),
        );
        self.scheduler.add_system(
            systems::LIGHT,
            LightSystem::new(weak_scene.clone(), nodes.clone()),
        );
        self.scheduler
            .add_system(systems::SKY, SkySystem::new(weak_scene.clone()));
        self.scheduler.add_system(
            systems::ENTITY,
            EntitySystem::new(weak_scene.clone(), nodes.clone()),
        );
        // Viewports look up cameras created earlier in the same frame.
        self.scheduler.add_system(systems::VIEWPORT, viewport);
        self.scheduler.add_system(
            systems::REMOVE_SCENE_NODE,
            RemoveSceneNodeSystem::new(weak_scene, nodes),
        );
        self.scheduler
            .add_system(systems::RENDER, RenderSystem::new(Rc::downgrade(root)));
    }

    fn pump_events(&mut self) {
        let Some(root) = &self.root else {
            return;
        };
        let events = root.borrow_mut().pump_messages();
        for event in events {
            if let WindowEvent::Key { key, pressed, .. } = event {
                if let Some(input) = &self.input_manager {
                    if let Err(err) = input.borrow_mut().inject_key(KeyEvent { key, pressed }) {
                        log::warn!("[engine] dropped key event: {err}");
                    }
                }
            }
            match self.events.dispatch(&event) {
                Some(true) => {}
                Some(false) => log::debug!("[engine] window event refused: {event:?}"),
                None => log::debug!("[engine] window event had no listener: {event:?}"),
            }
        }
    }

    fn shutdown_input_manager(&mut self) {
        if let Some(input) = self.input_manager.take() {
            input.borrow_mut().destroy();
        }
    }

    // Reverse of bootstrap. Also used to roll back a failed `init`.
    fn release_resources(&mut self) {
        if !self.scheduler.system_names().is_empty() {
            self.scheduler.shutdown();
        }
        self.shutdown_input_manager();
        self.keyboard_system = None;
        self.viewport_system = None;
        self.scene_manager = None;
        if let Some(window) = self.window.take() {
            let id = window.borrow().id();
            self.events.remove_listeners(id);
            window.borrow_mut().destroy();
        }
        if let Some(root) = self.root.take() {
            root.borrow_mut().release();
        }
        self.services.resources.borrow_mut().clear();
    }
}

fn setup_log(filter: &str) {
    let opened = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init()
        .is_ok();
    if opened {
        log::info!("[engine] log opened with filter '{filter}'");
    }
}
