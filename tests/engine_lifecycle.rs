use std::fs;
use std::rc::Rc;
use tempfile::TempDir;
use thrive_engine::engine::EngineError;
use thrive_engine::input::KeyCode;
use thrive_engine::render::{
    Colour, DisplayConfigStore, HeadlessBackend, HeadlessEvents, HeadlessJournal, RenderServices,
    RenderWindow, RootCall, SceneManager, ScriptedPrompt, WindowEvent, WindowId,
};
use thrive_engine::systems::{
    CameraComponent, SYSTEM_ORDER, SceneNodeComponent, ViewportComponent, camera_object_name,
};
use thrive_engine::{EngineConfig, EngineState, Game, GraphicsEngine, QuitSignal};

struct Fixture {
    journal: HeadlessJournal,
    events: HeadlessEvents,
    engine: GraphicsEngine,
}

fn write_manifests(dir: &TempDir) {
    let media = dir.path().join("media");
    fs::create_dir_all(&media).unwrap();
    fs::write(media.join("cell.mesh"), b"mesh").unwrap();
    fs::write(media.join("membrane.material"), b"material").unwrap();

    fs::write(
        dir.path().join("plugins.cfg"),
        "# Defines plugins to load\n\
         PluginFolder=.\n\
         Plugin=RenderSystem_GL\n\
         Plugin=Plugin_OctreeSceneManager\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("resources.cfg"),
        "# Resource locations\n[General]\nFileSystem=media\n",
    )
    .unwrap();
}

fn config_in(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        plugins_manifest: dir.path().join("plugins.cfg"),
        resources_manifest: dir.path().join("resources.cfg"),
        display_config: dir.path().join("display.json"),
        ..EngineConfig::default()
    }
}

fn engine_in(config: EngineConfig, prompt: ScriptedPrompt) -> Fixture {
    let store = DisplayConfigStore::new(config.display_config.clone());
    let backend = HeadlessBackend::new(store, prompt);
    let journal = backend.journal();
    let events = backend.events();
    let engine = GraphicsEngine::new(
        config,
        Box::new(backend),
        RenderServices::new(),
        QuitSignal::new(),
    );
    Fixture {
        journal,
        events,
        engine,
    }
}

fn fixture(prompt: ScriptedPrompt) -> (TempDir, Fixture) {
    let dir = tempfile::tempdir().unwrap();
    write_manifests(&dir);
    let fixture = engine_in(config_in(&dir), prompt);
    (dir, fixture)
}

#[test]
fn init_then_shutdown_leaves_no_live_handles() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    let engine = &mut fx.engine;

    assert!(engine.root().is_none());
    assert!(engine.window().is_none());
    assert!(engine.scene_manager().is_none());
    assert!(engine.input_manager().is_none());
    assert!(engine.keyboard_system().is_none());
    assert!(engine.viewport_system().is_none());
    engine.init().unwrap();
    assert_eq!(engine.state(), EngineState::Initialized);

    let window = Rc::clone(engine.window().expect("window"));
    let input = Rc::clone(engine.input_manager().expect("input manager"));
    let keyboard = Rc::clone(engine.keyboard_system().expect("keyboard system"));
    assert!(engine.root().is_some());
    assert!(engine.scene_manager().is_some());
    assert!(engine.viewport_system().is_some());
    assert_eq!(window.borrow().title(), "Thrive");

    engine.shutdown().unwrap();
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert!(engine.root().is_none());
    assert!(engine.window().is_none());
    assert!(engine.scene_manager().is_none());
    assert!(engine.input_manager().is_none());
    assert!(engine.keyboard_system().is_none());
    assert!(engine.viewport_system().is_none());

    assert!(window.borrow().is_closed());
    assert!(input.borrow().is_destroyed());
    assert_eq!(Rc::strong_count(&keyboard), 1);
    assert!(engine.scheduler().system_names().is_empty());
    assert_eq!(fx.journal.count(|call| *call == RootCall::Released), 1);
}

#[test]
fn systems_are_registered_in_order_with_viewport_after_camera() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();

    let names = fx.engine.scheduler().system_names();
    assert_eq!(names, SYSTEM_ORDER.to_vec());
    let camera = names.iter().position(|name| *name == "camera").unwrap();
    let viewport = names.iter().position(|name| *name == "viewport").unwrap();
    assert!(camera < viewport);
    assert_eq!(names.last(), Some(&"render"));
}

#[test]
fn bootstrap_follows_the_documented_order() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();

    assert_eq!(
        fx.journal.calls(),
        vec![
            RootCall::Created {
                plugins: vec![
                    "RenderSystem_GL".to_string(),
                    "Plugin_OctreeSceneManager".to_string()
                ],
            },
            RootCall::RestoreConfig { restored: false },
            RootCall::ConfigDialog { accepted: true },
            RootCall::Initialise {
                title: "Thrive".to_string()
            },
            RootCall::CreateSceneManager {
                kind: "DefaultSceneManager".to_string()
            },
        ]
    );
}

#[test]
fn services_and_scene_defaults_are_applied() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();

    let services = fx.engine.services();
    assert_eq!(services.textures.borrow().default_num_mipmaps(), 5);
    let resources = services.resources.borrow();
    assert!(resources.is_initialised("General"));
    assert_eq!(resources.resources("General"), vec!["cell.mesh", "membrane.material"]);
    drop(resources);

    let scene = fx.engine.scene_manager().unwrap().borrow();
    assert_eq!(scene.kind(), "DefaultSceneManager");
    assert_eq!(scene.ambient_light(), Colour::grey(0.5));
    drop(scene);

    let handle = fx.engine.window().unwrap().borrow().native_handle();
    let input = fx.engine.input_manager().unwrap().borrow();
    assert_eq!(Some(input.window_handle()), handle);
}

#[test]
fn declining_configuration_creates_no_window_and_exits_gracefully() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::Decline);

    let err = fx.engine.init().unwrap_err();
    assert!(matches!(err, EngineError::ConfigurationDeclined));
    assert!(err.is_graceful_exit());

    assert_eq!(
        fx.journal
            .count(|call| matches!(call, RootCall::Initialise { .. })),
        0
    );
    assert_eq!(fx.engine.state(), EngineState::Uninitialized);
    assert!(fx.engine.root().is_none());
    assert!(fx.engine.window().is_none());
    assert!(fx.engine.input_manager().is_none());
}

#[test]
fn saved_configuration_is_restored_without_prompting() {
    let dir = tempfile::tempdir().unwrap();
    write_manifests(&dir);

    let mut first = engine_in(config_in(&dir), ScriptedPrompt::AcceptProposed);
    first.engine.init().unwrap();
    first.engine.shutdown().unwrap();

    let mut second = engine_in(config_in(&dir), ScriptedPrompt::Decline);
    second.engine.init().unwrap();
    assert_eq!(
        second
            .journal
            .count(|call| matches!(call, RootCall::ConfigDialog { .. })),
        0
    );
    assert_eq!(
        second
            .journal
            .count(|call| *call == RootCall::RestoreConfig { restored: true }),
        1
    );
}

#[test]
fn lifecycle_misuse_is_rejected() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    let engine = &mut fx.engine;

    assert!(matches!(
        engine.update(16),
        Err(EngineError::InvalidState {
            operation: "update",
            state: EngineState::Uninitialized
        })
    ));
    assert!(matches!(engine.shutdown(), Err(EngineError::InvalidState { .. })));

    engine.init().unwrap();
    assert!(matches!(
        engine.init(),
        Err(EngineError::InvalidState {
            operation: "init",
            state: EngineState::Initialized
        })
    ));
    assert_eq!(engine.state(), EngineState::Initialized);

    engine.shutdown().unwrap();
    assert!(matches!(engine.update(16), Err(EngineError::InvalidState { .. })));
}

#[test]
fn close_event_requests_quit_once_per_event() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();
    let window = fx.engine.window().unwrap().borrow().id();
    let quit = fx.engine.quit_signal().clone();

    fx.events.push(WindowEvent::Resized {
        window,
        width: 800,
        height: 600,
    });
    fx.engine.update(16).unwrap();
    assert!(!quit.is_quit_requested());

    fx.events.push(WindowEvent::CloseRequested(window));
    fx.engine.update(16).unwrap();
    assert_eq!(quit.request_count(), 1);

    fx.engine.update(16).unwrap();
    assert_eq!(quit.request_count(), 1);
}

#[test]
fn key_events_reach_the_keyboard_system() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();
    let window = fx.engine.window().unwrap().borrow().id();

    fx.events.push(WindowEvent::Key {
        window,
        key: KeyCode::Escape,
        pressed: true,
    });
    fx.engine.update(16).unwrap();

    let keyboard = fx.engine.keyboard_system().unwrap().borrow();
    assert!(keyboard.was_pressed(KeyCode::Escape));
    assert!(keyboard.is_key_down(KeyCode::Escape));
}

#[test]
fn camera_entity_gets_a_viewport_and_frames_are_rendered() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();

    let world = fx.engine.world_mut();
    let camera = world.spawn();
    world.insert(camera, SceneNodeComponent::default()).unwrap();
    world.insert(camera, CameraComponent::default()).unwrap();
    let view = world.spawn();
    world.insert(view, ViewportComponent::new(camera)).unwrap();

    fx.engine.update(16).unwrap();

    let viewports = fx.engine.window().unwrap().borrow().viewports();
    assert_eq!(viewports.len(), 1);
    assert_eq!(viewports[0].camera, camera_object_name(camera));
    assert_eq!(
        fx.engine.viewport_system().unwrap().borrow().viewports(),
        viewports
    );
    assert_eq!(fx.journal.count(|call| *call == RootCall::RenderFrame), 1);

    let window = Rc::clone(fx.engine.window().unwrap());
    fx.engine.shutdown().unwrap();
    assert!(window.borrow().viewports().is_empty());
}

#[test]
fn engine_can_be_initialised_again_after_shutdown() {
    let (_dir, mut fx) = fixture(ScriptedPrompt::AcceptProposed);
    fx.engine.init().unwrap();
    fx.engine.shutdown().unwrap();

    fx.engine.init().unwrap();
    assert_eq!(fx.engine.scheduler().system_names().len(), SYSTEM_ORDER.len());
    assert!(fx.engine.keyboard_system().is_some());
    assert!(fx.engine.viewport_system().is_some());
    fx.engine.update(16).unwrap();
    fx.engine.shutdown().unwrap();
}

#[test]
fn failed_init_rolls_back_the_display_root() {
    let dir = tempfile::tempdir().unwrap();
    write_manifests(&dir);
    let config = EngineConfig {
        scene_manager_type: "PortalSceneManager".to_string(),
        ..config_in(&dir)
    };
    let mut fx = engine_in(config, ScriptedPrompt::AcceptProposed);

    let err = fx.engine.init().unwrap_err();
    assert!(!err.is_graceful_exit());
    assert_eq!(fx.engine.state(), EngineState::Uninitialized);
    assert!(fx.engine.window().is_none());
    assert_eq!(fx.journal.count(|call| *call == RootCall::Released), 1);
}

#[test]
fn missing_resource_manifest_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_manifests(&dir);
    fs::remove_file(dir.path().join("resources.cfg")).unwrap();
    let mut fx = engine_in(config_in(&dir), ScriptedPrompt::AcceptProposed);

    assert!(matches!(fx.engine.init(), Err(EngineError::Manifest(_))));
    assert_eq!(
        fx.journal
            .count(|call| matches!(call, RootCall::Initialise { .. })),
        0
    );
}

#[test]
fn game_loop_stops_on_window_close() {
    let (_dir, fx) = fixture(ScriptedPrompt::AcceptProposed);
    let journal = fx.journal.clone();
    fx.events.push(WindowEvent::CloseRequested(WindowId(1)));

    let mut game = Game::new(fx.engine);
    game.configure_max_frames(100);
    let summary = game.run(|_| Ok(())).unwrap();

    assert_eq!(summary.frames, 1);
    assert!(summary.quit_requested);
    assert_eq!(game.engine().state(), EngineState::Uninitialized);
    assert_eq!(journal.count(|call| *call == RootCall::RenderFrame), 1);
}

#[test]
fn game_loop_honours_the_frame_limit() {
    let (_dir, fx) = fixture(ScriptedPrompt::AcceptProposed);
    let journal = fx.journal.clone();

    let mut game = Game::new(fx.engine);
    game.configure_max_frames(3);
    let summary = game
        .run(|engine| {
            let world = engine.world_mut();
            let node = world.spawn();
            world.insert(node, SceneNodeComponent::default())?;
            Ok(())
        })
        .unwrap();

    assert_eq!(summary.frames, 3);
    assert!(!summary.quit_requested);
    assert_eq!(journal.count(|call| *call == RootCall::RenderFrame), 3);
}

#[test]
fn failed_setup_shuts_the_engine_down() {
    let (_dir, fx) = fixture(ScriptedPrompt::AcceptProposed);
    let journal = fx.journal.clone();

    let mut game = Game::new(fx.engine);
    let err = game
        .run(|engine| {
            let world = engine.world_mut();
            let gone = world.spawn();
            world.despawn(gone)?;
            world.insert(gone, SceneNodeComponent::default())?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, EngineError::World(_)));
    assert_eq!(game.engine().state(), EngineState::Uninitialized);
    assert_eq!(journal.count(|call| *call == RootCall::RenderFrame), 0);
    assert_eq!(journal.count(|call| *call == RootCall::Released), 1);
}
