use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use thrive_engine::ecs::{EcsError, Entity, World};
use thrive_engine::render::{
    Colour, DisplayBackend, DisplayConfigStore, HeadlessBackend, LightKind, LightSettings,
    NodeTransform, RenderServices, TerminalPrompt,
};
use thrive_engine::systems::{
    CameraComponent, LightComponent, SceneNodeComponent, SkyPlaneComponent, ViewportComponent,
};
use thrive_engine::{EngineConfig, EngineResult, Game, GraphicsEngine, QuitSignal, RunSummary};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    frames: Option<u64>,
    headless: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--frames" => {
                let frames = iter.next().ok_or("--frames needs a count")?;
                let frames = frames
                    .parse()
                    .map_err(|_| format!("`{frames}` is not a frame count"))?;
                args.frames = Some(frames);
            }
            "--headless" => args.headless = true,
            other => return Err(format!("unknown argument `{other}`")),
        }
    }
    Ok(args)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[thrive] error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => {
            let dir = path.parent().map(PathBuf::from).unwrap_or_default();
            EngineConfig::from_json_file(path)?.with_manifest_dir(&dir)
        }
        None => EngineConfig::default(),
    };

    let store = DisplayConfigStore::new(config.display_config.clone());
    let backend = select_backend(store, args.headless);
    let engine = GraphicsEngine::new(config, backend, RenderServices::new(), QuitSignal::new());

    match run_game(engine, args.frames)? {
        Some(summary) => println!("[thrive] ran {} frames", summary.frames),
        None => println!("[thrive] display configuration declined"),
    }
    Ok(())
}

/// Runs the game to completion. `None` when the player declined the display
/// configuration, which is not a failure.
fn run_game(engine: GraphicsEngine, frames: Option<u64>) -> EngineResult<Option<RunSummary>> {
    let mut game = Game::new(engine);
    if let Some(frames) = frames {
        game.configure_max_frames(frames);
    }
    match game.run(populate_scene) {
        Ok(summary) => Ok(Some(summary)),
        Err(err) if err.is_graceful_exit() => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(feature = "render-winit")]
fn select_backend(store: DisplayConfigStore, headless: bool) -> Box<dyn DisplayBackend> {
    if headless {
        Box::new(HeadlessBackend::new(store, TerminalPrompt::stdio()))
    } else {
        Box::new(thrive_engine::render::WinitBackend::new(
            store,
            TerminalPrompt::stdio(),
        ))
    }
}

#[cfg(not(feature = "render-winit"))]
fn select_backend(store: DisplayConfigStore, _headless: bool) -> Box<dyn DisplayBackend> {
    Box::new(HeadlessBackend::new(store, TerminalPrompt::stdio()))
}

fn populate_scene(engine: &mut GraphicsEngine) -> EngineResult<()> {
    let world = engine.world_mut();

    let camera = spawn_node(world, [0.0, 0.0, 30.0])?;
    world.insert(camera, CameraComponent::default())?;

    let view = world.spawn();
    world.insert(
        view,
        ViewportComponent {
            background: Colour::rgb(0.0, 0.0, 0.2),
            ..ViewportComponent::new(camera)
        },
    )?;

    let sun = spawn_node(world, [0.0, 100.0, 0.0])?;
    world.insert(
        sun,
        LightComponent {
            settings: LightSettings {
                kind: LightKind::Directional,
                ..LightSettings::default()
            },
        },
    )?;

    let sky = world.spawn();
    world.insert(sky, SkyPlaneComponent::default())?;
    Ok(())
}

fn spawn_node(world: &mut World, position: [f32; 3]) -> Result<Entity, EcsError> {
    let entity = world.spawn();
    world.insert(
        entity,
        SceneNodeComponent {
            parent: None,
            transform: NodeTransform {
                position,
                ..NodeTransform::default()
            },
        },
    )?;
    Ok(entity)
}
