pub mod config;
pub mod ecs;
pub mod engine;
pub mod game;
pub mod input;
pub mod render;
pub mod systems;

pub use config::EngineConfig;
pub use engine::{EngineError, EngineResult, EngineState, GraphicsEngine};
pub use game::{Game, QuitSignal, RunSummary};
