use crate::engine::{EngineResult, GraphicsEngine};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

const TARGET_FRAME_MS: u32 = 16;

/// Shared "please stop the main loop" flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct QuitSignal {
    requests: Rc<Cell<u32>>,
}

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quit(&self) {
        self.requests.set(self.requests.get().saturating_add(1));
    }

    pub fn is_quit_requested(&self) -> bool {
        self.requests.get() > 0
    }

    pub fn request_count(&self) -> u32 {
        self.requests.get()
    }

    pub fn reset(&self) {
        self.requests.set(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub quit_requested: bool,
}

/// Main loop driving a `GraphicsEngine` until the game asks to quit.
pub struct Game {
    engine: GraphicsEngine,
    max_frames: Option<u64>,
}

impl Game {
    pub fn new(engine: GraphicsEngine) -> Self {
        Self {
            engine,
            max_frames: None,
        }
    }

    pub fn configure_max_frames(&mut self, frames: u64) {
        self.max_frames = Some(frames.max(1));
    }

    pub fn engine(&self) -> &GraphicsEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GraphicsEngine {
        &mut self.engine
    }

    pub fn into_engine(self) -> GraphicsEngine {
        self.engine
    }

    /// Initialises the engine, hands it to `setup` and then runs frames until
    /// quit is requested or the frame limit is hit. The engine is always shut
    /// down once it was initialised.
    pub fn run<F>(&mut self, setup: F) -> EngineResult<RunSummary>
    where
        F: FnOnce(&mut GraphicsEngine) -> EngineResult<()>,
    {
        self.engine.init()?;
        if let Err(err) = setup(&mut self.engine) {
            log::error!("[game] setup failed: {err}");
            self.engine.shutdown()?;
            return Err(err);
        }

        let frames = self.run_frames();
        let quit_requested = self.engine.quit_signal().is_quit_requested();
        self.engine.shutdown()?;

        let summary = frames.map(|frames| RunSummary {
            frames,
            quit_requested,
        })?;
        log::info!(
            "[game] stopped after {} frames (quit requested: {})",
            summary.frames,
            summary.quit_requested
        );
        Ok(summary)
    }

    fn run_frames(&mut self) -> EngineResult<u64> {
        let quit = self.engine.quit_signal().clone();
        let mut frames = 0u64;
        let mut last_frame = Instant::now();
        while !quit.is_quit_requested() && self.max_frames.is_none_or(|max| frames < max) {
            let now = Instant::now();
            let elapsed =
                u32::try_from(now.duration_since(last_frame).as_millis()).unwrap_or(u32::MAX);
            let delta_ms = if frames == 0 || elapsed == 0 {
                TARGET_FRAME_MS
            } else {
                elapsed
            };
            last_frame = now;

            self.engine.update(delta_ms)?;
            frames += 1;
        }
        Ok(frames)
    }
}
