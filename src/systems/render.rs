use crate::ecs::World;
use crate::engine::schedule::System;
use crate::render::WeakRoot;

/// Renders one frame through the display root. Runs last.
pub struct RenderSystem {
    root: WeakRoot,
    frames: u64,
}

impl RenderSystem {
    pub fn new(root: WeakRoot) -> Self {
        Self { root, frames: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl System for RenderSystem {
    fn update(&mut self, _world: &mut World, _delta_ms: u32) {
        let Some(root) = self.root.upgrade() else {
            return;
        };
        match root.borrow_mut().render_one_frame() {
            Ok(()) => self.frames += 1,
            Err(err) => log::error!("[systems] frame {} failed to render: {err}", self.frames),
        }
    }

    fn shutdown(&mut self, _world: &mut World) {
        log::debug!("[systems] rendered {} frames", self.frames);
    }
}
