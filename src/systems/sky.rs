use crate::ecs::World;
use crate::engine::schedule::System;
use crate::render::{SkyPlane, WeakScene};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkyPlaneComponent {
    pub plane: SkyPlane,
}

/// Applies the first sky plane component found to the scene manager.
pub struct SkySystem {
    scene: WeakScene,
    applied: Option<SkyPlane>,
}

impl SkySystem {
    pub fn new(scene: WeakScene) -> Self {
        Self {
            scene,
            applied: None,
        }
    }
}

impl System for SkySystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        let desired = world
            .query::<SkyPlaneComponent>()
            .first()
            .map(|(_, sky)| sky.plane.clone());
        if desired == self.applied {
            return;
        }
        let Some(scene) = self.scene.upgrade() else {
            return;
        };
        log::debug!("[systems] sky plane set to {desired:?}");
        scene.borrow_mut().set_sky_plane(desired.clone());
        self.applied = desired;
    }

    fn shutdown(&mut self, _world: &mut World) {
        if self.applied.take().is_some() {
            if let Some(scene) = self.scene.upgrade() {
                scene.borrow_mut().set_sky_plane(None);
            }
        }
    }
}
