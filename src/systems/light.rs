use super::{ObjectSync, SceneNodeIndex};
use crate::ecs::World;
use crate::engine::schedule::System;
use crate::render::{LightSettings, SceneObject, WeakScene};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightComponent {
    pub settings: LightSettings,
}

pub struct LightSystem {
    objects: ObjectSync,
}

impl LightSystem {
    pub fn new(scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self {
            objects: ObjectSync::new("light", scene, nodes),
        }
    }

    pub fn light_count(&self) -> usize {
        self.objects.attached_count()
    }
}

impl System for LightSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        self.objects
            .sync::<LightComponent, _>(world, |light| SceneObject::Light(light.settings));
    }

    fn shutdown(&mut self, _world: &mut World) {
        self.objects.clear();
    }
}
