//! Per-frame systems that mirror ECS components into the display layer.
//!
//! The engine registers them in the order of the name constants below.

mod camera;
mod entity;
mod keyboard;
mod light;
mod render;
mod scene_node;
mod sky;
mod viewport;

pub use camera::{CameraComponent, CameraSystem, camera_object_name};
pub use entity::{EntitySystem, MeshComponent};
pub use keyboard::KeyboardSystem;
pub use light::{LightComponent, LightSystem};
pub use render::RenderSystem;
pub use scene_node::{
    AddSceneNodeSystem, RemoveSceneNodeSystem, SceneNodeComponent, SceneNodeIndex,
    UpdateSceneNodeSystem,
};
pub use sky::{SkyPlaneComponent, SkySystem};
pub use viewport::{ViewportComponent, ViewportSystem};

use crate::ecs::{Component, Entity, World};
use crate::render::{NodeId, SceneObject, WeakScene};
use std::collections::{BTreeMap, BTreeSet};

pub const KEYBOARD: &str = "keyboard";
pub const ADD_SCENE_NODE: &str = "add_scene_node";
pub const UPDATE_SCENE_NODE: &str = "update_scene_node";
pub const CAMERA: &str = "camera";
pub const LIGHT: &str = "light";
pub const SKY: &str = "sky";
pub const ENTITY: &str = "entity";
pub const VIEWPORT: &str = "viewport";
pub const REMOVE_SCENE_NODE: &str = "remove_scene_node";
pub const RENDER: &str = "render";

pub const SYSTEM_ORDER: [&str; 10] = [
    KEYBOARD,
    ADD_SCENE_NODE,
    UPDATE_SCENE_NODE,
    CAMERA,
    LIGHT,
    SKY,
    ENTITY,
    VIEWPORT,
    REMOVE_SCENE_NODE,
    RENDER,
];

pub(crate) fn object_name(prefix: &str, entity: Entity) -> String {
    format!("{prefix}-{}-{}", entity.index(), entity.generation())
}

/// Keeps one named scene object per entity in step with a component type.
pub(crate) struct ObjectSync {
    prefix: &'static str,
    scene: WeakScene,
    nodes: SceneNodeIndex,
    attached: BTreeMap<Entity, (NodeId, SceneObject)>,
}

impl ObjectSync {
    pub(crate) fn new(prefix: &'static str, scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self {
            prefix,
            scene,
            nodes,
            attached: BTreeMap::new(),
        }
    }

    pub(crate) fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Attaches new objects, re-attaches changed ones and detaches objects
    /// whose entity lost its component or its scene node.
    pub(crate) fn sync<C, F>(&mut self, world: &World, to_object: F)
    where
        C: Component,
        F: Fn(&C) -> SceneObject,
    {
        let Some(scene) = self.scene.upgrade() else {
            return;
        };
        let mut scene = scene.borrow_mut();
        let mut seen = BTreeSet::new();

        for (entity, component) in world.query::<C>() {
            // Node appears once the add-scene-node system has run for it.
            let Some(node) = self.nodes.node(entity) else {
                continue;
            };
            seen.insert(entity);
            let object = to_object(component);
            if let Some((attached_node, attached)) = self.attached.get(&entity) {
                if *attached_node == node && *attached == object {
                    continue;
                }
            }
            let name = object_name(self.prefix, entity);
            match scene.attach_object(&name, node, object.clone()) {
                Ok(()) => {
                    log::debug!("[systems] attached {name} to node {node:?}");
                    self.attached.insert(entity, (node, object));
                }
                Err(err) => log::warn!("[systems] could not attach {name}: {err}"),
            }
        }

        let stale: Vec<Entity> = self
            .attached
            .keys()
            .filter(|entity| !seen.contains(entity))
            .copied()
            .collect();
        for entity in stale {
            self.attached.remove(&entity);
            let name = object_name(self.prefix, entity);
            if scene.detach_object(&name).is_some() {
                log::debug!("[systems] detached {name}");
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        if let Some(scene) = self.scene.upgrade() {
            let mut scene = scene.borrow_mut();
            for entity in self.attached.keys() {
                scene.detach_object(&object_name(self.prefix, *entity));
            }
        }
        self.attached.clear();
    }
}
