use crate::ecs::{Entity, World};
use crate::engine::schedule::System;
use crate::render::{NodeId, NodeTransform, SceneManager, WeakScene};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Places an entity in the scene graph, optionally under another entity's node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneNodeComponent {
    pub parent: Option<Entity>,
    pub transform: NodeTransform,
}

/// Entity to scene node mapping shared by the node and object systems.
#[derive(Debug, Clone, Default)]
pub struct SceneNodeIndex(Rc<RefCell<BTreeMap<Entity, NodeId>>>);

impl SceneNodeIndex {
    pub fn node(&self, entity: Entity) -> Option<NodeId> {
        self.0.borrow().get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn entries(&self) -> Vec<(Entity, NodeId)> {
        self.0
            .borrow()
            .iter()
            .map(|(entity, node)| (*entity, *node))
            .collect()
    }

    fn insert(&self, entity: Entity, node: NodeId) {
        self.0.borrow_mut().insert(entity, node);
    }

    fn remove(&self, entity: Entity) -> Option<NodeId> {
        self.0.borrow_mut().remove(&entity)
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Creates scene nodes for entities that gained a `SceneNodeComponent`.
pub struct AddSceneNodeSystem {
    scene: WeakScene,
    nodes: SceneNodeIndex,
}

impl AddSceneNodeSystem {
    pub fn new(scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self { scene, nodes }
    }
}

impl System for AddSceneNodeSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        let Some(scene) = self.scene.upgrade() else {
            return;
        };
        let mut scene = scene.borrow_mut();

        let mut pending: Vec<(Entity, SceneNodeComponent)> = world
            .query::<SceneNodeComponent>()
            .into_iter()
            .filter(|(entity, _)| self.nodes.node(*entity).is_none())
            .map(|(entity, component)| (entity, *component))
            .collect();

        // Parents first. Whatever is left waits on a parent that will never
        // get a node and goes under the root.
        while !pending.is_empty() {
            let before = pending.len();
            let mut blocked = Vec::new();
            for (entity, component) in pending {
                let parent = match component.parent {
                    None => Some(scene.root_node()),
                    Some(parent) => self.nodes.node(parent),
                };
                match parent {
                    Some(parent) => self.create(&mut *scene, entity, parent, component.transform),
                    None => blocked.push((entity, component)),
                }
            }
            if blocked.len() == before {
                let root = scene.root_node();
                for (entity, component) in blocked {
                    log::debug!("[systems] parent of {entity:?} has no scene node, using root");
                    self.create(&mut *scene, entity, root, component.transform);
                }
                break;
            }
            pending = blocked;
        }
    }
}

impl AddSceneNodeSystem {
    fn create(
        &self,
        scene: &mut dyn SceneManager,
        entity: Entity,
        parent: NodeId,
        transform: NodeTransform,
    ) {
        let node = match scene.create_child_node(parent) {
            Ok(node) => node,
            Err(err) => {
                log::warn!("[systems] scene node for {entity:?} not created: {err}");
                return;
            }
        };
        if let Err(err) = scene.set_transform(node, transform) {
            log::warn!("[systems] initial transform for {entity:?} rejected: {err}");
        }
        self.nodes.insert(entity, node);
    }
}

/// Copies changed transforms onto their scene nodes.
pub struct UpdateSceneNodeSystem {
    scene: WeakScene,
    nodes: SceneNodeIndex,
}

impl UpdateSceneNodeSystem {
    pub fn new(scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self { scene, nodes }
    }
}

impl System for UpdateSceneNodeSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        let Some(scene) = self.scene.upgrade() else {
            return;
        };
        let mut scene = scene.borrow_mut();
        for (entity, component) in world.query::<SceneNodeComponent>() {
            let Some(node) = self.nodes.node(entity) else {
                continue;
            };
            if scene.transform(node) == Some(component.transform) {
                continue;
            }
            if let Err(err) = scene.set_transform(node, component.transform) {
                log::warn!("[systems] transform for {entity:?} rejected: {err}");
            }
        }
    }
}

/// Destroys nodes of entities that lost their `SceneNodeComponent`.
pub struct RemoveSceneNodeSystem {
    scene: WeakScene,
    nodes: SceneNodeIndex,
}

impl RemoveSceneNodeSystem {
    pub fn new(scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self { scene, nodes }
    }
}

impl System for RemoveSceneNodeSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        let Some(scene) = self.scene.upgrade() else {
            return;
        };
        let mut scene = scene.borrow_mut();
        for (entity, node) in self.nodes.entries() {
            if world.has::<SceneNodeComponent>(entity) {
                continue;
            }
            self.nodes.remove(entity);
            match scene.destroy_node(node) {
                Ok(()) => log::debug!("[systems] destroyed scene node of {entity:?}"),
                Err(err) => log::debug!("[systems] node of {entity:?} already gone: {err}"),
            }
        }
        // Destroying a parent takes its children along; forget those so they
        // are recreated next frame.
        for (entity, node) in self.nodes.entries() {
            if scene.transform(node).is_none() {
                self.nodes.remove(entity);
            }
        }
    }

    fn shutdown(&mut self, _world: &mut World) {
        if let Some(scene) = self.scene.upgrade() {
            let mut scene = scene.borrow_mut();
            for (entity, node) in self.nodes.entries() {
                if let Err(err) = scene.destroy_node(node) {
                    log::debug!("[systems] node of {entity:?} already gone: {err}");
                }
            }
        }
        self.nodes.clear();
    }
}
