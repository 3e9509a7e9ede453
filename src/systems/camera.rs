use super::{ObjectSync, SceneNodeIndex, object_name};
use crate::ecs::{Entity, World};
use crate::engine::schedule::System;
use crate::render::{CameraSettings, SceneObject, WeakScene};

const PREFIX: &str = "camera";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraComponent {
    pub settings: CameraSettings,
}

/// Scene object name of the camera belonging to `entity`.
pub fn camera_object_name(entity: Entity) -> String {
    object_name(PREFIX, entity)
}

/// Attaches a camera to the scene node of every entity with a `CameraComponent`.
pub struct CameraSystem {
    objects: ObjectSync,
}

impl CameraSystem {
    pub fn new(scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self {
            objects: ObjectSync::new(PREFIX, scene, nodes),
        }
    }

    pub fn camera_count(&self) -> usize {
        self.objects.attached_count()
    }
}

impl System for CameraSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        self.objects
            .sync::<CameraComponent, _>(world, |camera| SceneObject::Camera(camera.settings));
    }

    fn shutdown(&mut self, _world: &mut World) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::test_support::scene;
    use crate::systems::{AddSceneNodeSystem, SceneNodeComponent};
    use std::rc::Rc;

    #[test]
    fn camera_follows_component_changes() {
        let scene = scene();
        let nodes = SceneNodeIndex::default();
        let mut add = AddSceneNodeSystem::new(Rc::downgrade(&scene), nodes.clone());
        let mut cameras = CameraSystem::new(Rc::downgrade(&scene), nodes.clone());

        let mut world = World::new();
        let entity = world.spawn();
        world.insert(entity, SceneNodeComponent::default()).unwrap();
        world.insert(entity, CameraComponent::default()).unwrap();

        add.update(&mut world, 16);
        cameras.update(&mut world, 16);
        let name = camera_object_name(entity);
        assert_eq!(
            scene.borrow().object(&name),
            Some(&SceneObject::Camera(CameraSettings::default()))
        );

        world.get_mut::<CameraComponent>(entity).unwrap().settings.far_clip = 500.0;
        cameras.update(&mut world, 16);
        match scene.borrow().object(&name) {
            Some(SceneObject::Camera(settings)) => assert_eq!(settings.far_clip, 500.0),
            other => panic!("unexpected object {other:?}"),
        }

        world.remove::<CameraComponent>(entity);
        cameras.update(&mut world, 16);
        assert!(scene.borrow().object(&name).is_none());
        assert_eq!(cameras.camera_count(), 0);
    }

    #[test]
    fn camera_waits_for_its_scene_node() {
        let scene = scene();
        let nodes = SceneNodeIndex::default();
        let mut cameras = CameraSystem::new(Rc::downgrade(&scene), nodes);

        let mut world = World::new();
        let entity = world.spawn();
        world.insert(entity, CameraComponent::default()).unwrap();

        cameras.update(&mut world, 16);
        assert!(scene.borrow().object(&camera_object_name(entity)).is_none());
    }
}
