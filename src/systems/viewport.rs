use super::camera_object_name;
use crate::ecs::{Entity, World};
use crate::engine::schedule::System;
use crate::render::{Colour, SceneObject, Viewport, WeakScene, WeakWindow};
use std::collections::{BTreeMap, BTreeSet};

/// Requests a viewport on the engine window showing `camera`'s view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportComponent {
    pub camera: Entity,
    pub z_order: i32,
    pub background: Colour,
}

impl ViewportComponent {
    pub fn new(camera: Entity) -> Self {
        Self {
            camera,
            z_order: 0,
            background: Colour::BLACK,
        }
    }
}

/// Keeps the window's viewports in step with `ViewportComponent`s.
///
/// A viewport is only added once its camera exists in the scene, so this
/// system has to run after the camera system.
#[derive(Default)]
pub struct ViewportSystem {
    window: Option<WeakWindow>,
    scene: Option<WeakScene>,
    active: BTreeMap<i32, Viewport>,
}

impl ViewportSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, window: WeakWindow, scene: WeakScene) {
        self.window = Some(window);
        self.scene = Some(scene);
        self.active.clear();
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.active.values().cloned().collect()
    }
}

impl System for ViewportSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        let (Some(window), Some(scene)) = (
            self.window.as_ref().and_then(|window| window.upgrade()),
            self.scene.as_ref().and_then(|scene| scene.upgrade()),
        ) else {
            return;
        };
        let scene = scene.borrow();
        let mut window = window.borrow_mut();
        let mut wanted = BTreeSet::new();

        for (entity, component) in world.query::<ViewportComponent>() {
            let camera = camera_object_name(component.camera);
            if !matches!(scene.object(&camera), Some(SceneObject::Camera(_))) {
                log::debug!("[systems] viewport of {entity:?} waits for camera {camera}");
                continue;
            }
            wanted.insert(component.z_order);
            let viewport = Viewport {
                z_order: component.z_order,
                camera,
                background: component.background,
            };
            if self.active.get(&component.z_order) == Some(&viewport) {
                continue;
            }
            match window.add_viewport(viewport.clone()) {
                Ok(()) => {
                    self.active.insert(component.z_order, viewport);
                }
                Err(err) => log::warn!("[systems] viewport for {entity:?} not added: {err}"),
            }
        }

        let stale: Vec<i32> = self
            .active
            .keys()
            .filter(|z_order| !wanted.contains(z_order))
            .copied()
            .collect();
        for z_order in stale {
            self.active.remove(&z_order);
            window.remove_viewport(z_order);
        }
    }

    fn shutdown(&mut self, _world: &mut World) {
        if let Some(window) = self.window.take().and_then(|window| window.upgrade()) {
            let mut window = window.borrow_mut();
            for z_order in self.active.keys() {
                window.remove_viewport(*z_order);
            }
        }
        self.scene = None;
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginManifest;
    use crate::render::{
        CameraSettings, DisplayBackend, DisplayConfigStore, DisplayRoot, HeadlessBackend,
        ScriptedPrompt, SharedWindow,
    };
    use crate::systems::test_support::scene;
    use std::rc::Rc;

    fn window() -> (SharedWindow, Box<dyn DisplayRoot>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = DisplayConfigStore::new(dir.path().join("display.json"));
        let mut backend = HeadlessBackend::new(store, ScriptedPrompt::AcceptProposed);
        let mut root = backend.create_root(&PluginManifest::default()).unwrap();
        assert!(root.show_config_dialog());
        let window = root.initialise("viewport test").unwrap();
        (window, root, dir)
    }

    #[test]
    fn viewport_appears_once_camera_exists_and_leaves_with_component() {
        let (window, _root, _dir) = window();
        let scene = scene();
        let mut system = ViewportSystem::new();
        system.attach(Rc::downgrade(&window), Rc::downgrade(&scene));

        let mut world = World::new();
        let camera = world.spawn();
        let view = world.spawn();
        world.insert(view, ViewportComponent::new(camera)).unwrap();

        system.update(&mut world, 16);
        assert!(window.borrow().viewports().is_empty());

        let root_node = scene.borrow().root_node();
        scene
            .borrow_mut()
            .attach_object(
                &camera_object_name(camera),
                root_node,
                SceneObject::Camera(CameraSettings::default()),
            )
            .unwrap();
        system.update(&mut world, 16);
        let viewports = window.borrow().viewports();
        assert_eq!(viewports.len(), 1);
        assert_eq!(viewports[0].camera, camera_object_name(camera));
        assert_eq!(system.viewports(), viewports);

        world.remove::<ViewportComponent>(view);
        system.update(&mut world, 16);
        assert!(window.borrow().viewports().is_empty());
    }

    #[test]
    fn shutdown_removes_active_viewports() {
        let (window, _root, _dir) = window();
        let scene = scene();
        let mut system = ViewportSystem::new();
        system.attach(Rc::downgrade(&window), Rc::downgrade(&scene));

        let mut world = World::new();
        let camera = world.spawn();
        let root_node = scene.borrow().root_node();
        scene
            .borrow_mut()
            .attach_object(
                &camera_object_name(camera),
                root_node,
                SceneObject::Camera(CameraSettings::default()),
            )
            .unwrap();
        for z_order in [0, 1] {
            let view = world.spawn();
            let component = ViewportComponent {
                z_order,
                ..ViewportComponent::new(camera)
            };
            world.insert(view, component).unwrap();
        }

        system.update(&mut world, 16);
        assert_eq!(window.borrow().viewports().len(), 2);

        system.shutdown(&mut world);
        assert!(window.borrow().viewports().is_empty());
        assert!(system.viewports().is_empty());
    }
}
