use super::{ObjectSync, SceneNodeIndex};
use crate::ecs::World;
use crate::engine::schedule::System;
use crate::render::{SceneObject, WeakScene};

/// Mesh resource shown at the entity's scene node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshComponent {
    pub mesh: String,
}

impl MeshComponent {
    pub fn new(mesh: impl Into<String>) -> Self {
        Self { mesh: mesh.into() }
    }
}

pub struct EntitySystem {
    objects: ObjectSync,
}

impl EntitySystem {
    pub fn new(scene: WeakScene, nodes: SceneNodeIndex) -> Self {
        Self {
            objects: ObjectSync::new("mesh", scene, nodes),
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.objects.attached_count()
    }
}

impl System for EntitySystem {
    fn update(&mut self, world: &mut World, _delta_ms: u32) {
        self.objects.sync::<MeshComponent, _>(world, |mesh| SceneObject::Mesh {
            mesh: mesh.mesh.clone(),
        });
    }

    fn shutdown(&mut self, _world: &mut World) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::object_name;
    use crate::systems::test_support::scene;
    use crate::systems::{AddSceneNodeSystem, RemoveSceneNodeSystem, SceneNodeComponent};
    use std::rc::Rc;

    #[test]
    fn despawned_entity_loses_its_mesh() {
        let scene = scene();
        let nodes = SceneNodeIndex::default();
        let mut add = AddSceneNodeSystem::new(Rc::downgrade(&scene), nodes.clone());
        let mut meshes = EntitySystem::new(Rc::downgrade(&scene), nodes.clone());
        let mut remove = RemoveSceneNodeSystem::new(Rc::downgrade(&scene), nodes);

        let mut world = World::new();
        let cell = world.spawn();
        world.insert(cell, SceneNodeComponent::default()).unwrap();
        world.insert(cell, MeshComponent::new("cell.mesh")).unwrap();

        add.update(&mut world, 16);
        meshes.update(&mut world, 16);
        assert_eq!(meshes.mesh_count(), 1);

        world.get_mut::<MeshComponent>(cell).unwrap().mesh = "nucleus.mesh".into();
        meshes.update(&mut world, 16);
        assert_eq!(
            scene.borrow().object(&object_name("mesh", cell)),
            Some(&SceneObject::Mesh {
                mesh: "nucleus.mesh".into()
            })
        );

        world.despawn(cell).unwrap();
        meshes.update(&mut world, 16);
        remove.update(&mut world, 16);
        assert_eq!(meshes.mesh_count(), 0);
        assert_eq!(scene.borrow().node_count(), 1);
    }
}
