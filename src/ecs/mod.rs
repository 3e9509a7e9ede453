use std::any::{Any, TypeId};
use std::collections::HashMap;
use thiserror::Error;

/// Handle referencing an entity within the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Default)]
struct EntitySlot {
    generation: u32,
    alive: bool,
}

/// Marker trait for types that can be stored as components.
pub trait Component: Any {}

impl<T: Any> Component for T {}

trait ErasedTable {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn evict(&mut self, entity: Entity);
}

struct Table<T: Component> {
    rows: HashMap<Entity, T>,
}

impl<T: Component> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<T: Component> ErasedTable for Table<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn evict(&mut self, entity: Entity) {
        self.rows.remove(&entity);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {0:?} is not alive in this world")]
    NoSuchEntity(Entity),
}

/// Entity manager shared by every registered system.
#[derive(Default)]
pub struct World {
    slots: Vec<EntitySlot>,
    free_list: Vec<u32>,
    tables: HashMap<TypeId, Box<dyn ErasedTable>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return Entity::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(EntitySlot {
            generation: 0,
            alive: true,
        });
        Entity::new(index, 0)
    }

    pub fn despawn(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        let slot = &mut self.slots[entity.index as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        for table in self.tables.values_mut() {
            table.evict(entity);
        }
        self.free_list.push(entity.index);
        Ok(())
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<Option<T>, EcsError> {
        self.ensure_alive(entity)?;
        Ok(self.table_or_create::<T>().rows.insert(entity, component))
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.table_mut::<T>()?.rows.remove(&entity)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.contains(entity) {
            return None;
        }
        self.table::<T>()?.rows.get(&entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.contains(entity) {
            return None;
        }
        self.table_mut::<T>()?.rows.get_mut(&entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Entities carrying `T`, sorted so iteration order is stable across frames.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        let mut entities = self
            .table::<T>()
            .map(|table| table.rows.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        entities.sort();
        entities
    }

    pub fn query<T: Component>(&self) -> Vec<(Entity, &T)> {
        let Some(table) = self.table::<T>() else {
            return Vec::new();
        };
        let mut rows = table
            .rows
            .iter()
            .map(|(entity, value)| (*entity, value))
            .collect::<Vec<_>>();
        rows.sort_by_key(|(entity, _)| *entity);
        rows
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.contains(entity) {
            Ok(())
        } else {
            Err(EcsError::NoSuchEntity(entity))
        }
    }

    fn table<T: Component>(&self) -> Option<&Table<T>> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|table| table.as_any().downcast_ref::<Table<T>>())
    }

    fn table_mut<T: Component>(&mut self) -> Option<&mut Table<T>> {
        self.tables
            .get_mut(&TypeId::of::<T>())
            .and_then(|table| table.as_any_mut().downcast_mut::<Table<T>>())
    }

    fn table_or_create<T: Component>(&mut self) -> &mut Table<T> {
        self.tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Table::<T>::default()))
            .as_any_mut()
            .downcast_mut::<Table<T>>()
            .expect("table registered under its own type id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Heading(f32);

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);

    #[test]
    fn components_are_stored_per_type() {
        let mut world = World::new();
        let camera = world.spawn();
        assert_eq!(world.insert(camera, Heading(90.0)), Ok(None));
        assert_eq!(world.insert(camera, Heading(45.0)), Ok(Some(Heading(90.0))));

        assert_eq!(world.get::<Heading>(camera), Some(&Heading(45.0)));
        assert!(world.has::<Heading>(camera));
        assert!(!world.has::<Label>(camera));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn despawn_evicts_components_and_bumps_generation() {
        let mut world = World::new();
        let first = world.spawn();
        world.insert(first, Label("camera")).unwrap();

        world.despawn(first).unwrap();
        assert!(world.get::<Label>(first).is_none());
        assert!(world.entities_with::<Label>().is_empty());

        let second = world.spawn();
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(!world.contains(first));
    }

    #[test]
    fn remove_returns_component() {
        let mut world = World::new();
        let entity = world.spawn();
        world.insert(entity, Label("sky")).unwrap();

        assert_eq!(world.remove::<Label>(entity), Some(Label("sky")));
        assert!(world.contains(entity));
        assert!(!world.has::<Label>(entity));
    }

    #[test]
    fn query_is_sorted_by_entity() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.insert(b, Label("b")).unwrap();
        world.insert(a, Label("a")).unwrap();

        let labels = world
            .query::<Label>()
            .into_iter()
            .map(|(_, label)| label.0)
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn insert_on_stale_entity_fails() {
        let mut world = World::new();
        let stale = Entity::new(7, 3);

        let err = world.insert(stale, Label("x")).unwrap_err();
        assert_eq!(err, EcsError::NoSuchEntity(stale));
    }
}
