// registry.rs - Component type registry and pool owner
//
// Ids are assigned in registration order and never reassigned. Pools and
// metadata are stored in parallel vectors indexed by `ComponentId::index`,
// so id -> pool lookup is a bounds-checked index plus one downcast.

use crate::ecs::storage::{ComponentPool, ErasedPool};
use crate::ecs::{Component, ComponentId, ComponentMeta, RegistryError, MAX_COMPONENT_TYPES};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};

/// Owns every component value in the world.
pub struct ComponentRegistry {
    lookup: HashMap<TypeId, ComponentId>,
    pools: Vec<Box<dyn ErasedPool>>,
    metas: Vec<ComponentMeta>,
    refused: HashSet<TypeId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            lookup: HashMap::new(),
            pools: Vec::new(),
            metas: Vec::new(),
            refused: HashSet::new(),
        }
    }

    /// Return the id of `T`, assigning one on first sight.
    ///
    /// Fails once all [`MAX_COMPONENT_TYPES`] ids are taken; the refusal is
    /// logged once per type and never alters existing ids.
    pub fn register_or_get_id<T: Component>(&mut self) -> Result<ComponentId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.lookup.get(&type_id) {
            return Ok(id);
        }

        let Some(id) = ComponentId::from_index(self.pools.len()) else {
            if self.refused.insert(type_id) {
                tracing::error!(
                    component = T::name(),
                    max = MAX_COMPONENT_TYPES,
                    "no room left for component types; type is unsupported"
                );
            }
            return Err(RegistryError::CapacityExceeded {
                type_name: T::name(),
                max: MAX_COMPONENT_TYPES,
            });
        };

        tracing::debug!(component = T::name(), id = %id, "registered component type");
        self.lookup.insert(type_id, id);
        self.pools.push(Box::new(ComponentPool::<T>::new()));
        self.metas.push(ComponentMeta::new::<T>(id));
        Ok(id)
    }

    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.id_of_type(TypeId::of::<T>())
    }

    pub fn id_of_type(&self, type_id: TypeId) -> Option<ComponentId> {
        self.lookup.get(&type_id).copied()
    }

    /// Pure lookup, never registers.
    pub fn has_type<T: Component>(&self) -> bool {
        self.lookup.contains_key(&TypeId::of::<T>())
    }

    /// Store `value` in `T`'s pool, returning its slot.
    ///
    /// Unregistered types are registered on demand with a warning: they were
    /// never declared by any system, which usually signals a typo in a
    /// requirement list.
    pub fn allocate<T: Component>(&mut self, value: T) -> Result<(usize, &mut T), RegistryError> {
        if !self.has_type::<T>() {
            tracing::warn!(
                component = T::name(),
                "component was not declared by any system; registering on demand"
            );
        }
        let id = self.register_or_get_id::<T>()?;
        Ok(self.pool_mut::<T>(id)?.allocate(value))
    }

    pub fn get<T: Component>(&self, id: ComponentId, slot: usize) -> Result<&T, RegistryError> {
        self.pool::<T>(id)?.get(slot)
    }

    pub fn get_mut<T: Component>(
        &mut self,
        id: ComponentId,
        slot: usize,
    ) -> Result<&mut T, RegistryError> {
        self.pool_mut::<T>(id)?.get_mut(slot)
    }

    /// Type-erased read used by persistence and scripting layers.
    pub fn get_any(&self, id: ComponentId, slot: usize) -> Result<&dyn Any, RegistryError> {
        self.erased(id)?.get_any(slot)
    }

    pub fn get_any_mut(
        &mut self,
        id: ComponentId,
        slot: usize,
    ) -> Result<&mut dyn Any, RegistryError> {
        self.erased_mut(id)?.get_any_mut(slot)
    }

    /// Drop the value in `slot` and make the slot available for reuse.
    pub fn release(&mut self, id: ComponentId, slot: usize) -> Result<(), RegistryError> {
        self.erased_mut(id)?.release(slot)
    }

    pub fn pool<T: Component>(&self, id: ComponentId) -> Result<&ComponentPool<T>, RegistryError> {
        let erased = self.erased(id)?;
        erased
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
            .ok_or(RegistryError::TypeMismatch {
                id,
                stored: erased.component_name(),
                requested: T::name(),
            })
    }

    fn pool_mut<T: Component>(
        &mut self,
        id: ComponentId,
    ) -> Result<&mut ComponentPool<T>, RegistryError> {
        let erased = self.erased_mut(id)?;
        let stored = erased.component_name();
        erased
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .ok_or(RegistryError::TypeMismatch {
                id,
                stored,
                requested: T::name(),
            })
    }

    /// Total slots (live and free) in a pool.
    pub fn pool_len(&self, id: ComponentId) -> usize {
        self.pools.get(id.index()).map_or(0, |pool| pool.len())
    }

    /// Slots waiting on a pool's free list.
    pub fn free_len(&self, id: ComponentId) -> usize {
        self.pools.get(id.index()).map_or(0, |pool| pool.free_len())
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn meta(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.metas.get(id.index())
    }

    pub(crate) fn meta_mut(&mut self, id: ComponentId) -> Option<&mut ComponentMeta> {
        self.metas.get_mut(id.index())
    }

    pub fn meta_by_name(&self, name: &str) -> Option<&ComponentMeta> {
        self.metas.iter().find(|meta| meta.name() == name)
    }

    /// All metadata in id order.
    pub fn metas(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }

    pub fn name_of(&self, id: ComponentId) -> Option<&'static str> {
        self.meta(id).map(ComponentMeta::name)
    }

    fn erased(&self, id: ComponentId) -> Result<&dyn ErasedPool, RegistryError> {
        self.pools
            .get(id.index())
            .map(|pool| pool.as_ref())
            .ok_or(RegistryError::UnknownComponent { id })
    }

    fn erased_mut(&mut self, id: ComponentId) -> Result<&mut dyn ErasedPool, RegistryError> {
        match self.pools.get_mut(id.index()) {
            Some(pool) => Ok(pool.as_mut()),
            None => Err(RegistryError::UnknownComponent { id }),
        }
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    crate::component!(Position, Velocity);

    struct Slot<const N: usize>;
    impl<const N: usize> Component for Slot<N> {}

    macro_rules! register_slots {
        ($registry:expr, $($n:literal)+) => {
            vec![$($registry.register_or_get_id::<Slot<$n>>()),+]
        };
    }

    fn fill_to_capacity(registry: &mut ComponentRegistry) {
        let results = register_slots!(registry,
            0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
            16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
            32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47
            48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63
        );
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn ids_are_stable_and_idempotent() {
        let mut registry = ComponentRegistry::new();
        let position = registry.register_or_get_id::<Position>().unwrap();
        let velocity = registry.register_or_get_id::<Velocity>().unwrap();

        assert_eq!(position.index(), 0);
        assert_eq!(velocity.index(), 1);
        assert_eq!(registry.register_or_get_id::<Position>(), Ok(position));
        assert_eq!(registry.id_of::<Velocity>(), Some(velocity));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn has_type_does_not_register() {
        let registry = ComponentRegistry::new();
        assert!(!registry.has_type::<Position>());
        assert!(registry.is_empty());
    }

    #[test]
    fn sixty_fifth_type_is_refused() {
        let mut registry = ComponentRegistry::new();
        fill_to_capacity(&mut registry);
        assert_eq!(registry.len(), MAX_COMPONENT_TYPES);
        let before: Vec<_> = registry.metas().map(|m| (m.type_id(), m.id())).collect();

        let err = registry.register_or_get_id::<Position>().unwrap_err();
        assert!(matches!(err, RegistryError::CapacityExceeded { max: 64, .. }));
        assert!(registry.allocate(Position { x: 0.0, y: 0.0 }).is_err());

        let after: Vec<_> = registry.metas().map(|m| (m.type_id(), m.id())).collect();
        assert_eq!(before, after);
        assert_eq!(
            registry.register_or_get_id::<Slot<17>>().map(ComponentId::index),
            Ok(17)
        );
    }

    #[test]
    fn release_then_allocate_reuses_slot() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register_or_get_id::<Position>().unwrap();
        let (first, _) = registry.allocate(Position { x: 1.0, y: 1.0 }).unwrap();
        let (second, _) = registry.allocate(Position { x: 2.0, y: 2.0 }).unwrap();

        registry.release(id, first).unwrap();
        assert_eq!(registry.free_len(id), 1);

        let (reused, value) = registry.allocate(Position { x: 9.0, y: 9.0 }).unwrap();
        assert_eq!(reused, first);
        assert_eq!(value.x, 9.0);
        assert_eq!(registry.pool_len(id), 2);
        assert_eq!(registry.get::<Position>(id, second).unwrap().x, 2.0);
    }

    #[test]
    fn wrong_type_and_bad_slot_are_errors() {
        let mut registry = ComponentRegistry::new();
        let position = registry.register_or_get_id::<Position>().unwrap();
        registry.allocate(Position { x: 0.0, y: 0.0 }).unwrap();

        assert!(matches!(
            registry.get::<Velocity>(position, 0),
            Err(RegistryError::TypeMismatch { stored: "Position", .. })
        ));
        assert!(matches!(
            registry.get::<Position>(position, 3),
            Err(RegistryError::SlotOutOfRange { slot: 3, .. })
        ));
    }

    #[test]
    fn erased_access_downcasts() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register_or_get_id::<Velocity>().unwrap();
        let (slot, _) = registry.allocate(Velocity { dx: 1.0, dy: -1.0 }).unwrap();

        let any = registry.get_any_mut(id, slot).unwrap();
        any.downcast_mut::<Velocity>().unwrap().dx = 4.0;

        let value = registry.get_any(id, slot).unwrap().downcast_ref::<Velocity>();
        assert_eq!(value, Some(&Velocity { dx: 4.0, dy: -1.0 }));
        assert_eq!(registry.meta(id).map(ComponentMeta::name), Some("Velocity"));
    }
}
