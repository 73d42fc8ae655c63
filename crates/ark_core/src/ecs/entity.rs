//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes). They own no data; composition
//! lives in the World's per-entity record and the component pools.
//! `EntityRef` / `EntityMut` pair a handle with its owning world for
//! convenient access.

use crate::ecs::{Component, ComponentMask, ComponentRef, World, WorldError};
use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in the world's entity records
/// - Generation: Incremented when the entity is destroyed, so stale
///   handles to a recycled index are detected
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for scripting/persistence layers)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Read-only view of a live entity.
#[derive(Copy, Clone)]
pub struct EntityRef<'w> {
    world: &'w World,
    entity: Entity,
}

impl<'w> EntityRef<'w> {
    pub(crate) fn new(world: &'w World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn get<T: Component>(&self) -> Option<&'w T> {
        self.world.get::<T>(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    pub fn mask(&self) -> ComponentMask {
        self.world.mask_of(self.entity).unwrap_or_default()
    }

    /// Visit every live component, in component id order.
    pub fn for_each_component(&self, f: impl FnMut(ComponentRef<'w>)) {
        self.world.for_each_component(self.entity, f);
    }
}

/// Mutable view of a live entity.
pub struct EntityMut<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityMut<'w> {
    pub(crate) fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn id(&self) -> Entity {
        self.entity
    }

    /// Add (or overwrite) a component.
    pub fn insert<T: Component>(&mut self, value: T) -> Result<&mut Self, WorldError> {
        self.world.insert(self.entity, value)?;
        Ok(self)
    }

    /// Remove a component, returning whether the entity had it.
    pub fn remove<T: Component>(&mut self) -> Result<bool, WorldError> {
        self.world.remove::<T>(self.entity)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.world.get::<T>(self.entity)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.world.get_mut::<T>(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    pub fn mask(&self) -> ComponentMask {
        self.world.mask_of(self.entity).unwrap_or_default()
    }

    pub fn world(&self) -> &World {
        self.world
    }

    /// Destroy the entity, releasing all of its components.
    pub fn despawn(self) -> bool {
        self.world.despawn(self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        let entity = Entity::new(42, 7);
        assert_eq!(Entity::from_bits(entity.to_bits()), entity);
        assert_eq!(entity.to_string(), "42v7");
    }
}
