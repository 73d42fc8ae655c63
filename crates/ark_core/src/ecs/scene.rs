//! Application-lifetime context
//!
//! A [`Scene`] owns the world, the system manager, the message bus and the
//! frame clock. Hosts drive it with [`Scene::frame`]; structural edits made
//! through the scene re-synchronize system membership before returning, and
//! so does dropping the [`WorldMut`] guard handed out by [`Scene::world_mut`].
//!
//! ```ignore
//! let mut scene = Scene::new();
//! scene.add_system(MovementSystem);
//! let ship = scene.spawn();
//! scene.insert(ship, Position::default())?;
//! scene.insert(ship, Velocity::new(1.0, 0.0))?;
//! scene.frame();
//! ```

use crate::ecs::{
    Component, ComponentMask, ComponentSet, Entity, EntityMut, MessageBus, MessageId, Query,
    RegistryError, System, SystemManager, World, WorldError,
};
use crate::time::FrameClock;
use std::any::Any;
use std::ops::{Deref, DerefMut};

pub struct Scene {
    world: World,
    systems: SystemManager,
    bus: MessageBus,
    clock: FrameClock,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_clock(FrameClock::default())
    }

    pub fn with_clock(clock: FrameClock) -> Self {
        Self {
            world: World::new(),
            systems: SystemManager::new(),
            bus: MessageBus::new(),
            clock,
        }
    }

    /// One frame: deliver last frame's messages, update active systems,
    /// advance the clock.
    pub fn frame(&mut self) {
        let messages = self.bus.drain();
        if !messages.is_empty() {
            tracing::trace!(count = messages.len(), "delivering messages");
            self.systems
                .deliver(&mut self.world, &mut self.bus, &self.clock, &messages);
        }
        self.systems
            .update(&mut self.world, &mut self.bus, &self.clock);
        self.clock.advance();
    }

    /// Dispatch an immediate event to every active system.
    pub fn handle_event(&mut self, event: &dyn Any) {
        self.systems
            .handle_event(&mut self.world, &mut self.bus, &self.clock, event);
    }

    pub fn render(&mut self, target: &mut dyn Any) {
        self.systems.render(&self.world, target);
    }

    pub fn post_message<T: Any>(&mut self, id: MessageId, payload: T) {
        self.bus.post(id, payload);
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn spawn(&mut self) -> Entity {
        let entity = self.world.spawn();
        self.systems.sync(&mut self.world);
        entity
    }

    pub fn despawn(&mut self, entity: Entity) -> bool {
        let despawned = self.world.despawn(entity);
        self.systems.sync(&mut self.world);
        despawned
    }

    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        let result = self.world.insert(entity, value);
        self.systems.sync(&mut self.world);
        result
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<bool, WorldError> {
        let result = self.world.remove::<T>(entity);
        self.systems.sync(&mut self.world);
        result
    }

    /// Run several edits on one entity. Systems see every transition in
    /// order once `f` returns. Returns `None` for a stale handle.
    pub fn edit<R>(&mut self, entity: Entity, f: impl FnOnce(&mut EntityMut<'_>) -> R) -> Option<R> {
        let result = self.world.entity_mut(entity).map(|mut entity| f(&mut entity));
        self.systems.sync(&mut self.world);
        result
    }

    /// Apply pending structural changes and sync systems.
    pub fn flush(&mut self) {
        self.world.flush();
        self.systems.sync(&mut self.world);
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    pub fn add_system<T: System>(&mut self, system: T) -> &mut T {
        self.systems.add_system(&mut self.world, system)
    }

    pub fn remove_system<T: System>(&mut self) -> Option<Box<T>> {
        self.systems.remove_system::<T>()
    }

    pub fn set_system_active<T: System>(&mut self, active: bool) -> bool {
        self.systems.set_active::<T>(active)
    }

    pub fn system<T: System>(&self) -> Option<&T> {
        self.systems.get::<T>()
    }

    pub fn system_mut<T: System>(&mut self) -> Option<&mut T> {
        self.systems.get_mut::<T>()
    }

    pub fn systems(&self) -> &SystemManager {
        &self.systems
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn query(&mut self, mask: ComponentMask) -> Query {
        self.world.query(mask)
    }

    pub fn query_for<C: ComponentSet>(&mut self) -> Result<Query, RegistryError> {
        self.world.query_for::<C>()
    }

    /// Query over `T`'s requirements, invalidated when `T` is removed.
    pub fn system_query<T: System>(&mut self) -> Query {
        self.systems.query_for::<T>(&mut self.world)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access. System membership catches up when the guard
    /// is dropped.
    pub fn world_mut(&mut self) -> WorldMut<'_> {
        WorldMut {
            world: &mut self.world,
            systems: &mut self.systems,
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn pending_messages(&self) -> usize {
        self.bus.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable borrow of a scene's world that syncs systems on drop.
pub struct WorldMut<'s> {
    world: &'s mut World,
    systems: &'s mut SystemManager,
}

impl Deref for WorldMut<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        &*self.world
    }
}

impl DerefMut for WorldMut<'_> {
    fn deref_mut(&mut self) -> &mut World {
        &mut *self.world
    }
}

impl Drop for WorldMut<'_> {
    fn drop(&mut self) {
        self.systems.sync(&mut *self.world);
    }
}
