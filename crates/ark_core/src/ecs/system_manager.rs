// system_manager.rs - System lifecycle, membership and dispatch
//
// Systems are kept in registration order. Each slot caches the system's
// required mask and the ordered list of entities currently matching it.
// Membership is reconciled by replaying the world's change journal entry by
// entry: after every dispatch, and (through `Scene`) after every structural
// edit. A system never observes its own list changing mid-update.

use crate::ecs::query::QueryState;
use crate::ecs::{
    ComponentMask, Entity, Message, MessageBus, Query, System, SystemContext, SystemDescriptor,
    SystemSetup, World,
};
use crate::time::FrameClock;
use ark_metrics::SystemProfiler;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::rc::Weak;

struct SystemState {
    type_id: TypeId,
    name: String,
    descriptor: SystemDescriptor,
    mask: ComponentMask,
    entities: Vec<Entity>,
    members: HashSet<Entity>,
    active: bool,
    derived: Vec<Weak<QueryState>>,
}

impl SystemState {
    fn matches(&self, mask: Option<ComponentMask>) -> bool {
        !self.mask.is_empty()
            && self.descriptor.is_satisfiable()
            && mask.is_some_and(|mask| mask.contains_all(self.mask))
    }
}

struct SystemSlot {
    system: Box<dyn System>,
    state: SystemState,
}

impl SystemSlot {
    /// Apply one recorded change. `mask` is the composition right after the
    /// change, not the current one.
    fn sync(&mut self, world: &World, entity: Entity, mask: Option<ComponentMask>) {
        let state = &mut self.state;
        let should_match = state.matches(mask);
        let present = state.members.contains(&entity);

        if should_match && !present {
            state.members.insert(entity);
            state.entities.push(entity);
            tracing::debug!(system = %state.name, %entity, "entity added to system");
            self.system.on_entity_added(world, entity);
        } else if !should_match && present {
            state.members.remove(&entity);
            if let Some(pos) = state.entities.iter().position(|e| *e == entity) {
                state.entities.remove(pos);
            }
            tracing::debug!(system = %state.name, %entity, "entity removed from system");
            self.system.on_entity_removed(world, entity);
        }
    }

    fn invalidate_derived(&mut self) {
        for weak in self.state.derived.drain(..) {
            if let Some(state) = weak.upgrade() {
                state.invalidate();
            }
        }
    }
}

/// Owns every registered system and drives dispatch.
pub struct SystemManager {
    systems: Vec<SystemSlot>,
    profiler: SystemProfiler,
}

impl SystemManager {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            profiler: SystemProfiler::new(),
        }
    }

    /// Register `system`, or return the instance already registered for `T`.
    ///
    /// A new system is initialized, its mask is built once, and it is seeded
    /// with every live entity that already matches (hooks fire).
    pub fn add_system<T: System>(&mut self, world: &mut World, system: T) -> &mut T {
        // Pending changes predate the new system, which is seeded from the
        // current population instead.
        self.sync(world);
        world.enable_journal();

        let index = match self.position(TypeId::of::<T>()) {
            Some(index) => {
                tracing::debug!(system = system.name(), "system already registered");
                index
            }
            None => {
                self.systems.push(Self::initialize(world, Box::new(system)));
                self.systems.len() - 1
            }
        };

        // `position` matched on `TypeId::of::<T>()`, recorded from the boxed
        // `T` in `initialize`.
        self.systems[index]
            .system
            .as_mut()
            .as_any_mut()
            .downcast_mut::<T>()
            .expect("slot type id matches its boxed system")
    }

    fn initialize<T: System>(world: &mut World, mut system: Box<T>) -> SystemSlot {
        let name = system.name().to_owned();
        let mut setup = SystemSetup::new(world.registry_mut(), &name);
        system.init(&mut setup);
        let descriptor = setup.finish();
        let mask = descriptor.mask();

        if descriptor.is_empty() {
            tracing::warn!(system = %name, "system requires no components; it will match no entities");
        }
        tracing::info!(system = %name, mask = %mask, "system registered");

        let mut slot = SystemSlot {
            system,
            state: SystemState {
                type_id: TypeId::of::<T>(),
                name,
                descriptor,
                mask,
                entities: Vec::new(),
                members: HashSet::new(),
                active: true,
                derived: Vec::new(),
            },
        };

        let world: &World = world;
        for &entity in world.entities() {
            slot.sync(world, entity, world.mask_of(entity));
        }
        slot
    }

    /// Detach the system registered for `T` and return it.
    ///
    /// Queries derived from it through [`SystemManager::query_for`] become
    /// invalid. Other systems are untouched.
    pub fn remove_system<T: System>(&mut self) -> Option<Box<T>> {
        let index = self.position(TypeId::of::<T>())?;
        let mut slot = self.systems.remove(index);
        slot.invalidate_derived();
        self.profiler.forget(&slot.state.name);
        tracing::info!(system = %slot.state.name, "system removed");
        slot.system.into_any().downcast::<T>().ok()
    }

    /// Toggle dispatch for `T`. Membership keeps being maintained while
    /// inactive. Returns `false` if `T` is not registered.
    pub fn set_active<T: System>(&mut self, active: bool) -> bool {
        self.set_active_type(TypeId::of::<T>(), active)
    }

    pub fn set_active_type(&mut self, type_id: TypeId, active: bool) -> bool {
        let Some(index) = self.position(type_id) else {
            return false;
        };
        let state = &mut self.systems[index].state;
        if state.active != active {
            state.active = active;
            tracing::info!(system = %state.name, active, "system activation changed");
        }
        true
    }

    /// Replay every structural change recorded since the last call, in
    /// order, against every system. `Scene` calls this after each edit and
    /// dispatch calls it after each system runs.
    pub fn sync(&mut self, world: &mut World) {
        let changes = world.drain_journal();
        if changes.is_empty() {
            return;
        }
        let world: &World = world;
        for (entity, mask) in changes {
            for slot in &mut self.systems {
                slot.sync(world, entity, mask);
            }
        }
    }

    /// Run `update` on every active system in registration order.
    pub fn update(&mut self, world: &mut World, bus: &mut MessageBus, clock: &FrameClock) {
        self.sync(world);
        for index in 0..self.systems.len() {
            if self.systems[index].state.active {
                self.dispatch(index, world, bus, clock, |system, ctx| system.update(ctx));
            }
        }
    }

    /// Deliver each message to every active system, message by message.
    pub fn deliver(
        &mut self,
        world: &mut World,
        bus: &mut MessageBus,
        clock: &FrameClock,
        messages: &[Message],
    ) {
        self.sync(world);
        for message in messages {
            for index in 0..self.systems.len() {
                if self.systems[index].state.active {
                    self.dispatch(index, world, bus, clock, |system, ctx| {
                        system.handle_message(ctx, message)
                    });
                }
            }
        }
    }

    pub fn handle_event(
        &mut self,
        world: &mut World,
        bus: &mut MessageBus,
        clock: &FrameClock,
        event: &dyn Any,
    ) {
        self.sync(world);
        for index in 0..self.systems.len() {
            if self.systems[index].state.active {
                self.dispatch(index, world, bus, clock, |system, ctx| {
                    system.handle_event(ctx, event)
                });
            }
        }
    }

    /// Call every active system that can render, in registration order.
    pub fn render(&mut self, world: &World, target: &mut dyn Any) {
        for slot in self.systems.iter_mut().filter(|slot| slot.state.active) {
            if let Some(renderer) = slot.system.renderer() {
                renderer.render(world, target);
            }
        }
    }

    fn dispatch(
        &mut self,
        index: usize,
        world: &mut World,
        bus: &mut MessageBus,
        clock: &FrameClock,
        run: impl FnOnce(&mut dyn System, &mut SystemContext<'_>),
    ) {
        let SystemSlot { system, state } = &mut self.systems[index];
        world.begin_pass();
        self.profiler.time_system(&state.name, || {
            let mut ctx = SystemContext::new(world, &state.entities, bus, clock);
            run(system.as_mut(), &mut ctx);
        });
        world.end_pass();
        self.sync(world);
    }

    /// A query over `T`'s mask that is invalidated when `T` is removed.
    ///
    /// Returns an invalid query if `T` is not registered or can match
    /// nothing.
    pub fn query_for<T: System>(&mut self, world: &mut World) -> Query {
        let Some(index) = self.position(TypeId::of::<T>()) else {
            tracing::debug!(system = std::any::type_name::<T>(), "query for unregistered system");
            return Query::default();
        };
        let state = &mut self.systems[index].state;
        if state.mask.is_empty() || !state.descriptor.is_satisfiable() {
            return Query::default();
        }

        let query = world.query(state.mask);
        state.derived.retain(|weak| weak.strong_count() > 0);
        state.derived.extend(query.downgrade());
        query
    }

    pub fn get<T: System>(&self) -> Option<&T> {
        let index = self.position(TypeId::of::<T>())?;
        self.systems[index].system.as_ref().as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: System>(&mut self) -> Option<&mut T> {
        let index = self.position(TypeId::of::<T>())?;
        self.systems[index]
            .system
            .as_mut()
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub fn contains<T: System>(&self) -> bool {
        self.position(TypeId::of::<T>()).is_some()
    }

    pub fn is_active<T: System>(&self) -> bool {
        self.state_of::<T>().is_some_and(|state| state.active)
    }

    /// Entities currently matching `T`, in the order they started matching.
    pub fn entities_of<T: System>(&self) -> &[Entity] {
        self.state_of::<T>()
            .map(|state| state.entities.as_slice())
            .unwrap_or_default()
    }

    pub fn mask_of<T: System>(&self) -> Option<ComponentMask> {
        self.state_of::<T>().map(|state| state.mask)
    }

    pub fn descriptor_of<T: System>(&self) -> Option<&SystemDescriptor> {
        self.state_of::<T>().map(|state| &state.descriptor)
    }

    /// Names in registration order.
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|slot| slot.state.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.systems
            .iter()
            .position(|slot| slot.state.type_id == type_id)
    }

    fn state_of<T: System>(&self) -> Option<&SystemState> {
        let index = self.position(TypeId::of::<T>())?;
        Some(&self.systems[index].state)
    }
}

impl Default for SystemManager {
    fn default() -> Self {
        Self::new()
    }
}
