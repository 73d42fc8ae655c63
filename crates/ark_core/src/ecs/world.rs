// world.rs - Entity records, component ownership and membership sync
//
// The World is the single owner of component data. Every structural change
// (insert of a new type, removal, despawn) recomputes the entity mask,
// reconciles every live query immediately and, once a system manager is
// attached, records `(entity, mask after)` in the change journal. Systems
// replay the journal entry by entry, so every transition is seen even when
// a remove and a re-insert land between two syncs.
//
// While a pass is open (system dispatch or `Query::for_each_mut`) structural
// changes are recorded as commands and replayed when the outermost pass ends.

use crate::ecs::command::{Command, CommandQueue};
use crate::ecs::query::QueryState;
use crate::ecs::{
    Component, ComponentId, ComponentMask, ComponentMeta, ComponentRegistry, ComponentSet,
    Entity, EntityMut, EntityRef, MetaBuilder, Query, RegistryError, WorldError,
};
use ark_metrics::Counter;
use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

/// One structural change: the entity and its mask afterwards (`None` once
/// despawned).
pub(crate) type JournalEntry = (Entity, Option<ComponentMask>);

/// Per-index bookkeeping. `slots` is kept sorted by component id.
#[derive(Default)]
struct EntityRecord {
    generation: u32,
    alive: bool,
    mask: ComponentMask,
    slots: Vec<(ComponentId, usize)>,
}

impl EntityRecord {
    fn slot_of(&self, id: ComponentId) -> Option<usize> {
        self.slots
            .binary_search_by_key(&id, |&(cid, _)| cid)
            .ok()
            .map(|pos| self.slots[pos].1)
    }
}

/// A borrowed, type-erased component of one entity.
#[derive(Clone, Copy)]
pub struct ComponentRef<'w> {
    id: ComponentId,
    meta: &'w ComponentMeta,
    value: &'w dyn Any,
}

impl<'w> ComponentRef<'w> {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn meta(&self) -> &'w ComponentMeta {
        self.meta
    }

    pub fn name(&self) -> &'static str {
        self.meta.name()
    }

    pub fn value(&self) -> &'w dyn Any {
        self.value
    }

    pub fn downcast<T: Component>(&self) -> Option<&'w T> {
        self.value.downcast_ref::<T>()
    }
}

/// Container of entities and their components.
pub struct World {
    registry: ComponentRegistry,
    records: Vec<EntityRecord>,
    free_indices: Vec<u32>,
    population: Vec<Entity>,
    queries: Vec<Weak<QueryState>>,
    journal: Vec<JournalEntry>,
    journaling: bool,
    commands: CommandQueue,
    pass_depth: u32,
    counters: Counter,
}

impl World {
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            records: Vec::new(),
            free_indices: Vec::new(),
            population: Vec::new(),
            queries: Vec::new(),
            journal: Vec::new(),
            journaling: false,
            commands: CommandQueue::default(),
            pass_depth: 0,
            counters: Counter::new(),
        }
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create an entity with no components. Never deferred.
    pub fn spawn(&mut self) -> Entity {
        let entity = match self.free_indices.pop() {
            Some(index) => {
                let record = &mut self.records[index as usize];
                record.alive = true;
                Entity::new(index, record.generation)
            }
            None => {
                let index = self.records.len() as u32;
                self.records.push(EntityRecord {
                    alive: true,
                    ..EntityRecord::default()
                });
                Entity::new(index, 0)
            }
        };

        self.population.push(entity);
        self.counters.increment("entities.spawned", 1);
        tracing::trace!(%entity, "spawned entity");
        self.sync_entity(entity);
        entity
    }

    /// Destroy an entity and release all of its components.
    ///
    /// Returns `false` for a handle that is already stale. Inside a pass the
    /// despawn is queued and `true` is returned.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        if self.is_deferring() {
            self.defer(Command::Despawn { entity });
            return true;
        }
        self.despawn_now(entity)
    }

    fn despawn_now(&mut self, entity: Entity) -> bool {
        let Some(record) = self.record_mut(entity) else {
            return false;
        };
        let slots = std::mem::take(&mut record.slots);
        record.alive = false;
        record.mask = ComponentMask::EMPTY;
        record.generation = record.generation.wrapping_add(1);

        for (id, slot) in slots {
            if let Err(err) = self.registry.release(id, slot) {
                tracing::error!(%entity, %err, "failed to release component slot");
            }
        }

        self.free_indices.push(entity.index());
        self.population.retain(|e| *e != entity);
        self.counters.increment("entities.despawned", 1);
        tracing::trace!(%entity, "despawned entity");
        self.sync_entity(entity);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.record(entity).is_some()
    }

    /// Live entities in creation order.
    pub fn entities(&self) -> &[Entity] {
        &self.population
    }

    pub fn len(&self) -> usize {
        self.population.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    pub fn entity(&self, entity: Entity) -> Option<EntityRef<'_>> {
        self.is_alive(entity).then(|| EntityRef::new(self, entity))
    }

    pub fn entity_mut(&mut self, entity: Entity) -> Option<EntityMut<'_>> {
        if self.is_alive(entity) {
            Some(EntityMut::new(self, entity))
        } else {
            None
        }
    }

    /// Current composition, or `None` for a stale handle.
    pub fn mask_of(&self, entity: Entity) -> Option<ComponentMask> {
        self.record(entity).map(|record| record.mask)
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach `value` to `entity`, overwriting an existing value of the same
    /// type in place.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        if !self.is_alive(entity) {
            return Err(WorldError::StaleEntity { entity });
        }
        if self.is_deferring() {
            self.defer(Command::Insert {
                entity,
                component: T::name(),
                apply: Box::new(move |world: &mut World| world.insert_now(entity, value)),
            });
            return Ok(());
        }
        self.insert_now(entity, value)
    }

    fn insert_now<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        if !self.is_alive(entity) {
            return Err(WorldError::StaleEntity { entity });
        }

        if let Some(existing) = self.get_mut::<T>(entity) {
            *existing = value;
            return Ok(());
        }

        let (slot, _) = self.registry.allocate(value)?;
        let id = self.registry.register_or_get_id::<T>()?;

        let record = self
            .record_mut(entity)
            .ok_or(WorldError::StaleEntity { entity })?;
        let pos = record.slots.partition_point(|&(cid, _)| cid < id);
        record.slots.insert(pos, (id, slot));
        record.mask.insert(id);

        self.counters.increment("components.inserted", 1);
        tracing::trace!(%entity, component = T::name(), "component added");
        self.sync_entity(entity);
        Ok(())
    }

    /// Detach `T` from `entity`, returning whether it was present.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<bool, WorldError> {
        if !self.is_alive(entity) {
            return Err(WorldError::StaleEntity { entity });
        }
        match self.registry.id_of::<T>() {
            Some(id) => self.remove_by_id(entity, id),
            None => Ok(false),
        }
    }

    /// Detach the component with `id`. Inside a pass the removal is queued
    /// and the result reflects the composition at call time.
    pub fn remove_by_id(&mut self, entity: Entity, id: ComponentId) -> Result<bool, WorldError> {
        let mask = self
            .mask_of(entity)
            .ok_or(WorldError::StaleEntity { entity })?;
        if !mask.contains(id) {
            return Ok(false);
        }
        if self.is_deferring() {
            self.defer(Command::Remove { entity, id });
            return Ok(true);
        }
        self.remove_now(entity, id)
    }

    fn remove_now(&mut self, entity: Entity, id: ComponentId) -> Result<bool, WorldError> {
        let record = self
            .record_mut(entity)
            .ok_or(WorldError::StaleEntity { entity })?;
        let Ok(pos) = record.slots.binary_search_by_key(&id, |&(cid, _)| cid) else {
            return Ok(false);
        };
        let (_, slot) = record.slots.remove(pos);
        record.mask.remove(id);

        self.registry.release(id, slot)?;
        self.counters.increment("components.removed", 1);
        tracing::trace!(%entity, component = self.registry.name_of(id), "component removed");
        self.sync_entity(entity);
        Ok(true)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.registry.id_of::<T>()?;
        let slot = self.record(entity)?.slot_of(id)?;
        self.registry.get::<T>(id, slot).ok()
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.registry.id_of::<T>()?;
        let slot = self.record(entity)?.slot_of(id)?;
        self.registry.get_mut::<T>(id, slot).ok()
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.registry
            .id_of::<T>()
            .is_some_and(|id| self.has_id(entity, id))
    }

    pub fn has_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.mask_of(entity).is_some_and(|mask| mask.contains(id))
    }

    pub fn get_any(&self, entity: Entity, id: ComponentId) -> Option<&dyn Any> {
        let slot = self.record(entity)?.slot_of(id)?;
        self.registry.get_any(id, slot).ok()
    }

    pub fn get_any_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut dyn Any> {
        let slot = self.record(entity)?.slot_of(id)?;
        self.registry.get_any_mut(id, slot).ok()
    }

    /// Visit every component of `entity` in id order.
    pub fn for_each_component<'w>(&'w self, entity: Entity, mut visit: impl FnMut(ComponentRef<'w>)) {
        let Some(record) = self.record(entity) else {
            return;
        };
        for &(id, slot) in &record.slots {
            let (Some(meta), Ok(value)) = (self.registry.meta(id), self.registry.get_any(id, slot))
            else {
                continue;
            };
            visit(ComponentRef { id, meta, value });
        }
    }

    /// Instantiate a component by its registered name using the default
    /// constructor attached with [`MetaBuilder::constructible`].
    pub fn insert_default_by_name(
        &mut self,
        entity: Entity,
        name: &str,
    ) -> Result<ComponentId, WorldError> {
        let meta = self
            .registry
            .meta_by_name(name)
            .ok_or_else(|| WorldError::UnknownComponentName { name: name.to_owned() })?;
        let id = meta.id();
        let construct = meta
            .insert_default_fn()
            .ok_or_else(|| WorldError::NotConstructible { name: name.to_owned() })?;
        construct(self, entity)?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Registry access
    // ------------------------------------------------------------------

    pub fn register<T: Component>(&mut self) -> Result<ComponentId, RegistryError> {
        self.registry.register_or_get_id::<T>()
    }

    /// Register `T` if needed and open its metadata for enrichment.
    pub fn describe<T: Component>(&mut self) -> Result<MetaBuilder<'_, T>, RegistryError> {
        let id = self.registry.register_or_get_id::<T>()?;
        let meta = self
            .registry
            .meta_mut(id)
            .ok_or(RegistryError::UnknownComponent { id })?;
        Ok(MetaBuilder::new(meta))
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Build a query seeded from the live population in creation order.
    pub fn query(&mut self, mask: ComponentMask) -> Query {
        let initial = self
            .population
            .iter()
            .copied()
            .filter(|&e| self.mask_of(e).is_some_and(|m| m.contains_all(mask)))
            .collect();
        let state = Rc::new(QueryState::new(mask, initial));

        self.queries.retain(|weak| weak.strong_count() > 0);
        self.queries.push(Rc::downgrade(&state));
        tracing::debug!(mask = %mask, "query created");
        Query::from_state(state)
    }

    pub fn query_of(&mut self, ids: &[ComponentId]) -> Query {
        self.query(ids.iter().copied().collect())
    }

    /// Query over a tuple of component types, registering them if needed.
    pub fn query_for<C: ComponentSet>(&mut self) -> Result<Query, RegistryError> {
        let mask = C::mask(&mut self.registry)?;
        Ok(self.query(mask))
    }

    // ------------------------------------------------------------------
    // Passes and deferred commands
    // ------------------------------------------------------------------

    /// True while structural changes are being queued.
    pub fn is_deferring(&self) -> bool {
        self.pass_depth > 0
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.pass_depth += 1;
    }

    /// Close a pass; closing the outermost one replays queued commands.
    pub(crate) fn end_pass(&mut self) {
        self.pass_depth = self.pass_depth.saturating_sub(1);
        if self.pass_depth == 0 && !self.commands.is_empty() {
            self.apply_commands();
        }
    }

    /// Apply queued commands now. No-op while a pass is open.
    pub fn flush(&mut self) -> usize {
        if self.is_deferring() {
            return 0;
        }
        self.apply_commands()
    }

    fn defer(&mut self, command: Command) {
        tracing::trace!(entity = %command.entity(), "structural change deferred");
        self.counters.increment("commands.deferred", 1);
        self.commands.push(command);
    }

    fn apply_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Some(command) = self.commands.pop() {
            applied += 1;
            match command {
                Command::Insert {
                    entity,
                    component,
                    apply,
                } => {
                    if let Err(err) = apply(self) {
                        tracing::warn!(%entity, component, %err, "deferred insert dropped");
                    }
                }
                Command::Remove { entity, id } => {
                    if let Err(err) = self.remove_now(entity, id) {
                        tracing::warn!(%entity, %id, %err, "deferred remove dropped");
                    }
                }
                Command::Despawn { entity } => {
                    if !self.despawn_now(entity) {
                        tracing::debug!(%entity, "deferred despawn of a dead entity");
                    }
                }
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Membership sync
    // ------------------------------------------------------------------

    /// Start recording structural changes for a system manager.
    pub(crate) fn enable_journal(&mut self) {
        self.journaling = true;
    }

    /// Changes recorded since the last drain, oldest first.
    pub(crate) fn drain_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    #[cfg(test)]
    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn sync_entity(&mut self, entity: Entity) {
        let mask = self.mask_of(entity);
        if self.journaling {
            self.journal.push((entity, mask));
        }

        self.queries
            .retain(|weak| weak.upgrade().is_some_and(|state| state.is_valid()));
        let live: Vec<Rc<QueryState>> = self.queries.iter().filter_map(Weak::upgrade).collect();
        for state in live {
            state.sync(entity, mask);
        }
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records
            .get(entity.index() as usize)
            .filter(|r| r.alive && r.generation == entity.generation())
    }

    fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(entity.index() as usize)
            .filter(|r| r.alive && r.generation == entity.generation())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.population.len())
            .field("component_types", &self.registry.len())
            .field("queries", &self.queries.len())
            .field("pending_commands", &self.commands.len())
            .finish()
    }
}
