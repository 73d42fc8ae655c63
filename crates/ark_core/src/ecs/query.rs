//! Ad-hoc entity queries with membership notifications.
//!
//! A [`Query`] is a shared handle to a match set owned jointly by every clone
//! of the handle. The world keeps only a weak reference and updates live
//! match sets whenever an entity's composition changes; once the last handle
//! drops, the world forgets the query.
//!
//! ```ignore
//! let burning = world.query_for::<(Health, Burning)>()?;
//! burning.on_remove(|entity| tracing::info!(%entity, "fire went out"));
//! burning.for_each_mut(&mut world, |world, entity| {
//!     if let Some(health) = world.get_mut::<Health>(entity) {
//!         health.0 -= 1;
//!     }
//! });
//! ```

use crate::ecs::{ComponentMask, ComponentMeta, Entity, World};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback = Box<dyn FnMut(Entity)>;

pub(crate) struct QueryState {
    mask: ComponentMask,
    valid: Cell<bool>,
    entities: RefCell<Vec<Entity>>,
    members: RefCell<HashSet<Entity>>,
    on_add: RefCell<Vec<Callback>>,
    on_remove: RefCell<Vec<Callback>>,
}

impl QueryState {
    pub(crate) fn new(mask: ComponentMask, initial: Vec<Entity>) -> Self {
        let members = initial.iter().copied().collect();
        Self {
            mask,
            valid: Cell::new(true),
            entities: RefCell::new(initial),
            members: RefCell::new(members),
            on_add: RefCell::new(Vec::new()),
            on_remove: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// An empty mask matches every live entity.
    pub(crate) fn matches(&self, mask: Option<ComponentMask>) -> bool {
        mask.is_some_and(|mask| mask.contains_all(self.mask))
    }

    /// Reconcile one entity against the match set. `mask` is `None` for a
    /// despawned entity.
    pub(crate) fn sync(&self, entity: Entity, mask: Option<ComponentMask>) {
        if !self.is_valid() {
            return;
        }
        let should_match = self.matches(mask);
        let present = self.members.borrow().contains(&entity);

        if should_match && !present {
            self.members.borrow_mut().insert(entity);
            self.entities.borrow_mut().push(entity);
            notify(&self.on_add, entity);
        } else if !should_match && present {
            self.members.borrow_mut().remove(&entity);
            {
                let mut entities = self.entities.borrow_mut();
                if let Some(pos) = entities.iter().position(|e| *e == entity) {
                    entities.remove(pos);
                }
            }
            notify(&self.on_remove, entity);
        }
    }

    /// Detach from the world: the match set empties and observers are dropped.
    pub(crate) fn invalidate(&self) {
        self.valid.set(false);
        self.entities.borrow_mut().clear();
        self.members.borrow_mut().clear();
        self.on_add.borrow_mut().clear();
        self.on_remove.borrow_mut().clear();
    }
}

/// Fire observers in registration order. Observers registered while firing
/// are kept but only see later transitions.
fn notify(observers: &RefCell<Vec<Callback>>, entity: Entity) {
    let mut firing = std::mem::take(&mut *observers.borrow_mut());
    for callback in firing.iter_mut() {
        callback(entity);
    }
    let mut slot = observers.borrow_mut();
    firing.append(&mut slot);
    *slot = firing;
}

/// Shared, mask-filtered view over the world's entities.
///
/// `Query::default()` is the invalid variant: it matches nothing and every
/// accessor degrades to an empty result.
#[derive(Clone, Default)]
pub struct Query {
    state: Option<Rc<QueryState>>,
}

impl Query {
    pub(crate) fn from_state(state: Rc<QueryState>) -> Self {
        Self { state: Some(state) }
    }

    pub(crate) fn downgrade(&self) -> Option<Weak<QueryState>> {
        self.state.as_ref().map(Rc::downgrade)
    }

    fn live(&self) -> Option<&QueryState> {
        self.state.as_deref().filter(|state| state.is_valid())
    }

    pub fn is_valid(&self) -> bool {
        self.live().is_some()
    }

    pub fn mask(&self) -> ComponentMask {
        self.live().map_or(ComponentMask::EMPTY, |state| state.mask)
    }

    /// Snapshot of the matching entities in match order.
    pub fn entities(&self) -> Vec<Entity> {
        self.live()
            .map(|state| state.entities.borrow().clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.live().map_or(0, |state| state.entities.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.live()
            .is_some_and(|state| state.members.borrow().contains(&entity))
    }

    /// Read-only visit over a snapshot of the current matches.
    pub fn for_each(&self, mut visitor: impl FnMut(Entity)) {
        for entity in self.entities() {
            visitor(entity);
        }
    }

    /// Mutable visit. Runs as a world pass: structural changes made by the
    /// visitor are queued and applied after the last entity is visited.
    pub fn for_each_mut(&self, world: &mut World, mut visitor: impl FnMut(&mut World, Entity)) {
        if !self.is_valid() {
            return;
        }
        world.begin_pass();
        for entity in self.entities() {
            visitor(world, entity);
        }
        world.end_pass();
    }

    /// Visit the metadata of each component type in the mask.
    pub fn for_each_component(&self, world: &World, mut visitor: impl FnMut(&ComponentMeta)) {
        for id in self.mask().iter() {
            if let Some(meta) = world.registry().meta(id) {
                visitor(meta);
            }
        }
    }

    /// Observe entities that start matching from now on.
    pub fn on_add(&self, callback: impl FnMut(Entity) + 'static) {
        match self.live() {
            Some(state) => state.on_add.borrow_mut().push(Box::new(callback)),
            None => tracing::debug!("on_add ignored on an invalid query"),
        }
    }

    /// Observe entities that stop matching from now on.
    pub fn on_remove(&self, callback: impl FnMut(Entity) + 'static) {
        match self.live() {
            Some(state) => state.on_remove.borrow_mut().push(Box::new(callback)),
            None => tracing::debug!("on_remove ignored on an invalid query"),
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("valid", &self.is_valid())
            .field("mask", &self.mask())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Health(i32);
    struct Poisoned;
    crate::component!(Health, Poisoned);

    #[test]
    fn default_query_is_inert() {
        let world = World::new();
        let query = Query::default();
        assert!(!query.is_valid());
        assert!(query.entities().is_empty());
        assert_eq!(query.mask(), ComponentMask::EMPTY);

        let mut visited = 0;
        query.for_each(|_| visited += 1);
        query.for_each_component(&world, |_| visited += 1);
        query.on_add(|_| {});
        assert_eq!(visited, 0);
    }

    #[test]
    fn three_entities_minus_one_keeps_insertion_order() {
        let mut world = World::new();
        let entities: Vec<Entity> = (0..3).map(|_| world.spawn()).collect();
        for (hp, &entity) in entities.iter().enumerate() {
            world.insert(entity, Health(hp as i32)).unwrap();
        }
        let query = world.query_for::<(Health,)>().unwrap();

        world.remove::<Health>(entities[1]).unwrap();

        assert_eq!(query.entities(), vec![entities[0], entities[2]]);
        assert!(!query.contains(entities[1]));
    }

    #[test]
    fn callbacks_fire_once_per_transition_in_order() {
        let mut world = World::new();
        let query = world.query_for::<(Health, Poisoned)>().unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = log.clone();
        query.on_add(move |e| first.borrow_mut().push(("add-1", e)));
        let second = log.clone();
        query.on_add(move |e| second.borrow_mut().push(("add-2", e)));
        let removed = log.clone();
        query.on_remove(move |e| removed.borrow_mut().push(("remove", e)));

        let entity = world.spawn();
        world.insert(entity, Health(10)).unwrap();
        assert!(log.borrow().is_empty());

        world.insert(entity, Poisoned).unwrap();
        world.insert(entity, Health(3)).unwrap();
        world.remove::<Poisoned>(entity).unwrap();
        world.remove::<Poisoned>(entity).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![("add-1", entity), ("add-2", entity), ("remove", entity)]
        );
    }

    #[test]
    fn late_observers_are_not_retroactive() {
        let mut world = World::new();
        let entity = world.spawn();
        world.insert(entity, Health(1)).unwrap();

        let query = world.query_for::<(Health,)>().unwrap();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        query.on_add(move |_| *counter.borrow_mut() += 1);

        assert_eq!(query.entities(), vec![entity]);
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn identical_masks_are_independent() {
        let mut world = World::new();
        let a = world.query_for::<(Health,)>().unwrap();
        let b = world.query_for::<(Health,)>().unwrap();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        a.on_add(move |_| *counter.borrow_mut() += 1);

        let entity = world.spawn();
        world.insert(entity, Health(1)).unwrap();

        assert_eq!(a.entities(), b.entities());
        assert_eq!(*hits.borrow(), 1);
        drop(a);
        world.remove::<Health>(entity).unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn clones_keep_the_match_set_alive() {
        let mut world = World::new();
        let entity = world.spawn();
        let keeper = {
            let query = world.query_for::<(Health,)>().unwrap();
            query.clone()
        };
        world.insert(entity, Health(4)).unwrap();
        assert_eq!(keeper.entities(), vec![entity]);
    }

    #[test]
    fn mutable_visit_defers_structural_changes() {
        let mut world = World::new();
        let entities: Vec<Entity> = (0..3).map(|_| world.spawn()).collect();
        for &entity in &entities {
            world.insert(entity, Health(5)).unwrap();
        }
        let query = world.query_for::<(Health,)>().unwrap();

        let mut visited = Vec::new();
        query.for_each_mut(&mut world, |world, entity| {
            visited.push(entity);
            for &other in &entities {
                world.remove::<Health>(other).unwrap();
            }
            assert!(world.has::<Health>(entity));
        });

        assert_eq!(visited, entities);
        assert!(query.is_empty());
        assert!(entities.iter().all(|&e| !world.has::<Health>(e)));
    }

    #[test]
    fn component_metadata_is_visited() {
        let mut world = World::new();
        let query = world.query_for::<(Poisoned, Health)>().unwrap();
        let mut names = Vec::new();
        query.for_each_component(&world, |meta| names.push(meta.name()));
        assert_eq!(names, vec!["Poisoned", "Health"]);
    }
}
