// storage.rs - Per-type component pools with slot reuse
//
// Each registered component type owns exactly one pool. Slots are addressed
// by index and never move; removal pushes the slot onto a LIFO free list so
// the next allocation of that type lands in the most recently vacated slot.

use crate::ecs::{Component, RegistryError};
use std::any::Any;

/// Dense storage for a single component type.
pub struct ComponentPool<T> {
    name: &'static str,
    slots: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new() -> Self {
        Self {
            name: T::name(),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Store `value`, reusing the most recently freed slot before growing.
    pub fn allocate(&mut self, value: T) -> (usize, &mut T) {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        (slot, self.slots[slot].insert(value))
    }

    pub fn get(&self, slot: usize) -> Result<&T, RegistryError> {
        match self.slots.get(slot) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(self.released(slot)),
            None => Err(self.out_of_range(slot)),
        }
    }

    pub fn get_mut(&mut self, slot: usize) -> Result<&mut T, RegistryError> {
        let len = self.slots.len();
        let name = self.name;
        match self.slots.get_mut(slot) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(RegistryError::SlotReleased {
                component: name,
                slot,
            }),
            None => Err(RegistryError::SlotOutOfRange {
                component: name,
                slot,
                len,
            }),
        }
    }

    /// Iterate live slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| value.as_ref().map(|value| (slot, value)))
    }

    fn released(&self, slot: usize) -> RegistryError {
        RegistryError::SlotReleased {
            component: self.name,
            slot,
        }
    }

    fn out_of_range(&self, slot: usize) -> RegistryError {
        RegistryError::SlotOutOfRange {
            component: self.name,
            slot,
            len: self.slots.len(),
        }
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe view over a `ComponentPool<T>`, selected by component id.
pub(crate) trait ErasedPool {
    fn component_name(&self) -> &'static str;

    /// Total slots, live and free.
    fn len(&self) -> usize;

    fn free_len(&self) -> usize;

    /// Drop the value in `slot` and push the slot onto the free list.
    fn release(&mut self, slot: usize) -> Result<(), RegistryError>;

    fn get_any(&self, slot: usize) -> Result<&dyn Any, RegistryError>;

    fn get_any_mut(&mut self, slot: usize) -> Result<&mut dyn Any, RegistryError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn component_name(&self) -> &'static str {
        self.name
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn free_len(&self) -> usize {
        self.free.len()
    }

    fn release(&mut self, slot: usize) -> Result<(), RegistryError> {
        let len = self.slots.len();
        let cell = self.slots.get_mut(slot).ok_or(RegistryError::SlotOutOfRange {
            component: self.name,
            slot,
            len,
        })?;
        if cell.take().is_none() {
            return Err(RegistryError::SlotReleased {
                component: self.name,
                slot,
            });
        }
        self.free.push(slot);
        Ok(())
    }

    fn get_any(&self, slot: usize) -> Result<&dyn Any, RegistryError> {
        self.get(slot).map(|value| value as &dyn Any)
    }

    fn get_any_mut(&mut self, slot: usize) -> Result<&mut dyn Any, RegistryError> {
        self.get_mut(slot).map(|value| value as &mut dyn Any)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(i32);
    crate::component!(Health);

    #[test]
    fn released_slots_are_reused_lifo() {
        let mut pool = ComponentPool::<Health>::new();
        let (a, _) = pool.allocate(Health(1));
        let (b, _) = pool.allocate(Health(2));
        let (c, _) = pool.allocate(Health(3));
        assert_eq!((a, b, c), (0, 1, 2));

        pool.release(a).unwrap();
        pool.release(c).unwrap();

        let (reused, value) = pool.allocate(Health(30));
        assert_eq!(reused, c);
        assert_eq!(*value, Health(30));
        assert_eq!(pool.allocate(Health(10)).0, a);
        assert_eq!(pool.allocate(Health(4)).0, 3);
        assert_eq!(ErasedPool::len(&pool), 4);
    }

    #[test]
    fn released_values_are_dropped_immediately() {
        use std::rc::Rc;

        struct Tracked(Rc<()>);
        crate::component!(Tracked);

        let marker = Rc::new(());
        let mut pool = ComponentPool::<Tracked>::new();
        let (slot, _) = pool.allocate(Tracked(marker.clone()));
        assert_eq!(Rc::strong_count(&marker), 2);

        pool.release(slot).unwrap();
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn bad_slots_report_errors() {
        let mut pool = ComponentPool::<Health>::new();
        let (slot, _) = pool.allocate(Health(5));

        assert!(matches!(
            pool.get(7),
            Err(RegistryError::SlotOutOfRange { slot: 7, len: 1, .. })
        ));

        pool.release(slot).unwrap();
        assert!(matches!(pool.get(slot), Err(RegistryError::SlotReleased { .. })));
        assert!(matches!(
            pool.release(slot),
            Err(RegistryError::SlotReleased { .. })
        ));
        assert_eq!(pool.free_len(), 1);
    }
}
