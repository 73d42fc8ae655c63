// component.rs - Component identity and bitmask vocabulary
//
// Components are identified by small dense ids (0..64) handed out by the
// ComponentRegistry the first time a type is seen. A ComponentMask is the
// 64-bit set of those ids and is shared by entities, systems and queries.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Hard capacity of the registry. Each id maps to one bit of a `ComponentMask`.
pub const MAX_COMPONENT_TYPES: usize = 64;

/// Marker for plain data stored in per-type pools.
///
/// Implement it with the [`component!`](crate::component) macro:
///
/// ```ignore
/// struct Position { x: f32, y: f32 }
/// ark_core::component!(Position);
/// ```
pub trait Component: 'static {
    /// Human-readable name used for logging and name-based lookup.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Implement [`Component`] for one or more types.
#[macro_export]
macro_rules! component {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::ecs::Component for $ty {})+
    };
}

/// Strip the module path from a type name (`game::Position` -> `Position`).
///
/// Generic arguments are kept intact.
pub fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Dense component type identifier in `0..MAX_COMPONENT_TYPES`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u8);

impl ComponentId {
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        (index < MAX_COMPONENT_TYPES).then(|| Self(index as u8))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn bit(self) -> u64 {
        1u64 << self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-width set of component ids.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Builder-style insert.
    pub fn with(mut self, id: ComponentId) -> Self {
        self.insert(id);
        self
    }

    #[inline]
    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= id.bit();
    }

    #[inline]
    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !id.bit();
    }

    #[inline]
    pub fn contains(self, id: ComponentId) -> bool {
        self.0 & id.bit() != 0
    }

    /// `true` when every bit of `required` is also set here.
    #[inline]
    pub fn contains_all(self, required: ComponentMask) -> bool {
        self.0 & required.0 == required.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Ids in ascending order.
    pub fn iter(self) -> impl Iterator<Item = ComponentId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros() as u8;
            bits &= bits - 1;
            Some(ComponentId(index))
        })
    }
}

impl FromIterator<ComponentId> for ComponentMask {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(ComponentId::index)).finish()
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> ComponentId {
        ComponentId::from_index(index).unwrap()
    }

    #[test]
    fn ids_outside_capacity_are_rejected() {
        assert!(ComponentId::from_index(63).is_some());
        assert!(ComponentId::from_index(64).is_none());
    }

    #[test]
    fn superset_check_matches_required_bits() {
        let required = ComponentMask::EMPTY.with(id(0)).with(id(1));
        let position_only = ComponentMask::EMPTY.with(id(0));
        let full = position_only.with(id(1)).with(id(5));

        assert!(!position_only.contains_all(required));
        assert!(full.contains_all(required));
        assert!(full.contains_all(ComponentMask::EMPTY));
    }

    #[test]
    fn iteration_is_ascending() {
        let mask: ComponentMask = [id(9), id(2), id(63)].into_iter().collect();
        let ids: Vec<usize> = mask.iter().map(ComponentId::index).collect();
        assert_eq!(ids, vec![2, 9, 63]);
        assert_eq!(mask.len(), 3);
    }

    #[test]
    fn short_names_drop_module_paths() {
        assert_eq!(short_type_name("game::physics::Velocity"), "Velocity");
        assert_eq!(short_type_name("Health"), "Health");
    }
}
