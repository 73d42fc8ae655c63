//! Component sets for declaring requirements and building queries

use crate::ecs::{Component, ComponentMask, ComponentRegistry, RegistryError};

/// A tuple of component types that together form a mask.
///
/// ```ignore
/// let movers = world.query_for::<(Position, Velocity)>()?;
/// ```
pub trait ComponentSet {
    /// Register every member (if needed) and return the combined mask.
    fn mask(registry: &mut ComponentRegistry) -> Result<ComponentMask, RegistryError>;

    /// Mask of the members that are already registered, without registering.
    fn known_mask(registry: &ComponentRegistry) -> ComponentMask;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn mask(registry: &mut ComponentRegistry) -> Result<ComponentMask, RegistryError> {
                let mut mask = ComponentMask::EMPTY;
                $(mask.insert(registry.register_or_get_id::<$ty>()?);)+
                Ok(mask)
            }

            fn known_mask(registry: &ComponentRegistry) -> ComponentMask {
                let mut mask = ComponentMask::EMPTY;
                $(if let Some(id) = registry.id_of::<$ty>() {
                    mask.insert(id);
                })+
                mask
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
