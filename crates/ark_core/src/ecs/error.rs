use crate::ecs::{ComponentId, Entity};
use thiserror::Error;

/// Failures raised by the component registry and its pools.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("component capacity of {max} types exhausted; '{type_name}' is unsupported")]
    CapacityExceeded { type_name: &'static str, max: usize },

    #[error("component id {id} is not registered")]
    UnknownComponent { id: ComponentId },

    #[error("slot {slot} is out of range for '{component}' (pool length {len})")]
    SlotOutOfRange {
        component: &'static str,
        slot: usize,
        len: usize,
    },

    #[error("slot {slot} of '{component}' has been released")]
    SlotReleased { component: &'static str, slot: usize },

    #[error("component id {id} stores '{stored}', not '{requested}'")]
    TypeMismatch {
        id: ComponentId,
        stored: &'static str,
        requested: &'static str,
    },
}

/// Failures raised by entity-level world operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity {entity} is not alive")]
    StaleEntity { entity: Entity },

    #[error("no component named '{name}' is registered")]
    UnknownComponentName { name: String },

    #[error("component '{name}' has no default constructor registered")]
    NotConstructible { name: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
