//! Ark Engine Core
//!
//! Contains the runtime the rest of the engine is built on:
//! - Entity Component System (registry, queries, systems, scene)
//! - Deterministic frame clock

pub mod ecs;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for writing components and systems.
pub mod prelude {
    pub use crate::component;
    pub use crate::ecs::{
        Component, ComponentMask, ComponentSet, Entity, Message, MessageId, Query, Renderer,
        Scene, System, SystemContext, SystemSetup, World, WorldError,
    };
    pub use crate::time::FrameClock;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
