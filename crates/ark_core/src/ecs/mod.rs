//! Entity Component System core types.
//!
//! Components live in per-type pools owned by the [`ComponentRegistry`],
//! addressed through small dense ids. Entities carry a 64-bit composition
//! mask; systems and queries declare a required mask and keep ordered lists
//! of the entities that satisfy it, updated incrementally on every
//! structural change.

mod command;
mod component;
mod component_set;
mod entity;
mod error;
mod message;
mod meta;
mod query;
mod registry;
mod scene;
mod storage;
mod system;
mod system_descriptor;
mod system_manager;
mod world;

pub use component::{short_type_name, Component, ComponentId, ComponentMask, MAX_COMPONENT_TYPES};
pub use component_set::ComponentSet;
pub use entity::{Entity, EntityMut, EntityRef};
pub use error::{RegistryError, WorldError};
pub use message::{Message, MessageBus, MessageId};
pub use meta::{ComponentMeta, FieldMeta, InsertDefaultFn, MetaBuilder};
pub use query::Query;
pub use registry::ComponentRegistry;
pub use scene::{Scene, WorldMut};
pub use storage::ComponentPool;
pub use system::{AsAny, Renderer, System, SystemContext};
pub use system_descriptor::{SystemDescriptor, SystemSetup};
pub use system_manager::SystemManager;
pub use world::{ComponentRef, World};
