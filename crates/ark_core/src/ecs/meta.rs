// meta.rs - Type-id keyed component metadata and capability table
//
// Scripting and persistence layers never see Rust types. They look up a
// ComponentMeta by id or name and call capability function pointers that were
// registered at startup through `World::describe::<T>()`.

use crate::ecs::{Component, ComponentId, Entity, World, WorldError};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Inserts a default-constructed component into an entity.
pub type InsertDefaultFn = fn(&mut World, Entity) -> Result<(), WorldError>;

/// A named, typed field exposed to external layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub type_name: &'static str,
}

/// Metadata describing one registered component type.
pub struct ComponentMeta {
    id: ComponentId,
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldMeta>,
    insert_default: Option<InsertDefaultFn>,
    services: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl ComponentMeta {
    pub(crate) fn new<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: T::name(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            fields: Vec::new(),
            insert_default: None,
            services: HashMap::new(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Registered name; defaults to the short type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn is_constructible(&self) -> bool {
        self.insert_default.is_some()
    }

    pub(crate) fn insert_default_fn(&self) -> Option<InsertDefaultFn> {
        self.insert_default
    }

    /// Fetch a capability registered under `name`.
    ///
    /// `F` must be exactly the type the service was registered with,
    /// typically a function pointer such as `fn(&dyn Any) -> String`.
    pub fn service<F: Copy + 'static>(&self, name: &str) -> Option<F> {
        self.services.get(name)?.downcast_ref::<F>().copied()
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.services.keys().copied()
    }
}

impl fmt::Debug for ComponentMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut services: Vec<_> = self.services.keys().collect();
        services.sort_unstable();
        f.debug_struct("ComponentMeta")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("constructible", &self.is_constructible())
            .field("services", &services)
            .finish()
    }
}

/// Builder returned by [`World::describe`] to enrich a type's metadata.
pub struct MetaBuilder<'a, T> {
    meta: &'a mut ComponentMeta,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Component> MetaBuilder<'a, T> {
    pub(crate) fn new(meta: &'a mut ComponentMeta) -> Self {
        Self {
            meta,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.meta.id
    }

    /// Override the name used for name-based lookup.
    pub fn name(self, name: &'static str) -> Self {
        self.meta.name = name;
        self
    }

    /// Declare a field of type `F`. Redeclaring a field replaces it.
    pub fn field<F: 'static>(self, name: &'static str) -> Self {
        let field = FieldMeta {
            name,
            type_name: std::any::type_name::<F>(),
        };
        match self.meta.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => *existing = field,
            None => self.meta.fields.push(field),
        }
        self
    }

    /// Attach a capability under `name`, replacing any previous one.
    pub fn service<F>(self, name: &'static str, service: F) -> Self
    where
        F: Copy + Send + Sync + 'static,
    {
        self.meta.services.insert(name, Box::new(service));
        self
    }
}

impl<'a, T: Component + Default> MetaBuilder<'a, T> {
    /// Allow instantiation by name through `World::insert_default_by_name`.
    pub fn constructible(self) -> Self {
        self.meta.insert_default = Some(insert_default::<T>);
        self
    }
}

fn insert_default<T: Component + Default>(world: &mut World, entity: Entity) -> Result<(), WorldError> {
    world.insert(entity, T::default())
}
