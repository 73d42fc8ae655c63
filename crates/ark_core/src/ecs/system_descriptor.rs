use crate::ecs::{Component, ComponentId, ComponentMask, ComponentRegistry, ComponentSet};

/// What a system declared during `init`: its name and required components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    required: Vec<ComponentId>,
    unsatisfiable: Vec<&'static str>,
}

impl SystemDescriptor {
    /// Create a new descriptor with the provided name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: Vec::new(),
            unsatisfiable: Vec::new(),
        }
    }

    /// Append a single required component.
    pub fn add_required(&mut self, component: ComponentId) {
        if let Err(pos) = self.required.binary_search(&component) {
            self.required.insert(pos, component);
        }
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required component ids, sorted and deduplicated.
    pub fn required(&self) -> &[ComponentId] {
        &self.required
    }

    /// Requirements that could not be registered.
    pub fn unsatisfiable(&self) -> &[&'static str] {
        &self.unsatisfiable
    }

    /// A system with an unregistrable requirement matches nothing.
    pub fn is_satisfiable(&self) -> bool {
        self.unsatisfiable.is_empty()
    }

    /// Whether the descriptor requires any components at all.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.unsatisfiable.is_empty()
    }

    pub fn mask(&self) -> ComponentMask {
        self.required.iter().copied().collect()
    }
}

/// Handed to [`System::init`](crate::ecs::System::init) to declare
/// requirements. Ids are assigned on demand.
pub struct SystemSetup<'a> {
    registry: &'a mut ComponentRegistry,
    descriptor: SystemDescriptor,
}

impl<'a> SystemSetup<'a> {
    pub(crate) fn new(registry: &'a mut ComponentRegistry, name: &str) -> Self {
        Self {
            registry,
            descriptor: SystemDescriptor::new(name),
        }
    }

    /// Require component `T` on every entity this system processes.
    pub fn require<T: Component>(&mut self) -> &mut Self {
        match self.registry.register_or_get_id::<T>() {
            Ok(id) => self.descriptor.add_required(id),
            Err(err) => {
                tracing::warn!(
                    system = self.descriptor.name(),
                    component = T::name(),
                    %err,
                    "requirement cannot be registered; system will match nothing"
                );
                self.descriptor.unsatisfiable.push(T::name());
            }
        }
        self
    }

    /// Require every member of a tuple of components.
    pub fn require_set<C: ComponentSet>(&mut self) -> &mut Self {
        match C::mask(self.registry) {
            Ok(mask) => mask.iter().for_each(|id| self.descriptor.add_required(id)),
            Err(err) => {
                tracing::warn!(
                    system = self.descriptor.name(),
                    %err,
                    "requirement set cannot be registered; system will match nothing"
                );
                self.descriptor.unsatisfiable.push(std::any::type_name::<C>());
            }
        }
        self
    }

    /// Read access to registered metadata during setup.
    pub fn registry(&self) -> &ComponentRegistry {
        self.registry
    }

    pub fn descriptor(&self) -> &SystemDescriptor {
        &self.descriptor
    }

    pub(crate) fn finish(self) -> SystemDescriptor {
        self.descriptor
    }
}
