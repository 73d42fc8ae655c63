// system.rs - The capability interface every system implements
//
// A system declares its required components once, in `init`, and from then
// on receives the ordered list of matching entities on each dispatch. Every
// method has a default so a system only implements what it uses.

use crate::ecs::{Entity, Message, MessageBus, MessageId, SystemSetup, World};
use crate::time::FrameClock;
use std::any::Any;
use std::time::Duration;

/// Upcasting helpers used for typed retrieval of boxed systems.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Per-frame logic over the entities matching a fixed component mask.
pub trait System: AsAny {
    /// Name used in logs and profiler output.
    fn name(&self) -> &str {
        crate::ecs::short_type_name(std::any::type_name::<Self>())
    }

    /// Declare required components. Called exactly once, before the mask is
    /// built.
    fn init(&mut self, _setup: &mut SystemSetup<'_>) {}

    fn update(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// Immediate, application-defined event (input, window, etc).
    fn handle_event(&mut self, _ctx: &mut SystemContext<'_>, _event: &dyn Any) {}

    /// Message posted on the previous frame.
    fn handle_message(&mut self, _ctx: &mut SystemContext<'_>, _message: &Message) {}

    /// `entity` started matching this system.
    fn on_entity_added(&mut self, _world: &World, _entity: Entity) {}

    /// `entity` stopped matching, or was despawned (in which case it is no
    /// longer alive in `world`).
    fn on_entity_removed(&mut self, _world: &World, _entity: Entity) {}

    /// Systems that draw return themselves here.
    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        None
    }
}

/// Drawing capability. `target` is whatever surface the host passes to
/// `Scene::render`.
pub trait Renderer {
    fn render(&mut self, world: &World, target: &mut dyn Any);
}

/// Everything a system can touch during a dispatch.
///
/// Structural changes made through `world_mut` are deferred until the
/// dispatch returns, so `entities` stays stable for the whole call.
pub struct SystemContext<'a> {
    world: &'a mut World,
    entities: &'a [Entity],
    bus: &'a mut MessageBus,
    clock: &'a FrameClock,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(
        world: &'a mut World,
        entities: &'a [Entity],
        bus: &'a mut MessageBus,
        clock: &'a FrameClock,
    ) -> Self {
        Self {
            world,
            entities,
            bus,
            clock,
        }
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    /// Matching entities in the order they started matching.
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    pub fn for_each(&mut self, mut visit: impl FnMut(&mut World, Entity)) {
        for &entity in self.entities {
            visit(&mut *self.world, entity);
        }
    }

    /// Queue a message for delivery at the start of the next frame.
    pub fn post_message<T: Any>(&mut self, id: MessageId, payload: T) {
        self.bus.post(id, payload);
    }

    pub fn delta(&self) -> Duration {
        self.clock.delta()
    }

    pub fn clock(&self) -> &FrameClock {
        self.clock
    }
}
