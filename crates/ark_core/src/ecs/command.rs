// command.rs - Structural changes recorded during a pass
//
// While a system dispatch or a mutable query iteration is running, the world
// does not change composition. Inserts, removals and despawns are queued here
// in call order and replayed when the outermost pass closes.

use crate::ecs::{ComponentId, Entity, World, WorldError};
use std::collections::VecDeque;

pub(crate) type DeferredInsert = Box<dyn FnOnce(&mut World) -> Result<(), WorldError>>;

pub(crate) enum Command {
    /// Insert a boxed component value; the closure knows its concrete type.
    Insert {
        entity: Entity,
        component: &'static str,
        apply: DeferredInsert,
    },

    Remove { entity: Entity, id: ComponentId },

    Despawn { entity: Entity },
}

impl Command {
    pub(crate) fn entity(&self) -> Entity {
        match self {
            Command::Insert { entity, .. }
            | Command::Remove { entity, .. }
            | Command::Despawn { entity } => *entity,
        }
    }
}

#[derive(Default)]
pub(crate) struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub(crate) fn pop(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
