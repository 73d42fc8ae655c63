//! Frame-delayed message bus
//!
//! Messages posted during frame N are delivered to every active system at
//! the start of frame N+1, before `update`, in posting order.

use std::any::Any;
use std::fmt;

/// Application-defined message discriminator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg#{}", self.0)
    }
}

/// A posted message: an id plus an arbitrary payload.
pub struct Message {
    id: MessageId,
    payload: Box<dyn Any>,
}

impl Message {
    pub fn new<T: Any>(id: MessageId, payload: T) -> Self {
        Self {
            id,
            payload: Box::new(payload),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Payload as `T`, if that is what was posted.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Queue of messages waiting for the next frame.
#[derive(Debug, Default)]
pub struct MessageBus {
    pending: Vec<Message>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post<T: Any>(&mut self, id: MessageId, payload: T) {
        tracing::trace!(%id, "message posted");
        self.pending.push(Message::new(id, payload));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take everything posted so far, in posting order.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.pending)
    }
}
