use serde::{Deserialize, Serialize};

/// Typed event queue filled during a tick and drained by its owner.
///
/// Producers only push; the single owner drains once per tick, so an entry
/// is observed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbox<E> {
    queue: Vec<E>,
}

impl<E> Default for Outbox<E> {
    fn default() -> Self {
        Self { queue: Vec::new() }
    }
}

impl<E> Outbox<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: E) {
        self.queue.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = E>) {
        self.queue.extend(events);
    }

    /// Take every queued entry, leaving the outbox empty.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> &[E] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
