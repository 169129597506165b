//! Observer registry used by controllers to broadcast state changes.
//!
//! Listeners are invoked synchronously, in registration order, before the
//! emitting call returns. Collaborators hold on to the [`ListenerId`] they get
//! back and unsubscribe when they are torn down.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

/// Ordered list of event callbacks.
pub struct Listeners<E> {
    next_id: u64,
    entries: SmallVec<[(ListenerId, Callback<E>); 4]>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: SmallVec::new(),
        }
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<E> Listeners<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it runs after every previously registered one.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        before != self.entries.len()
    }

    /// Deliver `event` to every listener in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
