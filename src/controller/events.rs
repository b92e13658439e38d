//! # Controller Events
//!
//! Observer registry for the events a controller publishes to its clients.

use std::fmt;

/// Events published by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The device channel is up; subscriptions are now accepted.
    Ready,
    /// An analog pin received a new value.
    AnalogRead { port: usize, value: u16 },
}

/// Callback receiving controller events.
pub type Listener = Box<dyn FnMut(&ControllerEvent) + Send>;

/// Handle returned by [`EventListeners::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners, called in registration order.
#[derive(Default)]
pub struct EventListeners {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &ControllerEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
