use std::sync::{Arc, Mutex, PoisonError};

/// Event names a raw client can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A fatal error that was not tied to any pending operation.
    Error,
    /// A pooled connection was handed to a caller.
    Acquire,
    /// The pool opened a new physical connection.
    Connection,
    /// An acquire had to wait for a free slot.
    Enqueue,
    /// A pooled connection was handed back.
    Release,
}

/// Payload delivered to event handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Error { message: String },
    Acquire { thread_id: u64 },
    Connection { thread_id: u64 },
    Enqueue,
    Release { thread_id: u64 },
}

impl ClientEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Error { .. } => EventKind::Error,
            ClientEvent::Acquire { .. } => EventKind::Acquire,
            ClientEvent::Connection { .. } => EventKind::Connection,
            ClientEvent::Enqueue => EventKind::Enqueue,
            ClientEvent::Release { .. } => EventKind::Release,
        }
    }
}

/// Subscriber callback; may be invoked from any thread.
pub type EventHandler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Shared subscriber list used by the bundled raw clients.
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: Arc<Mutex<Vec<(EventKind, EventHandler)>>>,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future event of `kind`.
    pub fn on(&self, kind: EventKind, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, handler));
    }

    /// Deliver `event` to its subscribers. Returns how many handlers ran.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        let kind = event.kind();
        // Snapshot so handlers may subscribe further without deadlocking.
        let matching: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in &matching {
            handler(event);
        }
        matching.len()
    }

    #[must_use]
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(k, _)| *k == kind)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("EventEmitter")
            .field("handlers", &count)
            .finish()
    }
}
