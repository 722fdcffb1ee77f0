//! # Replica Events
//!
//! Applying a mutation can matter to more than the document. A streaming
//! message that gains confirmed text should be re-rendered; one that stops
//! streaming should be read aloud once. The replica reports these as
//! [`ReplicaEvent`]s and the session hands them to every registered
//! [`EventListener`].
//!
//! Events are:
//! - **Derived**: they describe what a mutation did, never add to it
//! - **Ordered**: listeners see them in the order mutations were applied

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Something a listener may want to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaEvent {
    /// Confirmed text of a streaming message changed.
    ContentConfirmed { message_id: String, content: String },

    /// A message stopped streaming. Emitted at most once per message id.
    StreamFinished { message_id: String, content: String },

    /// The document was replaced by a server snapshot.
    SnapshotApplied { chat_id: String },

    /// The session asked the server for a fresh snapshot.
    ResyncRequested { reason: String },
}

impl ReplicaEvent {
    pub fn message_id(&self) -> Option<&str> {
        match self {
            ReplicaEvent::ContentConfirmed { message_id, .. }
            | ReplicaEvent::StreamFinished { message_id, .. } => Some(message_id),
            ReplicaEvent::SnapshotApplied { .. } | ReplicaEvent::ResyncRequested { .. } => None,
        }
    }
}

/// Receives replica events
pub trait EventListener {
    fn on_event(&mut self, event: &ReplicaEvent);
}

impl<F> EventListener for F
where
    F: FnMut(&ReplicaEvent),
{
    fn on_event(&mut self, event: &ReplicaEvent) {
        self(event)
    }
}

/// Listener that keeps every event it sees. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<ReplicaEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReplicaEvent> {
        self.events.borrow().clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<ReplicaEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Messages that finished streaming, in order.
    pub fn finished(&self) -> Vec<(String, String)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ReplicaEvent::StreamFinished {
                    message_id,
                    content,
                } => Some((message_id.clone(), content.clone())),
                _ => None,
            })
            .collect()
    }
}

impl EventListener for EventRecorder {
    fn on_event(&mut self, event: &ReplicaEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Fan-out of events to registered listeners
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl EventListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn dispatch(&mut self, events: &[ReplicaEvent]) {
        for event in events {
            for listener in &mut self.listeners {
                listener.on_event(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
