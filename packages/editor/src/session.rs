//! # Chat Session
//!
//! One client's subscription to one chat.
//!
//! The session owns the replica, feeds it server messages in order, and keeps
//! track of the mutations it issued itself so their echoes are not applied a
//! second time.
//!
//! ## Lifecycle
//!
//! ```text
//! open ──▶ Subscribing ──snapshot──▶ Live ──desync──▶ Desynced
//!                                     ▲                  │
//!                                     └────snapshot──────┘
//! close (from any state) ──▶ Closed
//! ```
//!
//! While not `Live`, incoming mutations are dropped. They would be applied
//! against a document the server no longer agrees with.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use convo_document::{Chat, Document};

use crate::config::SessionConfig;
use crate::errors::ReplicaError;
use crate::events::{EventBus, EventListener, ReplicaEvent};
use crate::mutations::Mutation;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::replica::Replica;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the first snapshot.
    Subscribing,
    Live,
    /// A mutation could not be resolved. Waiting for a fresh snapshot.
    Desynced,
    Closed,
}

/// Mutation waiting for its echo from the server
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub request_id: String,
    pub mutation: Mutation,
    /// Seconds since the epoch when it was issued
    pub timestamp: u64,
}

/// What [`ChatSession::handle`] did with a message
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// Mutation applied to the replica.
    Applied(Vec<ReplicaEvent>),
    /// The document was replaced by a snapshot.
    Snapshot,
    /// Echo of a mutation this session issued; already applied.
    Echo { request_id: String },
    /// Mutation arrived while no trustworthy document was held.
    Dropped,
    /// Nothing to do for the replica.
    Ignored,
}

pub struct ChatSession<T: Transport> {
    id: String,
    chat_id: String,
    replica: Replica,
    transport: T,
    events: EventBus,
    pending: VecDeque<PendingMutation>,
    next_request: u64,
    config: SessionConfig,
    state: SessionState,
    /// A subscribe message for the current desync has been sent.
    resync_sent: bool,
}

impl<T: Transport> ChatSession<T> {
    /// Subscribe to `chat_id`. The document stays empty until the server
    /// answers with a snapshot.
    pub fn open(
        chat_id: impl Into<String>,
        transport: T,
        config: SessionConfig,
    ) -> Result<Self, ReplicaError> {
        let chat_id = chat_id.into();
        let mut session = Self {
            id: format!("{}:{}", config.client_id, chat_id),
            chat_id,
            replica: Replica::new(Document::default()).with_strategy(config.resync_strategy),
            transport,
            events: EventBus::new(),
            pending: VecDeque::new(),
            next_request: 0,
            config,
            state: SessionState::Subscribing,
            resync_sent: false,
        };

        session.send_open()?;
        tracing::info!(session = %session.id, chat = %session.chat_id, "opened chat session");
        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> &Document {
        self.replica.document()
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn chat(&self) -> Option<&Chat> {
        self.replica.chat(&self.chat_id)
    }

    pub fn confirmed_content(&self, message_id: &str) -> Option<&str> {
        self.replica.confirmed_content(message_id)
    }

    pub fn needs_resync(&self) -> bool {
        self.state == SessionState::Desynced
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn version(&self) -> u64 {
        self.replica.version()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn subscribe(&mut self, listener: impl EventListener + 'static) {
        self.events.subscribe(listener);
    }

    /// Decode and handle one raw server frame.
    pub fn handle_text(&mut self, text: &str) -> Result<Handled, ReplicaError> {
        let message = ServerMessage::decode(text).map_err(|e| {
            tracing::warn!(session = %self.id, error = %e, "undecodable server message");
            e
        })?;
        self.handle(message)
    }

    /// Handle one server message, in arrival order.
    pub fn handle(&mut self, message: ServerMessage) -> Result<Handled, ReplicaError> {
        if self.state == SessionState::Closed {
            return Err(ReplicaError::Closed);
        }

        match message {
            ServerMessage::ChatOpened { chat } => Ok(self.apply_snapshot(chat)),

            ServerMessage::NotifyAboutChatMutation {
                request_id,
                mutation,
            } => self.apply_remote(request_id, mutation),

            ServerMessage::Response {
                request_id,
                payload,
                is_error,
            } => {
                if is_error {
                    self.on_error_response(&request_id, &payload)?;
                }
                Ok(Handled::Ignored)
            }

            ServerMessage::Error { error } => {
                tracing::error!(session = %self.id, %error, "server error");
                Ok(Handled::Ignored)
            }

            ServerMessage::Notification { title, message } => {
                tracing::info!(session = %self.id, %title, body = %message, "server notification");
                Ok(Handled::Ignored)
            }

            ServerMessage::Unknown => {
                tracing::debug!(session = %self.id, "ignoring unknown server message");
                Ok(Handled::Ignored)
            }
        }
    }

    /// Apply a mutation locally and send it to the server.
    ///
    /// Returns the request id the server will echo it under.
    pub fn issue(&mut self, mutation: Mutation) -> Result<String, ReplicaError> {
        match self.state {
            SessionState::Live => {}
            SessionState::Closed => return Err(ReplicaError::Closed),
            SessionState::Subscribing | SessionState::Desynced => {
                return Err(ReplicaError::AwaitingSnapshot)
            }
        }

        let events = self.replica.apply(&mutation)?;
        let request_id = self.next_request_id();

        let evicted = self.remember(PendingMutation {
            request_id: request_id.clone(),
            mutation: mutation.clone(),
            timestamp: current_timestamp(),
        });

        let sent = self.transport.send(ClientMessage::DoMutation {
            request_id: request_id.clone(),
            mutation,
        });
        if let Err(e) = sent {
            // Applied here but never reached the server.
            self.pending.retain(|p| p.request_id != request_id);
            tracing::error!(session = %self.id, error = %e, "failed to send mutation");
            if let Err(resync) = self.request_resync(format!("request {request_id} not sent")) {
                tracing::warn!(session = %self.id, error = %resync, "resync request failed");
            }
            return Err(e.into());
        }

        self.events.dispatch(&events);

        // A forgotten request would be applied twice when its echo arrives.
        if let Some(evicted) = evicted {
            let reason = format!("pending echo limit reached; forgot request {evicted}");
            if let Err(resync) = self.request_resync(reason) {
                tracing::warn!(session = %self.id, error = %resync, "resync request failed");
            }
        }
        Ok(request_id)
    }

    /// Ask the server to stop generating in this chat.
    pub fn stop(&mut self) -> Result<(), ReplicaError> {
        if self.state == SessionState::Closed {
            return Err(ReplicaError::Closed);
        }
        let request_id = self.next_request_id();
        self.transport.send(ClientMessage::StopChat {
            chat_id: self.chat_id.clone(),
            request_id,
        })?;
        Ok(())
    }

    /// Unsubscribe and drop all streaming state.
    pub fn close(&mut self) -> Result<(), ReplicaError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        self.state = SessionState::Closed;
        self.replica.clear();
        self.pending.clear();

        let request_id = self.next_request_id();
        self.transport.send(ClientMessage::CloseChat {
            chat_id: self.chat_id.clone(),
            request_id,
        })?;
        tracing::info!(session = %self.id, "closed chat session");
        Ok(())
    }

    /// Discard trust in the local document and ask for a snapshot.
    ///
    /// Only one subscribe message is sent per desync. A failed send can be
    /// retried by calling this again.
    pub fn request_resync(&mut self, reason: impl Into<String>) -> Result<(), ReplicaError> {
        match self.state {
            SessionState::Closed => return Err(ReplicaError::Closed),
            SessionState::Desynced if self.resync_sent => return Ok(()),
            _ => {}
        }

        let reason = reason.into();
        if self.state != SessionState::Desynced {
            tracing::warn!(session = %self.id, %reason, "requesting resync");
            self.state = SessionState::Desynced;
            self.events
                .dispatch(&[ReplicaEvent::ResyncRequested { reason }]);
        }

        self.send_open()?;
        self.resync_sent = true;
        Ok(())
    }

    fn apply_snapshot(&mut self, chat: Chat) -> Handled {
        if chat.id != self.chat_id {
            tracing::warn!(session = %self.id, chat = %chat.id, "snapshot for another chat ignored");
            return Handled::Ignored;
        }

        // Echoes of earlier requests precede the snapshot on an ordered
        // channel; nothing left pending can still be echoed.
        self.pending.clear();
        self.replica.replace_chat(chat);
        self.state = SessionState::Live;
        self.resync_sent = false;

        tracing::debug!(session = %self.id, version = self.replica.version(), "snapshot applied");
        self.events.dispatch(&[ReplicaEvent::SnapshotApplied {
            chat_id: self.chat_id.clone(),
        }]);
        Handled::Snapshot
    }

    fn apply_remote(
        &mut self,
        request_id: Option<String>,
        mutation: Mutation,
    ) -> Result<Handled, ReplicaError> {
        if let Some(request_id) = request_id {
            if self.retire(&request_id) {
                tracing::trace!(session = %self.id, %request_id, "echo suppressed");
                return Ok(Handled::Echo { request_id });
            }
        }

        if self.state != SessionState::Live {
            tracing::debug!(
                session = %self.id,
                kind = mutation.kind(),
                "dropping mutation until next snapshot"
            );
            return Ok(Handled::Dropped);
        }

        match self.replica.apply(&mutation) {
            Ok(events) => {
                self.events.dispatch(&events);
                Ok(Handled::Applied(events))
            }
            Err(e) if e.is_desync() => {
                tracing::error!(
                    session = %self.id,
                    path = %mutation.target(),
                    error = %e,
                    "mutation does not match replica"
                );
                self.request_resync(e.to_string())?;
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.id,
                    kind = mutation.kind(),
                    error = %e,
                    "rejected malformed mutation"
                );
                Err(e.into())
            }
        }
    }

    fn on_error_response(
        &mut self,
        request_id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), ReplicaError> {
        if self.retire(request_id) {
            // The optimistic change is in the document but not on the server.
            return self.request_resync(format!("request {request_id} rejected: {payload}"));
        }
        tracing::warn!(session = %self.id, %request_id, %payload, "request failed");
        Ok(())
    }

    /// Track `pending`, returning the id of the newest request evicted to
    /// make room.
    fn remember(&mut self, pending: PendingMutation) -> Option<String> {
        let mut evicted = None;
        while self.pending.len() >= self.config.max_pending_echoes.max(1) {
            if let Some(oldest) = self.pending.pop_front() {
                tracing::warn!(
                    session = %self.id,
                    request_id = %oldest.request_id,
                    "pending echo limit reached; forgetting oldest request"
                );
                evicted = Some(oldest.request_id);
            }
        }
        self.pending.push_back(pending);
        evicted
    }

    fn retire(&mut self, request_id: &str) -> bool {
        match self.pending.iter().position(|p| p.request_id == request_id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    fn send_open(&mut self) -> Result<(), ReplicaError> {
        let request_id = self.next_request_id();
        self.transport.send(ClientMessage::OpenChat {
            chat_id: self.chat_id.clone(),
            request_id,
        })?;
        Ok(())
    }

    fn next_request_id(&mut self) -> String {
        let id = format!("{}-{}", self.id, self.next_request);
        self.next_request += 1;
        id
    }
}

impl<T: Transport> std::fmt::Debug for ChatSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("version", &self.replica.version())
            .field("pending", &self.pending.len())
            .finish()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
