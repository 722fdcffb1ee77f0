//! # Convo Editor
//!
//! Keeps a client's copy of a chat in step with the server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ transport: server frames in, requests out   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: subscription lifecycle             │
//! │  - Snapshot / mutation ordering             │
//! │  - Echo suppression for own requests        │
//! │  - Resync when the replica diverges         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ replica: document + streaming buffers       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ events: confirmed text, finished streams    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Server authority**: a snapshot always wins over local state
//! 2. **Ordered application**: mutations apply exactly in arrival order
//! 3. **No fabrication**: a ref to missing structure is a desync, never a stub
//! 4. **Confirmed text only**: half-streamed links and images stay buffered
//!
//! ## Usage
//!
//! ```rust,ignore
//! use convo_editor::{ChatSession, SessionConfig};
//!
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut session = ChatSession::open("chat-1", tx, SessionConfig::default())?;
//!
//! session.subscribe(|event: &ReplicaEvent| println!("{event:?}"));
//!
//! for frame in incoming {
//!     session.handle_text(&frame)?;
//! }
//! ```

mod config;
mod errors;
mod events;
mod message_buffer;
mod mutations;
mod protocol;
mod replica;
mod session;
mod streams;
mod transport;

pub use config::SessionConfig;
pub use errors::{MutationError, ReplicaError};
pub use events::{EventBus, EventListener, EventRecorder, ReplicaEvent};
pub use message_buffer::{BufferState, MessageBuffer, ResyncStrategy};
pub use mutations::Mutation;
pub use protocol::{ClientMessage, ServerMessage};
pub use replica::Replica;
pub use session::{ChatSession, Handled, PendingMutation, SessionState};
pub use streams::Streams;
pub use transport::{RecordingTransport, Transport, TransportError};

// Re-export document types for convenience
pub use convo_document::{Chat, Document, Message, ObjectRef};
