//! # Convo Document
//!
//! The conversation document a client mirrors from the server, and the
//! machinery for finding things inside it.
//!
//! ## Shape
//!
//! ```text
//! Document
//!  └─ assets: [Chat]
//!      ├─ chat_options: ChatOptions          (slot)
//!      └─ message_groups: [MessageGroup]
//!          ├─ actor_id: ActorId              (slot)
//!          └─ messages: [Message]
//!              └─ tool_calls: [ToolCall]
//! ```
//!
//! The schema is closed: these are the only nestings a [`ObjectRef`] can
//! address, and [`resolve`] rejects anything else.
//!
//! ## Addressing
//!
//! ```rust,ignore
//! use convo_document::{resolve, Document, ObjectRef};
//!
//! let message = ObjectRef::asset("chat-1")
//!     .collection("message_groups")
//!     .object("group-1")
//!     .collection("messages")
//!     .object("msg-1");
//!
//! assert_eq!(
//!     message.segments().to_string(),
//!     "assets/chat-1/message_groups/group-1/messages/msg-1"
//! );
//!
//! let target = resolve(&mut doc, &message)?;
//! // `target` is the `messages` collection of group-1
//! ```

mod error;
mod model;
mod node;
mod refs;
mod resolve;

pub use error::{FieldError, ResolveError};
pub use model::{
    ActorId, ActorKind, Chat, ChatOptions, Document, Message, MessageGroup, Role, ToolCall,
};
pub use node::{Element, Node, NodeKind};
pub use refs::{CollectionRef, ObjectRef, SegmentPath, ROOT_COLLECTION};
pub use resolve::{lookup, resolve, ContainerMut, Detached, NodeMut, NodeRef, Target};
