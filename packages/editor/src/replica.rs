//! # Replica
//!
//! Client-side copy of the server's document. Mutations are applied in the
//! order they arrive; a snapshot replaces everything.

use convo_document::{Chat, Document};

use crate::errors::MutationError;
use crate::events::ReplicaEvent;
use crate::message_buffer::ResyncStrategy;
use crate::mutations::Mutation;
use crate::streams::Streams;

/// Mirrored document plus per-message streaming state
#[derive(Debug, Clone, Default)]
pub struct Replica {
    document: Document,
    streams: Streams,
    /// Incremented on every applied mutation and snapshot
    version: u64,
}

impl Replica {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            streams: Streams::default(),
            version: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: ResyncStrategy) -> Self {
        self.streams = Streams::new(strategy);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.document.chat(chat_id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Confirmed text of a message, the only text that is safe to show.
    pub fn confirmed_content(&self, message_id: &str) -> Option<&str> {
        self.document
            .find_message(message_id)
            .map(|message| message.content.as_str())
    }

    /// Text withheld for a message that is mid-construct.
    pub fn pending_tail(&self, message_id: &str) -> Option<&str> {
        self.streams.pending_tail(message_id)
    }

    pub fn is_buffering(&self, message_id: &str) -> bool {
        self.streams.is_buffering(message_id)
    }

    /// Apply one mutation.
    ///
    /// On error the document is unchanged, except that a
    /// [`MutationError::Desync`] means it can no longer be trusted at all.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<Vec<ReplicaEvent>, MutationError> {
        let events = mutation.apply(&mut self.document, &mut self.streams)?;
        self.version += 1;

        tracing::debug!(
            kind = mutation.kind(),
            path = %mutation.target(),
            version = self.version,
            "applied mutation"
        );
        Ok(events)
    }

    /// Replace the document with a snapshot.
    pub fn replace(&mut self, document: Document) {
        self.document = document;
        self.streams.reset_buffers();
        for chat in &mut self.document.assets {
            self.streams.on_snapshot(chat);
        }
        self.version += 1;
    }

    /// Replace or add a single chat from a snapshot.
    ///
    /// Buffers of other chats are kept.
    pub fn replace_chat(&mut self, mut chat: Chat) {
        if let Some(existing) = self.document.chat(&chat.id) {
            self.streams.forget(message_ids(existing));
        }
        self.streams.on_snapshot(&mut chat);
        match self.document.chat_mut(&chat.id) {
            Some(existing) => *existing = chat,
            None => self.document.assets.push(chat),
        }
        self.version += 1;
    }

    /// Teardown: drop all streaming state.
    pub fn clear(&mut self) {
        self.streams.clear();
    }
}

fn message_ids(chat: &Chat) -> Vec<String> {
    chat.message_groups
        .iter()
        .flat_map(|group| group.messages.iter())
        .map(|message| message.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_document::{ActorId, Message, MessageGroup, ObjectRef};
    use serde_json::json;

    fn message_ref(id: &str) -> ObjectRef {
        ObjectRef::asset("c1")
            .collection("message_groups")
            .object("g1")
            .collection("messages")
            .object(id)
    }

    fn replica() -> Replica {
        let mut group = MessageGroup::new("g1", ActorId::agent("coder"));
        group.messages.push(Message::streaming("m1"));
        let mut chat = Chat::new("c1");
        chat.message_groups.push(group);
        Replica::new(Document::with_chat(chat))
    }

    #[test]
    fn test_version_increments() {
        let mut replica = replica();
        assert_eq!(replica.version(), 0);

        replica
            .apply(&Mutation::append(message_ref("m1"), "content", "hi"))
            .unwrap();
        assert_eq!(replica.version(), 1);

        replica.replace(Document::default());
        assert_eq!(replica.version(), 2);
    }

    #[test]
    fn test_failed_mutation_keeps_version() {
        let mut replica = replica();
        let err = replica
            .apply(&Mutation::set_value(message_ref("m1"), "is_streaming", json!("yes")))
            .unwrap_err();

        assert!(!err.is_desync());
        assert_eq!(replica.version(), 0);
        assert!(replica.document().find_message("m1").unwrap().is_streaming);
    }

    #[test]
    fn test_replace_chat_swaps_in_place() {
        let mut replica = replica();
        let mut fresh = Chat::new("c1");
        fresh.name = "Renamed".to_string();

        replica.replace_chat(fresh);
        assert_eq!(replica.document().assets.len(), 1);
        assert_eq!(replica.chat("c1").unwrap().name, "Renamed");

        replica.replace_chat(Chat::new("c2"));
        assert_eq!(replica.document().assets.len(), 2);
    }

    #[test]
    fn test_replace_chat_withholds_open_link() {
        let mut replica = replica();
        let mut message = Message::streaming("m1");
        message.content = "See [my li".to_string();
        let mut group = MessageGroup::new("g1", ActorId::agent("coder"));
        group.messages.push(message);
        let mut fresh = Chat::new("c1");
        fresh.message_groups.push(group);

        replica.replace_chat(fresh);
        assert_eq!(replica.confirmed_content("m1"), Some("See "));
        assert_eq!(replica.pending_tail("m1"), Some("[my li"));

        replica
            .apply(&Mutation::append(message_ref("m1"), "content", "nk](x)"))
            .unwrap();
        assert_eq!(replica.confirmed_content("m1"), Some("See [my link](x)"));
    }

    #[test]
    fn test_replace_chat_drops_buffers_of_removed_messages() {
        let mut replica = replica();
        replica
            .apply(&Mutation::append(message_ref("m1"), "content", "a [b"))
            .unwrap();
        assert!(replica.is_buffering("m1"));

        replica.replace_chat(Chat::new("c1"));
        assert!(!replica.is_buffering("m1"));
    }

    #[test]
    fn test_confirmed_and_pending_split() {
        let mut replica = replica();
        replica
            .apply(&Mutation::append(message_ref("m1"), "content", "a [b"))
            .unwrap();

        assert_eq!(replica.confirmed_content("m1"), Some("a "));
        assert_eq!(replica.pending_tail("m1"), Some("[b"));
        assert!(replica.is_buffering("m1"));
    }
}
