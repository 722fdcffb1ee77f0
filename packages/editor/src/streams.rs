//! Streaming message bookkeeping
//!
//! One [`MessageBuffer`] per message that is currently receiving deltas. The
//! document only ever holds a buffer's confirmed text; the withheld tail lives
//! here until the construct closes or the message stops streaming.

use std::collections::{HashMap, HashSet};

use convo_document::{Chat, Message};

use crate::events::ReplicaEvent;
use crate::message_buffer::{MessageBuffer, ResyncStrategy};

#[derive(Debug, Clone, Default)]
pub struct Streams {
    buffers: HashMap<String, MessageBuffer>,
    /// Messages whose end of stream has already been reported.
    finalized: HashSet<String>,
    strategy: ResyncStrategy,
}

impl Streams {
    pub fn new(strategy: ResyncStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn is_buffering(&self, message_id: &str) -> bool {
        self.buffers.contains_key(message_id)
    }

    pub fn pending_tail(&self, message_id: &str) -> Option<&str> {
        self.buffers.get(message_id).map(MessageBuffer::pending)
    }

    /// A message was created. Streaming ones get a buffer right away so a
    /// prefix ending inside a link never reaches the document.
    pub fn on_created(&mut self, message: &mut Message) -> Option<ReplicaEvent> {
        self.buffers.remove(&message.id);
        if !message.is_streaming {
            return None;
        }
        self.attach(message)
    }

    /// Route a content delta through the message's buffer.
    pub fn on_append(&mut self, message: &mut Message, delta: &str) -> Option<ReplicaEvent> {
        let attached = !self.buffers.contains_key(&message.id);
        let strategy = self.strategy;
        let buffer = self
            .buffers
            .entry(message.id.clone())
            .or_insert_with(|| strategy.attach(&message.content));

        let changed = buffer.process_delta(delta) || attached;
        if !changed || message.content == buffer.confirmed() {
            return None;
        }

        message.content.clear();
        message.content.push_str(buffer.confirmed());
        Some(confirmed(message))
    }

    /// Content of a streaming message was replaced wholesale.
    pub fn on_content_replaced(&mut self, message: &mut Message) -> Option<ReplicaEvent> {
        if !message.is_streaming {
            self.buffers.remove(&message.id);
            return None;
        }
        self.attach(message)
    }

    /// `is_streaming` was written. A true to false edge finalizes.
    pub fn on_streaming_changed(
        &mut self,
        message: &mut Message,
        was_streaming: bool,
    ) -> Option<ReplicaEvent> {
        if !was_streaming || message.is_streaming {
            return None;
        }

        if let Some(buffer) = self.buffers.remove(&message.id) {
            message.content = buffer.finish();
        }

        if !self.finalized.insert(message.id.clone()) {
            tracing::debug!(message_id = %message.id, "stream already finalized");
            return None;
        }

        tracing::debug!(message_id = %message.id, len = message.content.len(), "stream finished");
        Some(ReplicaEvent::StreamFinished {
            message_id: message.id.clone(),
            content: message.content.clone(),
        })
    }

    /// Drop buffers of messages that left the document.
    pub fn forget<I>(&mut self, message_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        for id in message_ids {
            self.buffers.remove(&id);
        }
    }

    /// A snapshot replaced the document. Finalized ids survive so a re-sent
    /// stream is not reported twice.
    pub fn reset_buffers(&mut self) {
        self.buffers.clear();
    }

    /// A chat arrived in a snapshot. Its streaming messages are buffered
    /// before anyone reads them, so an open construct in the snapshot text
    /// stays withheld.
    pub fn on_snapshot(&mut self, chat: &mut Chat) {
        let streaming = chat
            .message_groups
            .iter_mut()
            .flat_map(|group| group.messages.iter_mut())
            .filter(|message| message.is_streaming);

        for message in streaming {
            self.attach(message);
        }
    }

    /// Session teardown.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.finalized.clear();
    }

    fn attach(&mut self, message: &mut Message) -> Option<ReplicaEvent> {
        let buffer = self.strategy.attach(&message.content);
        let changed = message.content != buffer.confirmed();
        if changed {
            message.content = buffer.confirmed().to_string();
        }
        self.buffers.insert(message.id.clone(), buffer);
        changed.then(|| confirmed(message))
    }
}

fn confirmed(message: &Message) -> ReplicaEvent {
    ReplicaEvent::ContentConfirmed {
        message_id: message.id.clone(),
        content: message.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_document::{ActorId, MessageGroup};

    fn streaming(id: &str, content: &str) -> Message {
        let mut message = Message::streaming(id);
        message.content = content.to_string();
        message
    }

    #[test]
    fn test_append_attaches_by_replay() {
        let mut streams = Streams::new(ResyncStrategy::Replay);
        let mut message = streaming("m1", "See [li");

        streams.on_append(&mut message, "nk](u");
        assert_eq!(message.content, "See ");
        assert_eq!(streams.pending_tail("m1"), Some("[link](u"));

        let event = streams.on_append(&mut message, "rl) ok");
        assert_eq!(message.content, "See [link](url) ok");
        assert!(matches!(event, Some(ReplicaEvent::ContentConfirmed { .. })));
    }

    #[test]
    fn test_withheld_delta_emits_nothing() {
        let mut streams = Streams::new(ResyncStrategy::Replay);
        let mut message = streaming("m1", "");

        assert!(streams.on_append(&mut message, "Hi ").is_some());
        assert!(streams.on_append(&mut message, "[x").is_none());
        assert_eq!(message.content, "Hi ");
    }

    #[test]
    fn test_finalize_flushes_once() {
        let mut streams = Streams::new(ResyncStrategy::Replay);
        let mut message = streaming("m1", "");
        streams.on_append(&mut message, "tail [open");

        message.is_streaming = false;
        let event = streams.on_streaming_changed(&mut message, true);
        assert_eq!(
            event,
            Some(ReplicaEvent::StreamFinished {
                message_id: "m1".to_string(),
                content: "tail [open".to_string(),
            })
        );
        assert!(!streams.is_buffering("m1"));

        message.is_streaming = true;
        assert!(streams.on_streaming_changed(&mut message, false).is_none());
        message.is_streaming = false;
        assert!(streams.on_streaming_changed(&mut message, true).is_none());
    }

    #[test]
    fn test_snapshot_attaches_streaming_messages() {
        let mut streams = Streams::new(ResyncStrategy::Replay);
        let mut group = MessageGroup::new("g1", ActorId::user("u1"));
        group.messages.push(streaming("m1", "See [my li"));
        group.messages.push(Message::new("m2", "Done [x"));
        let mut chat = Chat::new("c1");
        chat.message_groups.push(group);

        streams.on_snapshot(&mut chat);
        let messages = &chat.message_groups[0].messages;
        assert_eq!(messages[0].content, "See ");
        assert_eq!(streams.pending_tail("m1"), Some("[my li"));
        assert_eq!(messages[1].content, "Done [x");
        assert!(!streams.is_buffering("m2"));
    }

    #[test]
    fn test_clear_forgets_finalized() {
        let mut streams = Streams::new(ResyncStrategy::Replay);
        let mut message = streaming("m1", "x");
        message.is_streaming = false;
        assert!(streams.on_streaming_changed(&mut message, true).is_some());

        streams.clear();
        assert!(streams.on_streaming_changed(&mut message, true).is_some());
    }
}
