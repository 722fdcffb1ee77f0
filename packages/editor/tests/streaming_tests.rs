//! Streaming content through the replica: buffering, finalize, teardown

use convo_document::{ActorId, Chat, Document, Message, MessageGroup, ObjectRef};
use convo_editor::{Mutation, Replica, ReplicaEvent, ResyncStrategy};
use serde_json::json;

fn message_ref(id: &str) -> ObjectRef {
    ObjectRef::asset("c1")
        .collection("message_groups")
        .object("g1")
        .collection("messages")
        .object(id)
}

fn replica_with(messages: Vec<Message>) -> Replica {
    let mut group = MessageGroup::new("g1", ActorId::agent("coder"));
    group.messages = messages;
    let mut chat = Chat::new("c1");
    chat.message_groups.push(group);
    Replica::new(Document::with_chat(chat))
}

fn append(replica: &mut Replica, id: &str, delta: &str) -> Vec<ReplicaEvent> {
    replica
        .apply(&Mutation::append(message_ref(id), "content", delta))
        .unwrap()
}

fn stop_streaming(replica: &mut Replica, id: &str) -> Vec<ReplicaEvent> {
    replica
        .apply(&Mutation::set_value(message_ref(id), "is_streaming", json!(false)))
        .unwrap()
}

#[test]
fn test_streaming_and_static_messages_differ_in_timing() {
    let mut replica = replica_with(vec![Message::streaming("live"), Message::new("done", "")]);

    for delta in ["See ", "[my ", "link](http"] {
        append(&mut replica, "live", delta);
        append(&mut replica, "done", delta);
    }

    assert_eq!(replica.confirmed_content("live"), Some("See "));
    assert_eq!(replica.confirmed_content("done"), Some("See [my link](http"));

    append(&mut replica, "live", "://x.com)");
    assert_eq!(
        replica.confirmed_content("live"),
        Some("See [my link](http://x.com)")
    );
}

#[test]
fn test_confirmed_events_follow_buffer() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);

    let events = append(&mut replica, "m1", "Chart: ");
    assert_eq!(events.len(), 1);

    assert!(append(&mut replica, "m1", "![sales]").is_empty());
    assert!(append(&mut replica, "m1", "(sales.png").is_empty());

    let events = append(&mut replica, "m1", ")");
    assert_eq!(
        events,
        vec![ReplicaEvent::ContentConfirmed {
            message_id: "m1".to_string(),
            content: "Chart: ![sales](sales.png)".to_string(),
        }]
    );
}

#[test]
fn test_stop_flushes_dangling_construct_once() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);
    append(&mut replica, "m1", "[dangling");
    assert_eq!(replica.confirmed_content("m1"), Some(""));

    let events = stop_streaming(&mut replica, "m1");
    assert_eq!(
        events,
        vec![ReplicaEvent::StreamFinished {
            message_id: "m1".to_string(),
            content: "[dangling".to_string(),
        }]
    );
    assert_eq!(replica.confirmed_content("m1"), Some("[dangling"));
    assert!(!replica.is_buffering("m1"));

    assert!(stop_streaming(&mut replica, "m1").is_empty());
}

#[test]
fn test_restreaming_does_not_finish_twice() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);
    append(&mut replica, "m1", "one");
    assert_eq!(stop_streaming(&mut replica, "m1").len(), 1);

    replica
        .apply(&Mutation::set_value(message_ref("m1"), "is_streaming", json!(true)))
        .unwrap();
    append(&mut replica, "m1", " two");
    assert!(stop_streaming(&mut replica, "m1").is_empty());
    assert_eq!(replica.confirmed_content("m1"), Some("one two"));
}

#[test]
fn test_stop_without_deltas_still_finishes() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);
    let events = stop_streaming(&mut replica, "m1");
    assert_eq!(
        events,
        vec![ReplicaEvent::StreamFinished {
            message_id: "m1".to_string(),
            content: String::new(),
        }]
    );
}

#[test]
fn test_reattach_mid_construct_replays_history() {
    let mut message = Message::streaming("m1");
    message.content = "Read [the gu".to_string();
    let mut replica = replica_with(vec![message]);

    append(&mut replica, "m1", "ide](docs");
    assert_eq!(replica.confirmed_content("m1"), Some("Read "));

    append(&mut replica, "m1", ".md)");
    assert_eq!(
        replica.confirmed_content("m1"),
        Some("Read [the guide](docs.md)")
    );
}

#[test]
fn test_reattach_with_trusted_seed() {
    let mut message = Message::streaming("m1");
    message.content = "Read [the gu".to_string();
    let mut replica = replica_with(vec![message]).with_strategy(ResyncStrategy::TrustSeed);

    append(&mut replica, "m1", "ide");
    assert_eq!(replica.confirmed_content("m1"), Some("Read [the guide"));
}

#[test]
fn test_content_replaced_while_streaming_is_rebuffered() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);
    append(&mut replica, "m1", "draft");

    replica
        .apply(&Mutation::set_value(
            message_ref("m1"),
            "content",
            json!("Final: [x](y"),
        ))
        .unwrap();
    assert_eq!(replica.confirmed_content("m1"), Some("Final: "));

    append(&mut replica, "m1", ")");
    assert_eq!(replica.confirmed_content("m1"), Some("Final: [x](y)"));
}

#[test]
fn test_delete_drops_buffer() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);
    append(&mut replica, "m1", "a [b");
    assert!(replica.is_buffering("m1"));

    replica.apply(&Mutation::delete(message_ref("m1"))).unwrap();
    assert!(!replica.is_buffering("m1"));
    assert_eq!(replica.confirmed_content("m1"), None);
}

#[test]
fn test_deleting_group_drops_buffers_of_its_messages() {
    let mut replica = replica_with(vec![Message::streaming("m1"), Message::streaming("m2")]);
    append(&mut replica, "m1", "[a");
    append(&mut replica, "m2", "[b");

    let group = ObjectRef::asset("c1").collection("message_groups").object("g1");
    replica.apply(&Mutation::delete(group)).unwrap();

    assert!(!replica.is_buffering("m1"));
    assert!(!replica.is_buffering("m2"));
}

#[test]
fn test_snapshot_rebuffers_streaming_messages() {
    let mut replica = replica_with(vec![Message::streaming("m1")]);
    append(&mut replica, "m1", "x [y");

    let mut message = Message::streaming("m1");
    message.content = "x [y](z".to_string();
    let mut group = MessageGroup::new("g1", ActorId::agent("coder"));
    group.messages.push(message);
    let mut chat = Chat::new("c1");
    chat.message_groups.push(group);
    replica.replace(Document::with_chat(chat));

    assert_eq!(replica.confirmed_content("m1"), Some("x "));
    assert_eq!(replica.pending_tail("m1"), Some("[y](z"));
    append(&mut replica, "m1", ")");
    assert_eq!(replica.confirmed_content("m1"), Some("x [y](z)"));
}
