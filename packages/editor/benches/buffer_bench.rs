use convo_document::{ActorId, Chat, Document, Message, MessageGroup, ObjectRef};
use convo_editor::{MessageBuffer, Mutation, Replica};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Model-sized deltas: a few characters each, with a link every few sentences.
fn deltas() -> Vec<String> {
    let text = "Revenue grew 12% quarter over quarter. See [the breakdown](https://example.com/q3) \
                and ![chart](plot.png) for details. Churn stayed flat! ";
    let chunked: Vec<String> = text
        .chars()
        .collect::<Vec<_>>()
        .chunks(4)
        .map(|chunk| chunk.iter().collect())
        .collect();
    chunked.iter().cycle().take(chunked.len() * 20).cloned().collect()
}

fn buffer_process_deltas(c: &mut Criterion) {
    let deltas = deltas();

    c.bench_function("buffer_process_deltas", |b| {
        b.iter(|| {
            let mut buffer = MessageBuffer::new();
            for delta in &deltas {
                buffer.process_delta(black_box(delta));
            }
            buffer.finish()
        })
    });
}

fn replica_stream_message(c: &mut Criterion) {
    let deltas = deltas();
    let target = ObjectRef::asset("c1")
        .collection("message_groups")
        .object("g1")
        .collection("messages")
        .object("m1");
    let mutations: Vec<Mutation> = deltas
        .iter()
        .map(|delta| Mutation::append(target.clone(), "content", delta.as_str()))
        .collect();

    let mut group = MessageGroup::new("g1", ActorId::agent("coder"));
    group.messages.push(Message::streaming("m1"));
    let mut chat = Chat::new("c1");
    chat.message_groups.push(group);
    let document = Document::with_chat(chat);

    c.bench_function("replica_stream_message", |b| {
        b.iter(|| {
            let mut replica = Replica::new(document.clone());
            for mutation in &mutations {
                let _ = replica.apply(black_box(mutation));
            }
            replica.version()
        })
    });
}

criterion_group!(benches, buffer_process_deltas, replica_stream_message);
criterion_main!(benches);
