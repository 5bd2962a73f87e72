use reducer_core::{
    deliver, spawn_linked, ActorOptions, CollectingSink, CounterReducer, Pipeline, Reducer,
    ReducerExt, ReducerWorker, ScalarDisplay, SyncSinkAdapter,
};
use shared::{domain::Message, protocol::demo_script};

fn sync_outputs(messages: &[Message]) -> Vec<i64> {
    let mut pipeline = Pipeline::new(CounterReducer::new(), CollectingSink::<i64>::new());
    pipeline.run(messages.iter().copied());
    pipeline.into_parts().1.into_inner()
}

async fn actor_outputs(messages: &[Message]) -> Vec<i64> {
    let (handle, outbox) = spawn_linked(CounterReducer::new(), ActorOptions::default());
    let delivery = tokio::spawn(deliver(outbox, SyncSinkAdapter(CollectingSink::<i64>::new())));
    for message in messages {
        handle.send(*message).await.expect("send");
    }
    handle.finish().await.expect("finish");

    let sink = delivery.await.expect("delivery").into_inner();
    sink.into_inner()
}

fn worker_outputs(messages: &[Message]) -> Vec<i64> {
    let (worker, outputs) = ReducerWorker::launch(CounterReducer::new(), 8).expect("launch");
    let collector = std::thread::spawn(move || outputs.iter().collect());
    for message in messages {
        worker.send(*message).expect("send");
    }
    worker.shutdown().expect("shutdown");
    collector.join().expect("collector")
}

#[tokio::test]
async fn every_execution_model_produces_the_same_outputs() {
    let script = demo_script();
    let expected = vec![128512, 129335, 10066329, 128527, 128527 + 14];

    assert_eq!(sync_outputs(&script), expected);
    assert_eq!(sync_outputs(&script), expected, "replay on a fresh reducer");
    assert_eq!(actor_outputs(&script).await, expected);
    assert_eq!(worker_outputs(&script), expected);
}

#[test]
fn only_the_invalid_value_maps_to_the_placeholder() {
    let glyphs = CounterReducer::new()
        .chain(ScalarDisplay::with_placeholder('\u{FFFD}'))
        .replay(demo_script());

    let substituted: Vec<bool> = glyphs.iter().map(|glyph| glyph.substituted).collect();
    assert_eq!(substituted, vec![false, false, true, false, false]);
    assert_eq!(glyphs[2].code, 10066329);
    assert_eq!(glyphs[2].to_string(), "\u{FFFD}");
    assert_eq!(glyphs[0].to_string(), "\u{1F600}");
    assert_eq!(glyphs[4].to_string(), "\u{1F61D}");
}

#[test]
fn scripts_without_print_emit_nothing() {
    let script: Vec<Message> = (0..50)
        .map(|i| {
            if i % 3 == 0 {
                Message::Set(i)
            } else {
                Message::Increment(i)
            }
        })
        .collect();
    assert!(sync_outputs(&script).is_empty());
    assert!(worker_outputs(&script).is_empty());
}

#[test]
fn interleaving_two_sequences_changes_the_result() {
    let first = [Message::Set(5), Message::Increment(1), Message::Print];
    let second = [Message::Set(100), Message::Print];

    let interleaved = [
        Message::Set(5),
        Message::Set(100),
        Message::Increment(1),
        Message::Print,
        Message::Print,
    ];
    let mixed = sync_outputs(&interleaved);
    assert_ne!(mixed, sync_outputs(&first));
    assert_ne!(mixed, sync_outputs(&second));

    // Concatenating at a sequence boundary matches isolated runs.
    let concatenated: Vec<Message> = first.iter().chain(second.iter()).copied().collect();
    let mut isolated = sync_outputs(&first);
    isolated.extend(sync_outputs(&second));
    assert_eq!(sync_outputs(&concatenated), isolated);
}

#[test]
fn reducer_state_is_only_visible_through_print() {
    let mut counter = CounterReducer::new();
    assert_eq!(counter.handle(Message::Set(10)), None);
    assert_eq!(counter.handle(Message::Set(10)), None);
    assert_eq!(counter.handle(Message::Print), Some(10));
}
