use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{FnSink, MessageSink, TypingController};

fn recording_sink(published: Arc<Mutex<Vec<String>>>) -> impl MessageSink {
    FnSink(move |text: &str| {
        published
            .lock()
            .expect("published lock")
            .push(text.to_string())
    })
}

fn cancelling_sink(
    published: Arc<Mutex<Vec<String>>>,
    cancel: CancellationToken,
    after: usize,
) -> impl MessageSink {
    FnSink(move |text: &str| {
        let mut guard = published.lock().expect("published lock");
        guard.push(text.to_string());
        if guard.len() == after {
            cancel.cancel();
        }
    })
}

#[tokio::test(start_paused = true)]
async fn publishes_grow_monotonically_until_final() {
    let text = "First paragraph here.\n\n```rs\nlet x = 1;\n```";
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = recording_sink(Arc::clone(&published));

    let controller = TypingController::new(CancellationToken::new());
    let committed = controller.run(text, &mut sink).await;

    assert_eq!(committed, text);
    let published = published.lock().expect("published lock");
    assert!(published.len() > 2);
    for pair in published.windows(2).take(published.len() - 2) {
        assert!(
            pair[1].starts_with(pair[0].as_str()),
            "{:?} does not extend {:?}",
            pair[1],
            pair[0]
        );
    }
    assert_eq!(published.last().map(String::as_str), Some(text));
}

#[tokio::test(start_paused = true)]
async fn final_publish_equals_source_despite_block_joins() {
    // A paragraph following a code block joins without a separator while
    // typing; the closing publish must still equal the source exactly.
    let text = "```js\na\n```\n\nafter words";
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = recording_sink(Arc::clone(&published));

    let controller = TypingController::new(CancellationToken::new());
    let committed = controller.run(text, &mut sink).await;

    assert_eq!(committed, text);
    assert_eq!(
        published.lock().expect("published lock").last().map(String::as_str),
        Some(text)
    );
}

#[tokio::test(start_paused = true)]
async fn paragraph_types_out_before_code_appears() {
    let text = "Hello world. \n\n```js\nconsole.log(1)\n```";
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = recording_sink(Arc::clone(&published));

    let controller = TypingController::new(CancellationToken::new());
    controller.run(text, &mut sink).await;

    let published = published.lock().expect("published lock");
    assert_eq!(published[0], "Hello");
    assert_eq!(published[1], "Hello world.");
    let first_code = published
        .iter()
        .position(|p| p.contains('`'))
        .expect("code was typed");
    let full_paragraph = published
        .iter()
        .position(|p| p == "Hello world.")
        .expect("paragraph was typed");
    assert!(full_paragraph < first_code);
}

#[tokio::test(start_paused = true)]
async fn cancelling_after_two_words_commits_exactly_two() {
    let text = "w1 w2 w3 w4 w5 w6 w7 w8 w9 w10";
    let cancel = CancellationToken::new();
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = cancelling_sink(Arc::clone(&published), cancel.clone(), 2);

    let controller = TypingController::new(cancel);
    let committed = controller.run(text, &mut sink).await;

    assert_eq!(committed, "w1 w2");
    let published = published.lock().expect("published lock");
    assert_eq!(published.len(), 2);
    assert_eq!(published.last().map(String::as_str), Some("w1 w2"));
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_commits_empty() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = recording_sink(Arc::clone(&published));

    let controller = TypingController::new(cancel);
    let committed = controller.run("never shown", &mut sink).await;

    assert_eq!(committed, "");
    assert!(published.lock().expect("published lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn header_break_is_not_part_of_the_commit() {
    // The break after a header is appended silently; cancelling right after
    // the header publish must commit the bare header line.
    let cancel = CancellationToken::new();
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = cancelling_sink(Arc::clone(&published), cancel.clone(), 1);

    let controller = TypingController::new(cancel);
    let committed = controller.run("# Title\n\nbody text", &mut sink).await;

    assert_eq!(committed, "# Title");
    assert_eq!(published.lock().expect("published lock").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn delays_follow_the_pacing_table() {
    // Three plain short-paragraph words then the block break: 50+50+50+300.
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = recording_sink(Arc::clone(&published));

    let controller = TypingController::new(CancellationToken::new());
    let started = Instant::now();
    controller.run("one two three", &mut sink).await;

    assert_eq!(started.elapsed(), std::time::Duration::from_millis(450));
}

#[tokio::test(start_paused = true)]
async fn stop_wakes_an_in_flight_delay() {
    let cancel = CancellationToken::new();
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut sink = recording_sink(Arc::clone(&published));

    let controller = TypingController::new(cancel.clone());
    let run = controller.run("alpha beta gamma", &mut sink);
    tokio::pin!(run);

    // Let the first word publish, then stop while the controller sleeps.
    tokio::select! {
        _ = &mut run => panic!("run finished before cancellation"),
        _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => cancel.cancel(),
    }
    let committed = run.await;

    assert_eq!(committed, "alpha");
    assert_eq!(published.lock().expect("published lock").len(), 1);
}
