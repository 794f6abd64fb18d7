use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::pacing;
use crate::segment;

use super::sink::MessageSink;

/// Transient state of one typing stream run.
#[derive(Debug, Default)]
struct StreamSession {
    /// Everything appended so far, silent fragments included.
    buffer: String,
    /// The last value handed to the sink; the commit value on cancellation.
    last_published: String,
}

/// Drives the segmenter and pacing policy over time, publishing partial text
/// to a [`MessageSink`] with cooperative cancellation.
///
/// One controller drives one stream; the owner keeps a clone of the token to
/// request a stop. At most one run may be active per conversation — starting
/// a new one is the caller's cue to cancel and commit the old one first.
pub struct TypingController {
    cancel: CancellationToken,
}

impl TypingController {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stream `full_text` into `sink`.
    ///
    /// Returns the committed content: `full_text` after an uninterrupted run
    /// (the final publish always equals the source text exactly), or the last
    /// published partial if cancelled. Cancellation is checked at the top of
    /// every step and wakes any in-flight delay, so a stop request halts the
    /// stream within one step.
    pub async fn run<S: MessageSink + ?Sized>(&self, full_text: &str, sink: &mut S) -> String {
        let mut session = StreamSession::default();

        'blocks: for block in segment::segment(full_text) {
            for step in pacing::steps(&block) {
                if self.cancel.is_cancelled() {
                    break 'blocks;
                }

                session.buffer.push_str(&step.fragment);
                if !step.silent {
                    session.last_published.clear();
                    session.last_published.push_str(&session.buffer);
                    sink.update(&session.buffer);
                }

                if !step.delay.is_zero() {
                    tokio::select! {
                        _ = self.cancel.cancelled() => {}
                        _ = sleep(step.delay) => {}
                    }
                }
            }
        }

        if self.cancel.is_cancelled() {
            log::debug!(
                "typing stream cancelled after {} of {} chars",
                session.last_published.len(),
                full_text.len()
            );
            return session.last_published;
        }

        sink.update(full_text);
        full_text.to_string()
    }
}
