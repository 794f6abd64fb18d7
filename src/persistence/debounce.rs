use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::conversation::Conversation;

use super::HistoryStore;

struct SaveRequest {
    user_id: String,
    conversations: Vec<Conversation>,
}

/// Debounced writer for chat history.
///
/// Rapid mutations collapse into one save issued after a quiet window, so
/// per-step typing updates never wait on storage. A newer snapshot
/// supersedes any unsaved one. Save failures are logged, never propagated
/// into the caller.
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<SaveRequest>,
}

impl SaveQueue {
    pub fn spawn(store: Arc<dyn HistoryStore>, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_queue(store, window, rx));
        Self { tx }
    }

    /// Queue the latest snapshot for writing.
    pub fn schedule(&self, user_id: impl Into<String>, conversations: Vec<Conversation>) {
        let request = SaveRequest {
            user_id: user_id.into(),
            conversations,
        };
        if self.tx.send(request).is_err() {
            log::warn!("save queue task is gone; dropping history snapshot");
        }
    }
}

async fn run_queue(
    store: Arc<dyn HistoryStore>,
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
) {
    while let Some(mut request) = rx.recv().await {
        // Trailing-edge debounce: every newer snapshot restarts the window.
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(newer) => request = newer,
                    None => break,
                },
                _ = sleep(window) => break,
            }
        }
        if let Err(err) = store
            .save(&request.user_id, &request.conversations)
            .await
        {
            log::warn!("failed to save chat history: {err}");
        }
    }
}
