//! Durable chat history, decoupled from the typing pipeline.

mod debounce;
mod json_store;

use async_trait::async_trait;

use crate::conversation::Conversation;

pub use debounce::SaveQueue;
pub use json_store::JsonHistoryStore;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable storage for a user's conversation list.
///
/// `save` has upsert semantics: a missing history document is created, an
/// existing one replaced. `load` of an unknown user yields an empty list.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Vec<Conversation>, PersistenceError>;

    async fn save(
        &self,
        user_id: &str,
        conversations: &[Conversation],
    ) -> Result<(), PersistenceError>;
}
