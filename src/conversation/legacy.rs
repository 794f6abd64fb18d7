//! One-time migration of legacy chat-history entries.
//!
//! Older history documents stored a conversation as its bare prompt string.
//! Loading normalizes every entry into the structured [`Conversation`] shape
//! once, so no other code ever branches on the stored form.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::state::Conversation;

/// On-disk shape of one history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredConversation {
    Full(Conversation),
    /// Pre-structured format: just the first prompt.
    Legacy(String),
}

impl StoredConversation {
    /// Normalize into the structured shape. Legacy prompts become a
    /// single-user-turn conversation titled after the prompt.
    pub fn into_conversation(self) -> Conversation {
        match self {
            StoredConversation::Full(conversation) => conversation,
            StoredConversation::Legacy(prompt) => {
                let mut conversation = Conversation::new();
                conversation.push_message(Message::user().content(&prompt).build());
                conversation.title_from_first_user();
                conversation.dirty = false;
                conversation
            }
        }
    }
}

/// Migrate a loaded history document, dropping entries that carry nothing.
pub fn normalize(stored: Vec<StoredConversation>) -> Vec<Conversation> {
    stored
        .into_iter()
        .filter(|entry| match entry {
            StoredConversation::Legacy(prompt) => !prompt.trim().is_empty(),
            StoredConversation::Full(conversation) => !conversation.messages.is_empty(),
        })
        .map(StoredConversation::into_conversation)
        .collect()
}
