use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ConversationId, MessageId};
use super::message::{Message, MessageRole};

const TITLE_MAX_CHARS: usize = 48;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    /// Set on every mutation; cleared once the save queue has written us out.
    #[serde(skip)]
    pub dirty: bool,
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            title: "New conversation".to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            dirty: false,
        }
    }

    pub fn push_message(&mut self, message: Message) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        self.touch();
        id
    }

    /// Locate a message by its handle, never by position.
    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.dirty = true;
    }

    pub fn title_from_first_user(&mut self) {
        let first_user = self
            .messages
            .iter()
            .find(|msg| msg.role == MessageRole::User);
        if let Some(msg) = first_user {
            self.title = truncate_title(&msg.content);
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_title(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let mut title = chars.by_ref().take(TITLE_MAX_CHARS).collect::<String>();
    if chars.next().is_some() {
        title.push_str("...");
    }
    if title.is_empty() {
        "Conversation".to_string()
    } else {
        title
    }
}
