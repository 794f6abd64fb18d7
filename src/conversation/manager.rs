use std::collections::VecDeque;

use super::id::ConversationId;
use super::state::Conversation;

/// Owns the ordered conversation list and the active-conversation handle.
#[derive(Debug, Default)]
pub struct ConversationManager {
    conversations: VecDeque<Conversation>,
    active_id: Option<ConversationId>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self {
            conversations: VecDeque::new(),
            active_id: None,
        }
    }

    pub fn add(&mut self, conversation: Conversation) {
        let id = conversation.id;
        self.conversations.push_front(conversation);
        self.active_id = Some(id);
    }

    /// Replace the whole list (initial load). The newest conversation becomes
    /// active.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations.into();
        self.active_id = self.conversations.front().map(|c| c.id);
    }

    pub fn list(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active_id?;
        self.get(id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.active_id?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.active_id
    }

    pub fn set_active(&mut self, id: ConversationId) -> bool {
        if self.conversations.iter().any(|c| c.id == id) {
            self.active_id = Some(id);
            true
        } else {
            false
        }
    }

    pub fn new_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::new();
        let id = conversation.id;
        self.add(conversation);
        id
    }

    /// Remove a conversation. Deselects it if it was active.
    pub fn delete(&mut self, id: ConversationId) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.active_id == Some(id) {
            self.active_id = None;
        }
        self.conversations.len() != before
    }

    /// Clone the list for persistence, oldest first.
    pub fn snapshot(&self) -> Vec<Conversation> {
        self.conversations.iter().cloned().collect()
    }

    pub fn mark_all_clean(&mut self) {
        for conv in &mut self.conversations {
            conv.dirty = false;
        }
    }
}
