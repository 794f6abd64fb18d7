use std::sync::{Arc, Mutex};

use crate::conversation::{ConversationId, ConversationManager, MessageId, MessageState};

/// Receiver of partial display text during a typing stream.
///
/// `update` replaces the content of exactly one designated message; it must
/// be cheap and safe to call rapidly. It never appends new messages.
pub trait MessageSink {
    fn update(&mut self, text: &str);
}

/// Adapter turning a plain callback into a sink.
pub struct FnSink<F: FnMut(&str)>(pub F);

impl<F: FnMut(&str)> MessageSink for FnSink<F> {
    fn update(&mut self, text: &str) {
        (self.0)(text)
    }
}

/// Sink bound to one streaming message inside a shared conversation list.
///
/// The target is addressed by id, not by position, so concurrent list
/// mutations (deleting another conversation, say) cannot redirect the
/// stream onto the wrong message.
pub struct ConversationSink {
    conversations: Arc<Mutex<ConversationManager>>,
    conversation: ConversationId,
    message: MessageId,
}

impl ConversationSink {
    pub fn new(
        conversations: Arc<Mutex<ConversationManager>>,
        conversation: ConversationId,
        message: MessageId,
    ) -> Self {
        Self {
            conversations,
            conversation,
            message,
        }
    }
}

impl MessageSink for ConversationSink {
    fn update(&mut self, text: &str) {
        let mut guard = self.conversations.lock().expect("conversation lock");
        if let Some(conv) = guard.get_mut(self.conversation) {
            if let Some(msg) = conv.message_mut(self.message) {
                msg.replace_content(text);
                msg.state = MessageState::Streaming;
            }
        }
    }
}
