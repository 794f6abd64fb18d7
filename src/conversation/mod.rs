mod id;
mod legacy;
mod manager;
mod message;
mod state;

pub use id::{ConversationId, MessageId};
pub use legacy::{normalize, StoredConversation};
pub use manager::ConversationManager;
pub use message::{Attachment, ImageMime, Message, MessageBuilder, MessageRole, MessageState};
pub use state::Conversation;
