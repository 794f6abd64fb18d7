use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MessageId;

/// Role of a participant in a conversation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageRole {
    /// The human participant
    User,
    /// The assistant participant
    Bot,
}

/// Lifecycle of a message's content.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageState {
    Pending,
    Streaming,
    Complete,
    Error,
}

/// The supported MIME type of an inline image attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ImageMime {
    /// JPEG image
    JPEG,
    /// PNG image
    PNG,
    /// GIF image
    GIF,
    /// WebP image
    WEBP,
}

impl ImageMime {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageMime::JPEG => "image/jpeg",
            ImageMime::PNG => "image/png",
            ImageMime::GIF => "image/gif",
            ImageMime::WEBP => "image/webp",
        }
    }
}

/// Opaque image reference carried by a message. The typing pipeline never
/// touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// Remote or object-URL image
    Url(String),
    /// Raw image bytes plus their MIME type
    Inline { mime: ImageMime, data: Vec<u8> },
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    /// Text content; possibly partial while `state` is `Streaming`.
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// For generated-image replies: the prompt that produced the image.
    #[serde(default)]
    pub image_prompt: Option<String>,
    pub state: MessageState,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new builder for a user message
    pub fn user() -> MessageBuilder {
        MessageBuilder::new(MessageRole::User)
    }

    /// Create a new builder for a bot message
    pub fn bot() -> MessageBuilder {
        MessageBuilder::new(MessageRole::Bot)
    }

    /// Replace the whole content. Used by the streaming sink; callers manage
    /// the state transition.
    pub fn replace_content(&mut self, text: &str) {
        self.content.clear();
        self.content.push_str(text);
    }
}

/// Builder for Message
#[derive(Debug)]
pub struct MessageBuilder {
    role: MessageRole,
    content: String,
    attachment: Option<Attachment>,
    image_prompt: Option<String>,
    state: MessageState,
}

impl MessageBuilder {
    pub fn new(role: MessageRole) -> Self {
        Self {
            role,
            content: String::new(),
            attachment: None,
            image_prompt: None,
            state: MessageState::Complete,
        }
    }

    /// Set the message content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach an image reference
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Record the prompt that produced a generated image
    pub fn image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    /// Override the initial state (`Complete` by default)
    pub fn state(mut self, state: MessageState) -> Self {
        self.state = state;
        self
    }

    /// Build the Message
    pub fn build(self) -> Message {
        Message {
            id: MessageId::new(),
            role: self.role,
            content: self.content,
            attachment: self.attachment,
            image_prompt: self.image_prompt,
            state: self.state,
            timestamp: Utc::now(),
        }
    }
}
