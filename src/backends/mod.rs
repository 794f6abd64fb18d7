//! HTTP collaborators behind trait seams.
//!
//! The typing pipeline only ever sees a finished reply string; these traits
//! are the boundary where it comes from.

mod gemini;
mod huggingface;

use async_trait::async_trait;

use crate::conversation::Attachment;
use crate::error::ChatError;

pub use gemini::{Gemini, GeminiConfig};
pub use huggingface::{sanitize_image_prompt, HuggingFaceImage, HuggingFaceImageConfig};

/// Produces one completed text reply for one user turn.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, ChatError>;
}

/// Produces raw image bytes for a sanitized prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, ChatError>;
}
