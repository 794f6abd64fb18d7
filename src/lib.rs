//! Chat client core with block-aware typing simulation.
//!
//! This crate is the in-process engine of a chat UI fronting a remote LLM
//! API. A finished reply string is segmented into semantic blocks
//! ([`segment`]), paced per block kind ([`pacing`]), and streamed to the
//! display as timed partial updates with cooperative cancellation
//! ([`typing`]). Conversation state, debounced JSON persistence, and the
//! HTTP generation backends live behind trait seams so a host UI only wires
//! up the edges.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatpane::backends::Gemini;
//! use chatpane::ChatClient;
//!
//! # async fn run() {
//! let provider = Arc::new(Gemini::new("api-key", None, None, Some(30)));
//! let client = ChatClient::new("user-1", provider);
//! let committed = client.send_prompt("Explain lifetimes", None).await;
//! println!("{committed}");
//! # }
//! ```

pub mod backends;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod pacing;
pub mod persistence;
pub mod segment;
pub mod typing;

pub use client::{ChatClient, TIMEOUT_MESSAGE};
pub use config::ClientConfig;
pub use conversation::{
    Attachment, Conversation, ConversationId, ConversationManager, Message, MessageId,
    MessageRole, MessageState,
};
pub use error::ChatError;
pub use pacing::{steps, TypingStep};
pub use segment::{render, segment, ContentBlock};
pub use typing::{ConversationSink, FnSink, MessageSink, TypingController};
