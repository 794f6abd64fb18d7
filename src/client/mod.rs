//! Call-site orchestration: prompt in, committed conversation turns out.
//!
//! One [`ChatClient`] serves one signed-in user. It owns the conversation
//! list, routes prompts to the text or image backend, streams replies
//! through the typing controller, and hands dirty history to the debounced
//! save queue. Collaborator failures never escape: they become user-visible
//! bot turns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::backends::{Gemini, HuggingFaceImage, ImageGenerator, TextGenerator};
use crate::config::{ClientConfig, ConfigError};
use crate::conversation::{
    Attachment, Conversation, ConversationId, ConversationManager, ImageMime, Message,
    MessageState,
};
use crate::error::ChatError;
use crate::persistence::{HistoryStore, JsonHistoryStore, PersistenceError, SaveQueue};
use crate::typing::{ConversationSink, TypingController};

/// Synthesized turn for the timeout path.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
/// Follow-up turn after a failed image generation.
const IMAGE_RETRY_HINT: &str =
    "You can try again with a modified description or ask for something else.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extract the image prompt from a `generate image:` style request.
fn image_request(prompt: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)^(generate|create|draw) image:\s*").expect("image request regex")
    });
    re.find(prompt)
        .map(|m| prompt[m.end()..].trim().to_string())
}

pub struct ChatClient {
    user_id: String,
    provider: Arc<dyn TextGenerator>,
    image_provider: Option<Arc<dyn ImageGenerator>>,
    store: Option<Arc<dyn HistoryStore>>,
    save_queue: Option<SaveQueue>,
    conversations: Arc<Mutex<ConversationManager>>,
    /// Latest cancellation token per conversation; one live stream each.
    streams: Mutex<HashMap<ConversationId, CancellationToken>>,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(user_id: impl Into<String>, provider: Arc<dyn TextGenerator>) -> Self {
        Self {
            user_id: user_id.into(),
            provider,
            image_provider: None,
            store: None,
            save_queue: None,
            conversations: Arc::new(Mutex::new(ConversationManager::new())),
            streams: Mutex::new(HashMap::new()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build backends and storage from configuration. Must run inside a
    /// tokio runtime when storage autosave is on (the save queue spawns).
    pub fn from_config(
        user_id: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, ConfigError> {
        let provider = Gemini::new(
            config.provider.api_key.clone(),
            config.provider.model.clone(),
            config.provider.base_url.clone(),
            Some(config.provider.timeout_secs),
        );
        let mut client = Self::new(user_id, Arc::new(provider))
            .with_timeout(Duration::from_secs(config.provider.timeout_secs));

        if !config.image.api_key.is_empty() {
            if let Some(base_url) = &config.image.base_url {
                client = client.with_image_generator(Arc::new(HuggingFaceImage::new(
                    config.image.api_key.clone(),
                    base_url.clone(),
                    Some(config.provider.timeout_secs),
                )));
            }
        }

        if config.storage.autosave {
            let dir = config.storage.resolve_data_dir()?;
            client = client.with_store(
                Arc::new(JsonHistoryStore::new(dir)),
                Duration::from_millis(config.storage.debounce_ms),
            );
        }
        Ok(client)
    }

    pub fn with_image_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.image_provider = Some(generator);
        self
    }

    /// Attach durable storage and start the debounced save queue.
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>, debounce: Duration) -> Self {
        self.save_queue = Some(SaveQueue::spawn(Arc::clone(&store), debounce));
        self.store = Some(store);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Populate the conversation list from storage, migrating legacy
    /// entries. Returns how many conversations were loaded.
    pub async fn load_history(&self) -> Result<usize, PersistenceError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let loaded = store.load(&self.user_id).await?;
        let count = loaded.len();
        self.manager().replace_all(loaded);
        Ok(count)
    }

    /// Shared handle to the conversation list, for embedding UIs.
    pub fn conversations(&self) -> Arc<Mutex<ConversationManager>> {
        Arc::clone(&self.conversations)
    }

    /// Snapshot of the conversation list, newest first.
    pub fn history(&self) -> Vec<Conversation> {
        self.manager().snapshot()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        self.manager().active().cloned()
    }

    pub fn new_conversation(&self) -> ConversationId {
        self.manager().new_conversation()
    }

    pub fn select_conversation(&self, id: ConversationId) -> bool {
        self.manager().set_active(id)
    }

    /// Delete a conversation, cancelling any stream still feeding it.
    pub fn delete_conversation(&self, id: ConversationId) -> bool {
        self.cancel_stream(id);
        let deleted = self.manager().delete(id);
        if deleted {
            self.schedule_save(true);
        }
        deleted
    }

    /// Stop the reply currently streaming into the active conversation.
    /// The in-flight run commits its last published partial.
    pub fn stop(&self) {
        let active = self.manager().active_id();
        if let Some(id) = active {
            if let Some(token) = self.streams.lock().expect("streams lock").get(&id) {
                token.cancel();
            }
        }
    }

    /// Send one prompt and return the committed content of the resulting
    /// bot turn (possibly a partial, if the stream was stopped; possibly a
    /// synthesized failure turn). Starting a prompt cancels and commits any
    /// run still in flight for the conversation.
    pub async fn send_prompt(&self, prompt: &str, attachment: Option<Attachment>) -> String {
        if prompt.trim().is_empty() && attachment.is_none() {
            return String::new();
        }

        let conversation_id = {
            let mut guard = self.manager();
            match guard.active_id() {
                Some(id) => id,
                None => guard.new_conversation(),
            }
        };
        self.cancel_stream(conversation_id);

        {
            let mut guard = self.manager();
            if let Some(conv) = guard.get_mut(conversation_id) {
                let mut builder = Message::user().content(prompt);
                if let Some(att) = attachment.clone() {
                    builder = builder.attachment(att);
                }
                conv.push_message(builder.build());
                conv.title_from_first_user();
            }
        }
        self.schedule_save(false);

        let committed = match image_request(prompt) {
            Some(image_prompt) => self.generate_image_turn(conversation_id, &image_prompt).await,
            None => {
                self.generate_text_turn(conversation_id, prompt, attachment.as_ref())
                    .await
            }
        };
        self.schedule_save(false);
        committed
    }

    async fn generate_text_turn(
        &self,
        conversation_id: ConversationId,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> String {
        let cancel = self.register_stream(conversation_id);

        let reply = tokio::select! {
            // Stopped while the request was still in flight: nothing was
            // streamed, nothing is committed.
            _ = cancel.cancelled() => return String::new(),
            result = tokio::time::timeout(self.timeout, self.provider.generate(prompt, attachment)) => {
                match result {
                    Ok(Ok(reply)) => reply,
                    Ok(Err(err)) => return self.push_failure_turn(conversation_id, &err),
                    Err(_) => return self.push_failure_turn(conversation_id, &ChatError::Timeout),
                }
            }
        };

        let message_id = {
            let mut guard = self.manager();
            match guard.get_mut(conversation_id) {
                Some(conv) => conv.push_message(Message::bot().state(MessageState::Pending).build()),
                // conversation deleted while the request was in flight
                None => return String::new(),
            }
        };

        let mut sink = ConversationSink::new(self.conversations(), conversation_id, message_id);
        let controller = TypingController::new(cancel);
        let committed = controller.run(&reply, &mut sink).await;

        let mut guard = self.manager();
        if let Some(conv) = guard.get_mut(conversation_id) {
            if let Some(msg) = conv.message_mut(message_id) {
                msg.replace_content(&committed);
                msg.state = MessageState::Complete;
            }
            conv.touch();
        }
        committed
    }

    async fn generate_image_turn(&self, conversation_id: ConversationId, prompt: &str) -> String {
        let Some(generator) = self.image_provider.clone() else {
            return self.push_failure_turn(
                conversation_id,
                &ChatError::Generic("image generation is not configured".to_string()),
            );
        };

        // Placeholder turn while the image renders; replaced in place below.
        let message_id = {
            let mut guard = self.manager();
            match guard.get_mut(conversation_id) {
                Some(conv) => conv.push_message(
                    Message::bot()
                        .content(format!("Generating image for \"{prompt}\"..."))
                        .state(MessageState::Pending)
                        .build(),
                ),
                None => return String::new(),
            }
        };

        let outcome = match tokio::time::timeout(self.timeout, generator.generate_image(prompt)).await
        {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ChatError::Timeout),
        };

        match outcome {
            Ok(bytes) => {
                let content = format!("Here's the generated image for \"{prompt}\":");
                let mut guard = self.manager();
                if let Some(conv) = guard.get_mut(conversation_id) {
                    if let Some(msg) = conv.message_mut(message_id) {
                        msg.replace_content(&content);
                        msg.attachment = Some(Attachment::Inline {
                            mime: ImageMime::PNG,
                            data: bytes,
                        });
                        msg.image_prompt = Some(prompt.to_string());
                        msg.state = MessageState::Complete;
                    }
                    conv.touch();
                }
                content
            }
            Err(err) => {
                log::warn!("image generation failed: {err}");
                let content = if err.is_timeout() {
                    TIMEOUT_MESSAGE.to_string()
                } else {
                    format!("Error: Image generation failed: {err}. Please try a different description.")
                };
                let mut guard = self.manager();
                if let Some(conv) = guard.get_mut(conversation_id) {
                    if let Some(msg) = conv.message_mut(message_id) {
                        msg.replace_content(&content);
                        msg.state = MessageState::Error;
                    }
                    conv.push_message(Message::bot().content(IMAGE_RETRY_HINT).build());
                }
                content
            }
        }
    }

    /// Convert a collaborator failure into a user-visible bot turn.
    fn push_failure_turn(&self, conversation_id: ConversationId, err: &ChatError) -> String {
        log::warn!("generation failed: {err}");
        let content = if err.is_timeout() {
            TIMEOUT_MESSAGE.to_string()
        } else {
            format!("Error: {err}")
        };
        let mut guard = self.manager();
        if let Some(conv) = guard.get_mut(conversation_id) {
            conv.push_message(
                Message::bot()
                    .content(&content)
                    .state(MessageState::Error)
                    .build(),
            );
        }
        content
    }

    fn manager(&self) -> std::sync::MutexGuard<'_, ConversationManager> {
        self.conversations.lock().expect("conversation lock")
    }

    fn register_stream(&self, id: ConversationId) -> CancellationToken {
        let token = CancellationToken::new();
        self.streams
            .lock()
            .expect("streams lock")
            .insert(id, token.clone());
        token
    }

    fn cancel_stream(&self, id: ConversationId) {
        if let Some(token) = self.streams.lock().expect("streams lock").remove(&id) {
            token.cancel();
        }
    }

    /// Hand the current history to the save queue if anything changed.
    fn schedule_save(&self, force: bool) {
        let Some(queue) = &self.save_queue else {
            return;
        };
        let snapshot = {
            let mut guard = self.manager();
            if !force && !guard.list().any(|c| c.dirty) {
                return;
            }
            let snapshot = guard.snapshot();
            guard.mark_all_clean();
            snapshot
        };
        queue.schedule(&self.user_id, snapshot);
    }
}
