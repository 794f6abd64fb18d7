//! Hugging Face inference client for image generation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

use super::ImageGenerator;

/// Wrap a raw prompt so it is less likely to trip the hosted content filter.
pub fn sanitize_image_prompt(prompt: &str) -> String {
    format!(
        "A safe, family-friendly image of {prompt}. The image should be \
         appropriate for all audiences and not contain any violence, adult \
         content, or harmful material."
    )
}

/// Configuration for the image-generation client.
#[derive(Debug)]
pub struct HuggingFaceImageConfig {
    /// API token for authentication.
    pub api_key: String,
    /// Full model inference URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

/// Client for a Hugging Face hosted text-to-image model.
#[derive(Debug, Clone)]
pub struct HuggingFaceImage {
    pub config: Arc<HuggingFaceImageConfig>,
    pub client: Client,
}

#[derive(Serialize)]
struct ImageRequest {
    inputs: String,
    options: ImageRequestOptions,
}

#[derive(Serialize)]
struct ImageRequestOptions {
    wait_for_model: bool,
    use_cache: bool,
}

#[derive(Deserialize, Debug)]
struct ImageErrorResponse {
    error: Option<String>,
}

impl HuggingFaceImage {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(sec));
        }
        Self {
            config: Arc::new(HuggingFaceImageConfig {
                api_key: api_key.into(),
                base_url: base_url.into(),
                timeout_seconds,
            }),
            client: builder.build().expect("Failed to build reqwest Client"),
        }
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceImage {
    /// Requests an image for `prompt` and returns the raw bytes.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, ChatError> {
        if self.config.api_key.is_empty() {
            return Err(ChatError::AuthError(
                "Missing image generation API key".to_string(),
            ));
        }

        let body = ImageRequest {
            inputs: sanitize_image_prompt(prompt),
            options: ImageRequestOptions {
                wait_for_model: true,
                use_cache: false,
            },
        };

        let resp = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        log::debug!("image generation HTTP status: {}", resp.status());

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp
                .json::<ImageErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("Image generation failed with status {status}"));
            return Err(ChatError::ProviderError(detail));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
