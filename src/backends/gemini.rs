//! Gemini API client for text replies.
//!
//! Speaks the `generateContent` endpoint: one user turn, optionally with an
//! inline image part, answered by a single finished reply string.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::Attachment;
use crate::error::ChatError;

use super::TextGenerator;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Used when an image arrives without any accompanying text.
const DESCRIBE_IMAGE_PROMPT: &str = "Describe this image";

/// Configuration for the Gemini client.
#[derive(Debug)]
pub struct GeminiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Endpoint override, mainly for tests.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

/// Client for the Gemini text-generation endpoint.
///
/// The client uses `Arc` internally for configuration, making cloning cheap.
#[derive(Debug, Clone)]
pub struct Gemini {
    pub config: Arc<GeminiConfig>,
    pub client: Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    fn text(&self) -> Option<String> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.clone())
    }
}

impl Gemini {
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(sec));
        }
        Self {
            config: Arc::new(GeminiConfig {
                api_key: api_key.into(),
                model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout_seconds,
            }),
            client: builder.build().expect("Failed to build reqwest Client"),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_parts(prompt: &str, attachment: Option<&Attachment>) -> Result<Vec<GeminiPart>, ChatError> {
        let Some(attachment) = attachment else {
            return Ok(vec![GeminiPart::Text {
                text: prompt.to_string(),
            }]);
        };
        match attachment {
            Attachment::Inline { mime, data } => {
                let text = if prompt.is_empty() {
                    DESCRIBE_IMAGE_PROMPT.to_string()
                } else {
                    prompt.to_string()
                };
                Ok(vec![
                    GeminiPart::Text { text },
                    GeminiPart::Inline {
                        inline_data: GeminiInlineData {
                            mime_type: mime.mime_type().to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(data),
                        },
                    },
                ])
            }
            Attachment::Url(_) => Err(ChatError::InvalidRequest(
                "URL attachments must be downloaded before sending".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TextGenerator for Gemini {
    /// Sends one user turn to Gemini and returns the finished reply text.
    async fn generate(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, ChatError> {
        if self.config.api_key.is_empty() {
            return Err(ChatError::AuthError("Missing Gemini API key".to_string()));
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: Self::build_parts(prompt, attachment)?,
            }],
        };

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&body) {
                log::trace!("Gemini request payload: {}", json);
            }
        }

        let mut request = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.config.api_key)])
            .json(&body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        let resp = request.send().await?;

        log::debug!("Gemini HTTP status: {}", resp.status());

        let resp = resp.error_for_status()?;
        let raw = resp.text().await?;
        let json_resp: GeminiResponse = serde_json::from_str(&raw)?;

        json_resp.text().ok_or_else(|| ChatError::ResponseFormatError {
            message: "No text candidate in Gemini response".to_string(),
            raw_response: raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::conversation::ImageMime;

    use super::*;

    #[tokio::test]
    async fn returns_reply_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "k".into()))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"hello back"}]}}]}"#,
            )
            .create_async()
            .await;

        let gemini = Gemini::new("k", None, Some(server.url()), None);
        let reply = gemini.generate("hi", None).await.expect("reply");
        assert_eq!(reply, "hello back");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn inline_attachment_is_base64_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(mockito::Matcher::Any)
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"contents":[{"parts":[{"text":"what is this"},{"inlineData":{"mimeType":"image/png","data":"AQID"}}]}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"a chart"}]}}]}"#)
            .create_async()
            .await;

        let gemini = Gemini::new("k", None, Some(server.url()), None);
        let attachment = Attachment::Inline {
            mime: ImageMime::PNG,
            data: vec![1, 2, 3],
        };
        let reply = gemini
            .generate("what is this", Some(&attachment))
            .await
            .expect("reply");
        assert_eq!(reply, "a chart");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_candidates_is_a_format_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let gemini = Gemini::new("k", None, Some(server.url()), None);
        let err = gemini.generate("hi", None).await.expect_err("format error");
        assert!(matches!(err, ChatError::ResponseFormatError { .. }));
    }

    #[tokio::test]
    async fn http_status_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let gemini = Gemini::new("k", None, Some(server.url()), None);
        let err = gemini.generate("hi", None).await.expect_err("http error");
        assert!(matches!(err, ChatError::HttpError(_)));
    }

    #[tokio::test]
    async fn missing_api_key_is_an_auth_error() {
        let gemini = Gemini::new("", None, None, None);
        let err = gemini.generate("hi", None).await.expect_err("auth error");
        assert!(matches!(err, ChatError::AuthError(_)));
    }
}
