//! Task suggestions from a text-generation service.
//!
//! Purely advisory: a provider always returns a string, falling back to a
//! fixed message when the service cannot be reached or is not configured.

use crate::config::SuggestionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Returned when no API key is configured.
pub const FALLBACK_NO_KEY: &str = "API key not configured.";

/// Returned for any other failure.
pub const FALLBACK_UNAVAILABLE: &str = "Unable to generate a suggestion right now.";

/// What the suggestion is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub title: String,
    pub task_type: String,
    pub duration_minutes: u32,
}

impl SuggestionRequest {
    pub fn prompt(&self) -> String {
        format!(
            "I am planning a task.\n\
             Task name: \"{}\"\n\
             Task type: \"{}\"\n\
             Estimated time: {} minutes.\n\n\
             Give one very short strategic tip or way to split up this specific task \
             so I can finish it efficiently. Keep it under 30 words.",
            self.title, self.task_type, self.duration_minutes
        )
    }
}

#[derive(Debug, thiserror::Error)]
enum SuggestError {
    #[error("no API key configured")]
    MissingKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no text")]
    EmptyResponse,
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// A short suggestion, or a fallback message. Never fails.
    async fn suggest(&self, request: &SuggestionRequest) -> String;
}

/// Gemini `generateContent` client.
pub struct GeminiSuggester {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiSuggester {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let defaults = SuggestionConfig::default();
        Self {
            client: reqwest::Client::new(),
            endpoint: defaults.endpoint,
            model: model.into(),
            api_key,
        }
    }

    /// Build from config, reading the key from the configured environment variable.
    pub fn from_config(config: &SuggestionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
        }
    }

    /// Set the base URL (useful for testing with mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn try_suggest(&self, request: &SuggestionRequest) -> Result<String, SuggestError> {
        let api_key = self.api_key.as_deref().ok_or(SuggestError::MissingKey)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt() }] }]
        });

        debug!(model = %self.model, "Requesting suggestion");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".into());
            return Err(SuggestError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.text().ok_or(SuggestError::EmptyResponse)
    }
}

#[async_trait]
impl SuggestionProvider for GeminiSuggester {
    async fn suggest(&self, request: &SuggestionRequest) -> String {
        match self.try_suggest(request).await {
            Ok(text) => text,
            Err(SuggestError::MissingKey) => FALLBACK_NO_KEY.to_string(),
            Err(e) => {
                warn!(error = %e, "Suggestion request failed");
                FALLBACK_UNAVAILABLE.to_string()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, trimmed; `None` if empty.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_task_fields() {
        let request = SuggestionRequest {
            title: "Write Report".into(),
            task_type: "Work".into(),
            duration_minutes: 45,
        };
        let prompt = request.prompt();
        assert!(prompt.contains("\"Write Report\""));
        assert!(prompt.contains("\"Work\""));
        assert!(prompt.contains("45 minutes"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": " Split it "}, {"text": "up. "}]}}]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Split it up."));
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_returns_fallback() {
        let suggester = GeminiSuggester::new(None, "gemini-2.5-flash");
        let request = SuggestionRequest {
            title: "x".into(),
            task_type: "Work".into(),
            duration_minutes: 30,
        };
        assert_eq!(suggester.suggest(&request).await, FALLBACK_NO_KEY);
    }
}
