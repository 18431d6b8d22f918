//! Generative language API client
//!
//! Sends a single-turn prompt and returns the model's text.
//!
//! # API Reference
//! - Endpoint: `{base}/v1beta/models/{model}:generateContent?key=<key>`
//! - Body: `{"contents": [{"parts": [{"text": "<prompt>"}]}]}`

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::GradingError;

/// Public Google endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for generation requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept in `GradingError::Http`
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self, GradingError> {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GradingError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GradingError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send `prompt` using `api_key` and return the generated text
    ///
    /// # Errors
    /// - `Http` for non-2xx statuses (429/403 trigger key fallback upstream)
    /// - `Transport` for network failures and timeouts
    /// - `Parse` when the body has no candidate text
    pub async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, GradingError> {
        debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Calling generative API"
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| GradingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(GradingError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GradingError::Parse(format!("Failed to decode response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GradingError::Parse("Response contained no candidate text".into()))?;

        debug!(response_length = text.len(), "Generative API responded");
        Ok(text)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        let client = GeminiClient::new("http://localhost:9999/", "gemini-test").unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(client.model(), "gemini-test");
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]}));
    }
}
