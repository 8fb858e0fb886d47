//! Bubble backend relay client
//!
//! Three outbound operations, each a single best-effort attempt: POST a
//! formatted transcript, GET the agent prompt configuration, POST a
//! generated story. Upstream failures keep their status and body so HTTP
//! handlers can pass them through to the caller.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;

/// Failure modes of a relay call.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The backend answered with a non-success status.
    #[error("Error from server ({status}): {body}")]
    Status { status: StatusCode, body: String },
    /// The request never got a response (DNS, refused connection, ...).
    #[error("Error during request: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for the Bubble webhook endpoints.
#[derive(Debug, Clone)]
pub struct BackendRelay {
    client: Client,
    transcript_post_url: String,
    transcript_get_url: String,
    story_post_url: String,
}

impl BackendRelay {
    pub fn new(
        transcript_post_url: String,
        transcript_get_url: String,
        story_post_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            transcript_post_url,
            transcript_get_url,
            story_post_url,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.transcript_post_url.clone(),
            config.transcript_get_url.clone(),
            config.story_post_url.clone(),
        )
    }

    /// Forward a formatted transcript. Success means HTTP 200.
    pub async fn post_transcript(&self, formatted: &str) -> Result<Value, RelayError> {
        info!("Passing transcript to bubble");
        self.post_json(&self.transcript_post_url, json!({ "transcript": formatted }))
            .await
    }

    /// Forward a generated story.
    pub async fn post_story(&self, story: &str) -> Result<Value, RelayError> {
        info!("Passing story to bubble");
        self.post_json(&self.story_post_url, json!({ "story": story }))
            .await
    }

    /// Fetch the agent prompt configuration.
    ///
    /// Non-2xx surfaces as an error; a 2xx body with missing nested fields
    /// degrades to an empty string so the caller can decide how to proceed.
    pub async fn fetch_prompt(&self) -> Result<String, RelayError> {
        let response = self.client.get(&self.transcript_get_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Prompt fetch failed: {}, {}", status, body);
            return Err(RelayError::Status { status, body });
        }

        let body: Value = response.json().await?;
        Ok(extract_prompt_text(&body))
    }

    async fn post_json(&self, url: &str, payload: Value) -> Result<Value, RelayError> {
        let response = self.client.post(url).json(&payload).send().await?;

        let status = response.status();
        if status == StatusCode::OK {
            info!("Request successful");
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Request failed: {}, {}", status, body);
            Err(RelayError::Status { status, body })
        }
    }
}

/// Navigate `response.prompt.generated_prompt_text`, defaulting to `""`.
pub(crate) fn extract_prompt_text(body: &Value) -> String {
    body.get("response")
        .and_then(|r| r.get("prompt"))
        .and_then(|p| p.get("generated_prompt_text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prompt_text() {
        let body = json!({
            "response": { "prompt": { "generated_prompt_text": "Tell me a story" } }
        });
        assert_eq!(extract_prompt_text(&body), "Tell me a story");
    }

    #[test]
    fn test_extract_degrades_to_empty() {
        assert_eq!(extract_prompt_text(&json!({})), "");
        assert_eq!(extract_prompt_text(&json!({ "response": {} })), "");
        assert_eq!(
            extract_prompt_text(&json!({ "response": { "prompt": {} } })),
            ""
        );
        assert_eq!(
            extract_prompt_text(&json!({ "response": { "prompt": { "generated_prompt_text": 7 } } })),
            ""
        );
    }
}
