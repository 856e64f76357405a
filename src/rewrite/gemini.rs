use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::Rewriter;
use super::common::{build_combined_prompt, endpoint_url, http_client, non_empty_output, require_api_key};
use crate::config::LlmConfig;
use crate::error::{ReangleError, Result};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default()
    }
}

/// Google Gemini generateContent over REST
pub struct GeminiRewriter {
    client: Client,
    config: LlmConfig,
    api_key: String,
}

impl GeminiRewriter {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key: require_api_key(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    async fn rewrite(&self, instruction: &str, source: &str) -> Result<String> {
        let request = json!({
            "contents": [{ "parts": [{ "text": build_combined_prompt(instruction, source) }] }],
            "generationConfig": { "temperature": self.config.temperature },
        });

        let url = endpoint_url(
            &self.config.endpoint,
            &format!("models/{}:generateContent", self.config.model),
        );
        debug!("Sending rewrite request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReangleError::LlmProvider(format!("Gemini API error {}: {}", status, error_text)));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("Failed to parse response: {}", e)))?;

        let text = non_empty_output("Gemini", &reply.text())?;
        info!("Rewrite finished with {} ({} chars)", self.config.model, text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.text(), "Hello world");
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let reply: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(reply.text(), "");
    }
}
