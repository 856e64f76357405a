use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::Rewriter;
use super::common::{SYSTEM_PROMPT, build_user_prompt, endpoint_url, http_client, non_empty_output};
use crate::config::LlmConfig;
use crate::error::{ReangleError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub stream: bool,
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Local Ollama server
pub struct OllamaRewriter {
    client: Client,
    config: LlmConfig,
}

impl OllamaRewriter {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Rewriter for OllamaRewriter {
    async fn rewrite(&self, instruction: &str, source: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: build_user_prompt(instruction, source),
            stream: false,
            options: json!({ "temperature": self.config.temperature }),
        };

        let url = endpoint_url(&self.config.endpoint, "api/generate");
        debug!("Sending rewrite request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReangleError::LlmProvider(format!("Ollama API error {}: {}", status, error_text)));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("Failed to parse response: {}", e)))?;
        if !reply.done {
            debug!("Ollama reported an unfinished generation");
        }

        let text = non_empty_output("Ollama", &reply.response)?;
        info!("Rewrite finished with {} ({} chars)", self.config.model, text.chars().count());
        Ok(text)
    }

    /// Check that Ollama is running and the model is pulled
    async fn check_availability(&self) -> Result<()> {
        let url = endpoint_url(&self.config.endpoint, "api/show");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": self.config.model }))
            .send()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.model);
            Ok(())
        } else {
            Err(ReangleError::LlmProvider(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.model, self.config.model
            )))
        }
    }
}
