use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Rewriter;
use super::common::{SYSTEM_PROMPT, build_user_prompt, endpoint_url, http_client, non_empty_output, require_api_key};
use crate::config::LlmConfig;
use crate::error::{ReangleError, Result};

const MODEL_TOTAL_WINDOW: usize = 20_000;
const MODEL_COMPLETION_CAP: usize = 16_000;
const PROMPT_OVERHEAD_TOKENS: usize = 300;
const SAFETY_MARGIN: usize = 500;
const MIN_COMPLETION_TOKENS: usize = 256;

/// Completion token budget for a source of `source_chars` characters.
///
/// The target is 110% of the source (at least 1000) so rewrites do not come
/// back shorter. Input is estimated at four characters per token.
pub fn completion_budget(source_chars: usize) -> Result<usize> {
    let target = 1000.max(source_chars * 11 / 10);
    let approx_input = source_chars / 4 + PROMPT_OVERHEAD_TOKENS;
    let available = MODEL_TOTAL_WINDOW.saturating_sub(approx_input + SAFETY_MARGIN);

    if available < MIN_COMPLETION_TOKENS {
        return Err(ReangleError::InvalidInput(format!(
            "input too long for the model window: ~{} input tokens, window {}, margin {}, {} left for output",
            approx_input, MODEL_TOTAL_WINDOW, SAFETY_MARGIN, available
        )));
    }

    Ok(MIN_COMPLETION_TOKENS.max(target.min(MODEL_COMPLETION_CAP).min(available)))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI chat completions, or any endpoint speaking the same protocol
pub struct OpenAiRewriter {
    client: Client,
    config: LlmConfig,
    api_key: String,
}

impl OpenAiRewriter {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key: require_api_key(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Rewriter for OpenAiRewriter {
    async fn rewrite(&self, instruction: &str, source: &str) -> Result<String> {
        let user_prompt = build_user_prompt(instruction, source);
        let max_tokens = completion_budget(source.chars().count())?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user_prompt },
            ],
            max_tokens,
            temperature: self.config.temperature,
        };

        let url = endpoint_url(&self.config.endpoint, "chat/completions");
        debug!("Sending rewrite request to {} (max_tokens {})", url, max_tokens);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReangleError::LlmProvider(format!(
                "Chat completions error {}: {}",
                status, error_text
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReangleError::LlmProvider(format!("Failed to parse response: {}", e)))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let text = non_empty_output("chat completions", &content)?;
        info!("Rewrite finished with {} ({} chars)", self.config.model, text.chars().count());
        Ok(text)
    }
}
