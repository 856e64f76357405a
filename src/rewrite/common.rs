use reqwest::Client;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{ReangleError, Result};

pub const DEFAULT_INSTRUCTION: &str = "Rewrite this as a news report.";

pub const SYSTEM_PROMPT: &str = "You are a faithful rewriter.\n\
Rewrite the source text in the stance and style the user asks for (academic, news, \
casual, marketing, neutral, positive or critical). Avoid sentence-by-sentence synonym \
swaps; restructure sentences and paragraphs where it helps readability or the style.\n\
\n\
Rules:\n\
1. Follow the requested tone and manner of expression.\n\
2. You may expand, polish or reorganise, but never invent facts, figures, timelines or names \
that are not in the source.\n\
3. Keep every item of the source and keep the length close to the original.\n\
4. Output only the rewritten body, without titles, notes or explanations.";

/// The instruction to use, falling back to the default when blank.
pub fn effective_instruction(instruction: &str) -> &str {
    let trimmed = instruction.trim();
    if trimmed.is_empty() { DEFAULT_INSTRUCTION } else { trimmed }
}

/// User message combining instruction and source, for providers that take
/// the system prompt separately.
pub fn build_user_prompt(instruction: &str, source: &str) -> String {
    format!(
        "Instruction: {}\n\nSource (keep every item):\n{}",
        effective_instruction(instruction),
        source
    )
}

/// Single prompt combining system prompt, instruction and source.
pub fn build_combined_prompt(instruction: &str, source: &str) -> String {
    format!("{}\n\n{}", SYSTEM_PROMPT, build_user_prompt(instruction, source))
}

pub fn http_client(config: &LlmConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ReangleError::LlmProvider(format!("Failed to create HTTP client: {}", e)))
}

pub fn require_api_key(config: &LlmConfig) -> Result<String> {
    config.api_key().ok_or_else(|| {
        ReangleError::Config(format!(
            "No API key for {:?}: set the {} environment variable",
            config.provider, config.api_key_env
        ))
    })
}

/// Trim model output and reject empty responses.
pub fn non_empty_output(provider: &str, text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ReangleError::LlmProvider(format!("{} returned an empty response", provider)));
    }
    Ok(text.to_string())
}

pub(crate) fn endpoint_url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
}
