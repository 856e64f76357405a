// Rewrite providers
//
// Every provider implements `Rewriter`; the factory picks one from `[llm]`:
// - openai: chat completions on any compatible endpoint, with a completion budget
// - gemini: generateContent REST call
// - ollama: local /api/generate

pub mod common;
pub mod gemini;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

pub use common::{DEFAULT_INSTRUCTION, SYSTEM_PROMPT};
use crate::config::{LlmConfig, ProviderKind};
use crate::error::Result;

/// Text rewrite capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// Rewrite `source` following `instruction`
    async fn rewrite(&self, instruction: &str, source: &str) -> Result<String>;

    /// Check that the provider is reachable and the model usable
    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory for creating rewriter instances
pub struct RewriterFactory;

impl RewriterFactory {
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn Rewriter>> {
        Ok(match config.provider {
            ProviderKind::OpenAi => Arc::new(openai::OpenAiRewriter::new(config)?),
            ProviderKind::Gemini => Arc::new(gemini::GeminiRewriter::new(config)?),
            ProviderKind::Ollama => Arc::new(ollama::OllamaRewriter::new(config)?),
        })
    }
}
