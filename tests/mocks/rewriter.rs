use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use reangle::error::{ReangleError, Result};
use reangle::rewrite::Rewriter;

/// Rewriter returning a fixed reply and recording `(instruction, source)`.
#[derive(Clone)]
pub struct RecordingRewriter {
    pub reply: String,
    pub fail_with: Option<String>,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingRewriter {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

#[async_trait]
impl Rewriter for RecordingRewriter {
    async fn rewrite(&self, instruction: &str, source: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((instruction.to_string(), source.to_string()));
        if let Some(ref msg) = self.fail_with {
            return Err(ReangleError::LlmProvider(msg.clone()));
        }
        Ok(self.reply.clone())
    }
}
