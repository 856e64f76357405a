use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{ReangleError, Result};
use crate::rewrite::Rewriter;

/// Requested strategy for text that exceeds the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthMode {
    #[default]
    Truncate,
    SingleSummarize,
}

impl FromStr for LengthMode {
    type Err = ReangleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "single_summarize" => Ok(Self::SingleSummarize),
            other => Err(ReangleError::InvalidInput(format!(
                "unknown length mode '{}' (expected truncate or single_summarize)",
                other
            ))),
        }
    }
}

impl fmt::Display for LengthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthMode::Truncate => write!(f, "truncate"),
            LengthMode::SingleSummarize => write!(f, "single_summarize"),
        }
    }
}

/// Strategy that was actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedLengthMode {
    Original,
    Truncate,
    SingleSummarize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthPolicyResult {
    pub text: String,
    pub mode: AppliedLengthMode,
    /// Lengths are in characters
    pub original_length: usize,
    pub final_length: usize,
    pub truncated: bool,
}

fn default_summarize_instruction(max_chars: usize) -> String {
    format!(
        "Summarize the following transcript into a compressed version of about {} characters. \
         Keep the key facts, names and numbers, drop filler and repetition, and write in the \
         same language as the transcript. Output only the summary.",
        max_chars
    )
}

/// Enforce the output budget on `text`.
///
/// Text within the budget is returned untouched whatever the mode. In
/// summarize mode the rewriter is called exactly once and its output is
/// taken as is, even if it overshoots the budget.
pub async fn apply_length_policy(
    text: &str,
    mode: LengthMode,
    max_chars: usize,
    rewriter: Option<&dyn Rewriter>,
    summarize_instruction: Option<&str>,
) -> Result<LengthPolicyResult> {
    if max_chars == 0 {
        return Err(ReangleError::InvalidInput("max_chars must be greater than zero".to_string()));
    }

    let original_length = text.chars().count();
    if original_length <= max_chars {
        return Ok(LengthPolicyResult {
            text: text.to_string(),
            mode: AppliedLengthMode::Original,
            original_length,
            final_length: original_length,
            truncated: false,
        });
    }

    match mode {
        LengthMode::Truncate => {
            let text: String = text.chars().take(max_chars).collect();
            info!("Truncated text from {} to {} chars", original_length, max_chars);
            Ok(LengthPolicyResult {
                text,
                mode: AppliedLengthMode::Truncate,
                original_length,
                final_length: max_chars,
                truncated: true,
            })
        }
        LengthMode::SingleSummarize => {
            let rewriter = rewriter.ok_or_else(|| {
                ReangleError::InvalidInput("single_summarize mode requires a configured LLM provider".to_string())
            })?;
            let instruction = summarize_instruction
                .map(str::to_string)
                .unwrap_or_else(|| default_summarize_instruction(max_chars));

            let summary = rewriter.rewrite(&instruction, text).await.map_err(|e| {
                warn!("Summarization call failed: {}", e);
                ReangleError::ContentExtraction(format!("summarization failed: {}", e))
            })?;

            let final_length = summary.chars().count();
            info!("Summarized text from {} to {} chars", original_length, final_length);
            Ok(LengthPolicyResult {
                text: summary,
                mode: AppliedLengthMode::SingleSummarize,
                original_length,
                final_length,
                truncated: false,
            })
        }
    }
}
