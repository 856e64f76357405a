use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReangleError {
    /// Malformed or unsupported input, or a missing required parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any downstream failure while turning a source into text.
    #[error("Content extraction failed: {0}")]
    ContentExtraction(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ReangleError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT_ERROR",
            Self::ContentExtraction(_) => "CONTENT_EXTRACTION_ERROR",
            Self::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// HTTP-style status a request layer would answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::ContentExtraction(_) => 422,
            Self::LlmProvider(_) => 502,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReangleError>;
