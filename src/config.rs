use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, ReangleError};
use crate::text::LengthMode;
use crate::youtube::Availability;
use crate::youtube::validator::DEFAULT_ALLOWED_HOSTS;

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_allowed_availability() -> Vec<Availability> {
    vec![Availability::Public, Availability::Unlisted]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub youtube: YoutubeConfig,
    pub length: LengthConfig,
    pub llm: LlmConfig,
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Path to the yt-dlp binary
    pub ytdlp_path: String,
    /// Timeout for the metadata probe
    pub probe_timeout_secs: u64,
    /// Timeout for caption listing and caption downloads
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Hostnames accepted by the URL validator
    pub allowed_hosts: Vec<String>,
    /// Caption languages in order of preference
    pub preferred_languages: Vec<String>,
    /// Take a caption in any language when none of the preferred ones exist
    pub allow_any_language_fallback: bool,
    /// Highest accepted age limit; 17 rejects content flagged 18+
    pub max_age_limit: u32,
    /// Availability states accepted by the metadata probe
    #[serde(default = "default_allowed_availability")]
    pub allowed_availability: Vec<Availability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthConfig {
    /// How oversized transcripts are reduced
    pub mode: LengthMode,
    /// Output budget in characters
    pub max_chars: usize,
    /// Replaces the built-in summarization instruction
    pub summarize_instruction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI chat completions (or any compatible endpoint)
    OpenAi,
    /// Google Gemini generateContent
    Gemini,
    /// Local Ollama server
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Base URL of the provider API
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key (unused for Ollama)
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Timeout for fetching web pages
    pub url_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube: YoutubeConfig {
                ytdlp_path: "yt-dlp".to_string(),
                probe_timeout_secs: 10,
                fetch_timeout_secs: default_fetch_timeout_secs(),
                allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
                preferred_languages: vec!["zh".to_string(), "en".to_string()],
                allow_any_language_fallback: true,
                max_age_limit: 17,
                allowed_availability: default_allowed_availability(),
            },
            length: LengthConfig {
                mode: LengthMode::Truncate,
                max_chars: 12_000,
                summarize_instruction: None,
            },
            llm: LlmConfig {
                provider: ProviderKind::OpenAi,
                endpoint: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                temperature: 0.7,
                timeout_secs: 300,
            },
            extract: ExtractConfig {
                url_timeout_secs: 30,
                user_agent: format!("reangle/{}", env!("CARGO_PKG_VERSION")),
            },
        }
    }
}

impl YoutubeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReangleError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ReangleError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReangleError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReangleError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reangle.toml");

        Config::default().save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.youtube.ytdlp_path, "yt-dlp");
        assert_eq!(loaded.youtube.max_age_limit, 17);
        assert_eq!(loaded.length.mode, LengthMode::Truncate);
        assert_eq!(loaded.length.max_chars, 12_000);
        assert_eq!(loaded.llm.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn test_partial_youtube_section_uses_defaults() {
        let content = r#"
[youtube]
ytdlp_path = "/usr/local/bin/yt-dlp"
probe_timeout_secs = 5
allowed_hosts = ["youtu.be"]
preferred_languages = ["ja"]
allow_any_language_fallback = false
max_age_limit = 12

[length]
mode = "single_summarize"
max_chars = 4000

[llm]
provider = "ollama"
endpoint = "http://localhost:11434"
model = "qwen2.5:7b"
api_key_env = "UNUSED"
temperature = 0.3
timeout_secs = 120

[extract]
url_timeout_secs = 15
user_agent = "test"
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.youtube.fetch_timeout_secs, 60);
        assert_eq!(
            config.youtube.allowed_availability,
            vec![Availability::Public, Availability::Unlisted]
        );
        assert_eq!(config.length.mode, LengthMode::SingleSummarize);
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert!(config.length.summarize_instruction.is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ReangleError::Config(_)));
    }
}
