// YouTube ingestion subsystem
//
// Stages, leaf to root:
// - validator: local URL validation and video id extraction
// - probe: single metadata probe with policy checks
// - language + transcript: caption track selection and the fetch cascade
// - ytdlp + command: the production platform capability (yt-dlp and plain HTTP)
//
// The orchestrator that chains these lives in `crate::ingest`.

pub mod command;
pub mod language;
pub mod probe;
pub mod transcript;
pub mod validator;
pub mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use language::expand_language_preferences;
pub use probe::{MetadataProber, ProbePolicy};
pub use transcript::{FetchStrategy, TranscriptFetcher, select_track};
pub use validator::UrlValidator;
pub use ytdlp::YtDlpPlatform;

use crate::config::YoutubeConfig;
use crate::error::{ReangleError, Result};

/// A validated reference to a single video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoIdentity {
    /// Always 11 characters of `[A-Za-z0-9_-]`
    pub video_id: String,
    pub source_host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Public,
    Unlisted,
    /// Private, members-only or login-required
    Restricted,
}

impl Availability {
    /// Map the platform's availability string. Missing values mean the probe
    /// could read the page anonymously, which only happens for public videos.
    pub fn from_platform(value: Option<&str>) -> Self {
        match value.map(|v| v.to_ascii_lowercase()) {
            None => Self::Public,
            Some(v) => match v.as_str() {
                "public" => Self::Public,
                "unlisted" => Self::Unlisted,
                _ => Self::Restricted,
            },
        }
    }
}

/// Metadata confirmed by the network probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub is_live: bool,
    pub availability: Availability,
    pub age_limit: u32,
}

/// Metadata record exactly as the platform reports it, before any policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub is_live: Option<bool>,
    pub live_status: Option<String>,
    pub availability: Option<String>,
    pub age_limit: Option<u32>,
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub entries: Option<Vec<serde_json::Value>>,
}

/// One caption track offered for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub language_code: String,
    pub is_generated: bool,
    pub name: Option<String>,
    /// Direct download location, when the platform exposes one
    pub url: Option<String>,
    /// Caption payload format behind `url` (json3, vtt, srv3, ...)
    pub ext: Option<String>,
}

/// A single caption cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSnippet {
    pub text: String,
    pub start: Option<f64>,
}

/// Cues found by a language-searching fetch path.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageCaptions {
    /// The language that actually matched
    pub language_code: String,
    pub snippets: Vec<CaptionSnippet>,
}

/// Caption file written by the extraction tool.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionFile {
    /// Language taken from the file name
    pub language_code: String,
    /// WebVTT or SRT markup
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptType {
    Human,
    Auto,
}

impl TranscriptType {
    pub fn of(track: &TrackDescriptor) -> Self {
        if track.is_generated { Self::Auto } else { Self::Human }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub raw_text: String,
    pub transcript_type: TranscriptType,
    pub language_code: String,
}

/// Failures reported by the video platform capability.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("subtitles are disabled for video {0}")]
    CaptionsDisabled(String),

    #[error("no transcript found for video {video_id} in languages {languages:?}")]
    NoTranscriptFound { video_id: String, languages: Vec<String> },

    #[error("video {0} is unavailable")]
    VideoUnavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("retrieval failed: {0}")]
    Retrieval(String),
}

impl From<PlatformError> for ReangleError {
    fn from(err: PlatformError) -> Self {
        ReangleError::ContentExtraction(err.to_string())
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Query capability of the video platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Metadata for a URL without downloading media
    async fn probe_metadata(&self, url: &str) -> PlatformResult<RawMetadata>;

    /// All caption tracks of a video
    async fn list_caption_tracks(&self, video_id: &str) -> PlatformResult<Vec<TrackDescriptor>>;

    /// Cues of one caption track
    async fn fetch_track(&self, track: &TrackDescriptor) -> PlatformResult<Vec<CaptionSnippet>>;

    /// Generic fetch-by-id path, trying `languages` in order
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> PlatformResult<LanguageCaptions>;

    /// Caption file as written by the extraction tool, earliest matching
    /// language of `languages` first
    async fn download_caption_file(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> PlatformResult<Option<CaptionFile>>;
}

/// Metadata probe stage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<VideoMetadata>;
}

/// Transcript fetch stage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(
        &self,
        video_id: &str,
        preferred_languages: &[String],
        allow_any_language_fallback: bool,
    ) -> Result<TranscriptResult>;
}

/// Factory for the video platform capability
pub struct VideoPlatformFactory;

impl VideoPlatformFactory {
    /// Create the default platform (yt-dlp backed). Tool availability is
    /// checked on first use, not at construction.
    pub fn create_default(config: &YoutubeConfig) -> Arc<dyn VideoPlatform> {
        Arc::new(YtDlpPlatform::from_config(config))
    }
}

pub(crate) fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Join caption cues into one line per cue, dropping empty ones.
pub(crate) fn join_snippets(snippets: &[CaptionSnippet]) -> String {
    snippets
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_mapping() {
        assert_eq!(Availability::from_platform(None), Availability::Public);
        assert_eq!(Availability::from_platform(Some("public")), Availability::Public);
        assert_eq!(Availability::from_platform(Some("Unlisted")), Availability::Unlisted);
        assert_eq!(Availability::from_platform(Some("private")), Availability::Restricted);
        assert_eq!(Availability::from_platform(Some("needs_auth")), Availability::Restricted);
        assert_eq!(Availability::from_platform(Some("subscriber_only")), Availability::Restricted);
    }

    #[test]
    fn test_join_snippets_skips_blank_cues() {
        let snippets = vec![
            CaptionSnippet { text: " Hello ".to_string(), start: Some(0.0) },
            CaptionSnippet { text: "   ".to_string(), start: Some(1.0) },
            CaptionSnippet { text: "world".to_string(), start: None },
        ];
        assert_eq!(join_snippets(&snippets), "Hello\nworld");
    }

    #[test]
    fn test_platform_errors_become_content_extraction() {
        let err: ReangleError = PlatformError::CaptionsDisabled("dQw4w9WgXcQ".to_string()).into();
        match err {
            ReangleError::ContentExtraction(msg) => {
                assert_eq!(msg, "subtitles are disabled for video dQw4w9WgXcQ")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_raw_metadata_reads_platform_json() {
        let raw: RawMetadata = serde_json::from_str(
            r#"{"id":"dQw4w9WgXcQ","title":"Song","duration":212.0,"is_live":false,
                "availability":"public","age_limit":0,"_type":"video","extra":1}"#,
        )
        .unwrap();
        assert_eq!(raw.kind.as_deref(), Some("video"));
        assert_eq!(raw.duration, Some(212.0));
        assert!(raw.entries.is_none());
    }
}
