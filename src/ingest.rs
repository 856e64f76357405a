//! YouTube ingestion pipeline: validate, probe, fetch, normalize, enforce length.
//!
//! Stages run strictly in sequence and the first failure aborts the run with
//! that stage's error. Nothing is retried across stages.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ReangleError, Result};
use crate::rewrite::Rewriter;
use crate::text::{AppliedLengthMode, LengthMode, apply_length_policy, normalize_transcript};
use crate::youtube::{
    MetadataProbe, MetadataProber, ProbePolicy, TranscriptFetcher, TranscriptSource, TranscriptType,
    UrlValidator, VideoPlatform,
};

/// Parameters of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub url: String,
    /// `None` uses the configured preferences
    pub preferred_languages: Option<Vec<String>>,
    pub allow_any_language_fallback: bool,
    pub length_mode: LengthMode,
    pub max_chars: usize,
    pub summarize_instruction: Option<String>,
}

impl IngestRequest {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            preferred_languages: None,
            allow_any_language_fallback: true,
            length_mode: LengthMode::Truncate,
            max_chars: 12_000,
            summarize_instruction: None,
        }
    }

    /// Request pre-filled from the `[youtube]` and `[length]` sections.
    pub fn from_config<S: Into<String>>(url: S, config: &Config) -> Self {
        Self {
            url: url.into(),
            preferred_languages: None,
            allow_any_language_fallback: config.youtube.allow_any_language_fallback,
            length_mode: config.length.mode,
            max_chars: config.length.max_chars,
            summarize_instruction: config.length.summarize_instruction.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionMeta {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub transcript_type: TranscriptType,
    pub language_code: String,
    pub length_mode: AppliedLengthMode,
    pub original_length: usize,
    pub final_length: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub text: String,
    pub meta: IngestionMeta,
}

pub struct Ingestor {
    validator: UrlValidator,
    prober: Arc<dyn MetadataProbe>,
    fetcher: Arc<dyn TranscriptSource>,
    rewriter: Option<Arc<dyn Rewriter>>,
    default_languages: Vec<String>,
}

impl Ingestor {
    pub fn new(
        validator: UrlValidator,
        prober: Arc<dyn MetadataProbe>,
        fetcher: Arc<dyn TranscriptSource>,
        rewriter: Option<Arc<dyn Rewriter>>,
    ) -> Self {
        Self {
            validator,
            prober,
            fetcher,
            rewriter,
            default_languages: vec!["zh".to_string(), "en".to_string()],
        }
    }

    /// Wire the production stages over `platform`.
    pub fn from_config(
        config: &Config,
        platform: Arc<dyn VideoPlatform>,
        rewriter: Option<Arc<dyn Rewriter>>,
    ) -> Self {
        let prober = MetadataProber::new(platform.clone(), ProbePolicy::from_config(&config.youtube));
        let fetcher = TranscriptFetcher::new(platform);
        Self::new(
            UrlValidator::from_config(&config.youtube),
            Arc::new(prober),
            Arc::new(fetcher),
            rewriter,
        )
        .with_default_languages(config.youtube.preferred_languages.clone())
    }

    pub fn with_default_languages(mut self, languages: Vec<String>) -> Self {
        self.default_languages = languages;
        self
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestionOutcome> {
        if request.max_chars == 0 {
            return Err(ReangleError::InvalidInput("max_chars must be greater than zero".to_string()));
        }
        let identity = self.validator.validate(&request.url)?;
        info!("Ingesting video {} from {}", identity.video_id, identity.source_host);

        let metadata = self.prober.probe(&request.url).await?;
        if metadata.video_id != identity.video_id {
            warn!(
                "Probe resolved video id {} for parsed id {}, using the probed id",
                metadata.video_id, identity.video_id
            );
        }

        let languages = request
            .preferred_languages
            .as_deref()
            .filter(|langs| !langs.is_empty())
            .unwrap_or(&self.default_languages);
        let transcript = self
            .fetcher
            .fetch(&metadata.video_id, languages, request.allow_any_language_fallback)
            .await?;

        let normalized = normalize_transcript(&transcript.raw_text);
        if normalized.is_empty() {
            return Err(ReangleError::ContentExtraction(
                "transcript is empty after normalization".to_string(),
            ));
        }

        let length = apply_length_policy(
            &normalized,
            request.length_mode,
            request.max_chars,
            self.rewriter.as_deref(),
            request.summarize_instruction.as_deref(),
        )
        .await?;

        info!(
            "Ingested {} ({:?}, {}): {} -> {} chars",
            metadata.video_id,
            transcript.transcript_type,
            transcript.language_code,
            length.original_length,
            length.final_length
        );

        Ok(IngestionOutcome {
            text: length.text,
            meta: IngestionMeta {
                video_id: metadata.video_id,
                title: metadata.title,
                duration_seconds: metadata.duration_seconds,
                transcript_type: transcript.transcript_type,
                language_code: transcript.language_code,
                length_mode: length.mode,
                original_length: length.original_length,
                final_length: length.final_length,
                truncated: length.truncated,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::MockRewriter;
    use crate::youtube::{
        Availability, MockMetadataProbe, MockTranscriptSource, TranscriptResult, VideoMetadata,
    };

    fn metadata(id: &str) -> VideoMetadata {
        VideoMetadata {
            video_id: id.to_string(),
            title: "Never Gonna Give You Up".to_string(),
            duration_seconds: 212,
            is_live: false,
            availability: Availability::Public,
            age_limit: 0,
        }
    }

    fn transcript(text: &str) -> TranscriptResult {
        TranscriptResult {
            raw_text: text.to_string(),
            transcript_type: TranscriptType::Human,
            language_code: "en".to_string(),
        }
    }

    fn ingestor(
        prober: MockMetadataProbe,
        fetcher: MockTranscriptSource,
        rewriter: Option<MockRewriter>,
    ) -> Ingestor {
        Ingestor::new(
            UrlValidator::default(),
            Arc::new(prober),
            Arc::new(fetcher),
            rewriter.map(|r| Arc::new(r) as Arc<dyn Rewriter>),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_hello_world() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().times(1).returning(|_| Ok(metadata("dQw4w9WgXcQ")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher
            .expect_fetch()
            .withf(|id: &str, langs: &[String], any: &bool| id == "dQw4w9WgXcQ" && langs == ["zh", "en"] && *any)
            .times(1)
            .returning(|_, _, _| Ok(transcript("  Hello   world  \n\nHello   world  ")));

        let outcome = ingestor(prober, fetcher, None)
            .ingest(&IngestRequest::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
            .await
            .unwrap();

        assert_eq!(outcome.text, "Hello world");
        assert_eq!(outcome.meta.video_id, "dQw4w9WgXcQ");
        assert_eq!(outcome.meta.length_mode, AppliedLengthMode::Original);
        assert_eq!(outcome.meta.transcript_type, TranscriptType::Human);
        assert!(!outcome.meta.truncated);
    }

    #[tokio::test]
    async fn test_invalid_url_stops_before_network() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().never();
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().never();

        let err = ingestor(prober, fetcher, None)
            .ingest(&IngestRequest::new("https://www.youtube.com/playlist?list=PL123"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReangleError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_zero_budget_is_rejected_before_network() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().never();
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().never();

        let request = IngestRequest { max_chars: 0, ..IngestRequest::new("https://youtu.be/dQw4w9WgXcQ") };
        let err = ingestor(prober, fetcher, None).ingest(&request).await.unwrap_err();
        assert!(matches!(err, ReangleError::InvalidInput(msg) if msg.contains("max_chars")));
    }

    #[tokio::test]
    async fn test_probe_failure_skips_fetch() {
        let mut prober = MockMetadataProbe::new();
        prober
            .expect_probe()
            .times(1)
            .returning(|_| Err(ReangleError::ContentExtraction("live broadcasts are not supported".to_string())));
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().times(0);

        let err = ingestor(prober, fetcher, None)
            .ingest(&IngestRequest::new("https://youtu.be/dQw4w9WgXcQ"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReangleError::ContentExtraction(msg) if msg.contains("live")));
    }

    #[tokio::test]
    async fn test_probed_id_is_authoritative() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().returning(|_| Ok(metadata("abcdefghijk")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher
            .expect_fetch()
            .withf(|id: &str, _: &[String], _: &bool| id == "abcdefghijk")
            .times(1)
            .returning(|_, _, _| Ok(transcript("text")));

        let outcome = ingestor(prober, fetcher, None)
            .ingest(&IngestRequest::new("https://youtu.be/dQw4w9WgXcQ"))
            .await
            .unwrap();
        assert_eq!(outcome.meta.video_id, "abcdefghijk");
    }

    #[tokio::test]
    async fn test_empty_after_normalization() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().returning(|_| Ok(metadata("dQw4w9WgXcQ")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().returning(|_, _, _| Ok(transcript("[Music]\n[Applause]")));

        let err = ingestor(prober, fetcher, None)
            .ingest(&IngestRequest::new("https://youtu.be/dQw4w9WgXcQ"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReangleError::ContentExtraction(msg) if msg.contains("empty after normalization")));
    }

    #[tokio::test]
    async fn test_request_languages_override_defaults() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().returning(|_| Ok(metadata("dQw4w9WgXcQ")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher
            .expect_fetch()
            .withf(|_: &str, langs: &[String], any: &bool| langs == ["ja"] && !*any)
            .times(1)
            .returning(|_, _, _| Ok(transcript("こんにちは")));

        let request = IngestRequest {
            preferred_languages: Some(vec!["ja".to_string()]),
            allow_any_language_fallback: false,
            ..IngestRequest::new("https://youtu.be/dQw4w9WgXcQ")
        };
        let outcome = ingestor(prober, fetcher, None).ingest(&request).await.unwrap();
        assert_eq!(outcome.text, "こんにちは");
    }

    #[tokio::test]
    async fn test_truncation_is_reported_in_meta() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().returning(|_| Ok(metadata("dQw4w9WgXcQ")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().returning(|_, _, _| Ok(transcript("Hello World")));

        let request = IngestRequest { max_chars: 5, ..IngestRequest::new("https://youtu.be/dQw4w9WgXcQ") };
        let outcome = ingestor(prober, fetcher, None).ingest(&request).await.unwrap();
        assert_eq!(outcome.text, "Hello");
        assert_eq!(outcome.meta.length_mode, AppliedLengthMode::Truncate);
        assert_eq!(outcome.meta.original_length, 11);
        assert_eq!(outcome.meta.final_length, 5);
        assert!(outcome.meta.truncated);
    }

    #[tokio::test]
    async fn test_summarize_calls_rewriter_once() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().returning(|_| Ok(metadata("dQw4w9WgXcQ")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().returning(|_, _, _| Ok(transcript("Hello World")));
        let mut rewriter = MockRewriter::new();
        rewriter.expect_rewrite().times(1).returning(|_, _| Ok("Hi".to_string()));

        let request = IngestRequest {
            length_mode: LengthMode::SingleSummarize,
            max_chars: 5,
            ..IngestRequest::new("https://youtu.be/dQw4w9WgXcQ")
        };
        let outcome = ingestor(prober, fetcher, Some(rewriter)).ingest(&request).await.unwrap();
        assert_eq!(outcome.text, "Hi");
        assert_eq!(outcome.meta.length_mode, AppliedLengthMode::SingleSummarize);
        assert!(!outcome.meta.truncated);
    }

    #[tokio::test]
    async fn test_summarize_without_rewriter_is_invalid_input() {
        let mut prober = MockMetadataProbe::new();
        prober.expect_probe().returning(|_| Ok(metadata("dQw4w9WgXcQ")));
        let mut fetcher = MockTranscriptSource::new();
        fetcher.expect_fetch().returning(|_, _, _| Ok(transcript("Hello World")));

        let request = IngestRequest {
            length_mode: LengthMode::SingleSummarize,
            max_chars: 5,
            ..IngestRequest::new("https://youtu.be/dQw4w9WgXcQ")
        };
        let err = ingestor(prober, fetcher, None).ingest(&request).await.unwrap_err();
        assert!(matches!(err, ReangleError::InvalidInput(_)));
    }

    #[test]
    fn test_outcome_serializes_snake_case_meta() {
        let outcome = IngestionOutcome {
            text: "t".to_string(),
            meta: IngestionMeta {
                video_id: "dQw4w9WgXcQ".to_string(),
                title: "x".to_string(),
                duration_seconds: 1,
                transcript_type: TranscriptType::Auto,
                language_code: "en".to_string(),
                length_mode: AppliedLengthMode::Original,
                original_length: 1,
                final_length: 1,
                truncated: false,
            },
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["meta"]["transcript_type"], "auto");
        assert_eq!(value["meta"]["length_mode"], "original");
    }
}
