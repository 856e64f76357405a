use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{Availability, MetadataProbe, RawMetadata, VideoMetadata, VideoPlatform};
use crate::config::YoutubeConfig;
use crate::error::{ReangleError, Result};

/// Acceptance rules applied to probed metadata.
#[derive(Debug, Clone)]
pub struct ProbePolicy {
    pub timeout: Duration,
    /// Highest accepted age limit (inclusive)
    pub max_age_limit: u32,
    pub allowed_availability: Vec<Availability>,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_age_limit: 17,
            allowed_availability: vec![Availability::Public, Availability::Unlisted],
        }
    }
}

impl ProbePolicy {
    pub fn from_config(config: &YoutubeConfig) -> Self {
        Self {
            timeout: config.probe_timeout(),
            max_age_limit: config.max_age_limit,
            allowed_availability: config.allowed_availability.clone(),
        }
    }

    /// Turn a raw platform record into metadata, or reject it.
    pub fn evaluate(&self, raw: RawMetadata) -> Result<VideoMetadata> {
        let is_playlist = matches!(raw.kind.as_deref(), Some("playlist") | Some("multi_video"))
            || raw.entries.is_some();
        if is_playlist {
            return Err(rejected("URL resolves to a playlist, not a single video"));
        }

        let live_status = raw.live_status.as_deref().unwrap_or_default();
        if raw.is_live.unwrap_or(false) || live_status == "is_live" {
            return Err(rejected("live broadcasts are not supported"));
        }
        if live_status == "is_upcoming" {
            return Err(rejected("upcoming broadcasts are not supported"));
        }

        let duration = match raw.duration {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => return Err(rejected("video duration is missing or not positive")),
        };

        let availability = Availability::from_platform(raw.availability.as_deref());
        if !self.allowed_availability.contains(&availability) {
            return Err(rejected(format!(
                "video is not publicly accessible (availability: {})",
                raw.availability.as_deref().unwrap_or("unknown")
            )));
        }

        let age_limit = raw.age_limit.unwrap_or(0);
        if age_limit > self.max_age_limit {
            return Err(rejected(format!(
                "video is age restricted ({}+), limit is {}",
                age_limit, self.max_age_limit
            )));
        }

        let video_id = raw
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| rejected("metadata probe returned no video id"))?;

        Ok(VideoMetadata {
            video_id,
            title: raw
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            duration_seconds: (duration.round() as u64).max(1),
            is_live: false,
            availability,
            age_limit,
        })
    }
}

/// Metadata probe over the video platform capability
pub struct MetadataProber {
    platform: Arc<dyn VideoPlatform>,
    policy: ProbePolicy,
}

impl MetadataProber {
    pub fn new(platform: Arc<dyn VideoPlatform>, policy: ProbePolicy) -> Self {
        Self { platform, policy }
    }
}

#[async_trait]
impl MetadataProbe for MetadataProber {
    async fn probe(&self, url: &str) -> Result<VideoMetadata> {
        debug!("Probing metadata for {} (timeout {:?})", url, self.policy.timeout);

        let raw = match tokio::time::timeout(self.policy.timeout, self.platform.probe_metadata(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(rejected(format!(
                    "metadata probe timed out after {}s",
                    self.policy.timeout.as_secs()
                )));
            }
        };

        let metadata = self.policy.evaluate(raw)?;
        info!(
            "Probed video {} \"{}\" ({}s)",
            metadata.video_id, metadata.title, metadata.duration_seconds
        );
        Ok(metadata)
    }
}

fn rejected<S: Into<String>>(message: S) -> ReangleError {
    ReangleError::ContentExtraction(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{MockVideoPlatform, PlatformError};

    fn public_video() -> RawMetadata {
        RawMetadata {
            id: Some("dQw4w9WgXcQ".to_string()),
            title: Some("Never Gonna Give You Up".to_string()),
            duration: Some(212.0),
            is_live: Some(false),
            live_status: Some("not_live".to_string()),
            availability: Some("public".to_string()),
            age_limit: Some(0),
            kind: Some("video".to_string()),
            entries: None,
        }
    }

    fn assert_rejected(raw: RawMetadata) -> String {
        match ProbePolicy::default().evaluate(raw) {
            Err(ReangleError::ContentExtraction(msg)) => msg,
            other => panic!("expected ContentExtraction, got {other:?}"),
        }
    }

    #[test]
    fn test_accepts_public_video() {
        let metadata = ProbePolicy::default().evaluate(public_video()).unwrap();
        assert_eq!(metadata.video_id, "dQw4w9WgXcQ");
        assert_eq!(metadata.duration_seconds, 212);
        assert_eq!(metadata.availability, Availability::Public);
        assert!(!metadata.is_live);
    }

    #[test]
    fn test_rejects_live_even_with_valid_duration() {
        let raw = RawMetadata { is_live: Some(true), ..public_video() };
        assert!(assert_rejected(raw).contains("live"));

        let raw = RawMetadata {
            is_live: None,
            live_status: Some("is_upcoming".to_string()),
            ..public_video()
        };
        assert!(assert_rejected(raw).contains("upcoming"));
    }

    #[test]
    fn test_rejects_playlists() {
        let raw = RawMetadata { kind: Some("playlist".to_string()), ..public_video() };
        assert!(assert_rejected(raw).contains("playlist"));

        let raw = RawMetadata { entries: Some(vec![]), ..public_video() };
        assert!(assert_rejected(raw).contains("playlist"));
    }

    #[test]
    fn test_rejects_missing_or_zero_duration() {
        assert_rejected(RawMetadata { duration: None, ..public_video() });
        assert_rejected(RawMetadata { duration: Some(0.0), ..public_video() });
        assert_rejected(RawMetadata { duration: Some(-3.0), ..public_video() });
    }

    #[test]
    fn test_rejects_restricted_availability() {
        for availability in ["private", "premium_only", "subscriber_only", "needs_auth"] {
            let raw = RawMetadata { availability: Some(availability.to_string()), ..public_video() };
            assert!(assert_rejected(raw).contains(availability));
        }
    }

    #[test]
    fn test_age_limit_threshold_is_configurable() {
        let raw = RawMetadata { age_limit: Some(18), ..public_video() };
        assert!(assert_rejected(raw.clone()).contains("18+"));

        let lenient = ProbePolicy { max_age_limit: 18, ..ProbePolicy::default() };
        assert_eq!(lenient.evaluate(raw).unwrap().age_limit, 18);
    }

    #[test]
    fn test_unlisted_is_allowed_by_default_but_configurable() {
        let raw = RawMetadata { availability: Some("unlisted".to_string()), ..public_video() };
        assert!(ProbePolicy::default().evaluate(raw.clone()).is_ok());

        let strict = ProbePolicy {
            allowed_availability: vec![Availability::Public],
            ..ProbePolicy::default()
        };
        assert!(strict.evaluate(raw).is_err());
    }

    #[test]
    fn test_missing_title_defaults() {
        let metadata = ProbePolicy::default()
            .evaluate(RawMetadata { title: None, ..public_video() })
            .unwrap();
        assert_eq!(metadata.title, "Untitled");
    }

    #[tokio::test]
    async fn test_probe_surfaces_platform_errors_as_content_extraction() {
        let mut platform = MockVideoPlatform::new();
        platform.expect_probe_metadata().times(1).returning(|_| {
            Err(PlatformError::ToolUnavailable {
                tool: "yt-dlp".to_string(),
                reason: "not found".to_string(),
            })
        });

        let prober = MetadataProber::new(Arc::new(platform), ProbePolicy::default());
        let err = prober.probe("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
        match err {
            ReangleError::ContentExtraction(msg) => assert!(msg.contains("yt-dlp is not available")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_applies_policy() {
        let mut platform = MockVideoPlatform::new();
        platform
            .expect_probe_metadata()
            .times(1)
            .returning(|_| Ok(RawMetadata { is_live: Some(true), ..public_video() }));

        let prober = MetadataProber::new(Arc::new(platform), ProbePolicy::default());
        assert!(prober.probe("https://youtu.be/dQw4w9WgXcQ").await.is_err());
    }
}
