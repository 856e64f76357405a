//! Local validation of video URLs. No network access happens here.

use url::Url;

use super::VideoIdentity;
use crate::config::YoutubeConfig;
use crate::error::{ReangleError, Result};

/// Hostnames of the video platform accepted by default.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

const SHORT_LINK_HOST: &str = "youtu.be";
const VIDEO_ID_LEN: usize = 11;

/// Check that a string is a syntactically valid video id.
pub fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_hosts: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()))
    }
}

impl UrlValidator {
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &YoutubeConfig) -> Self {
        Self::new(config.allowed_hosts.iter().cloned())
    }

    /// Validate a video URL and extract its canonical identity.
    pub fn validate(&self, raw_url: &str) -> Result<VideoIdentity> {
        let raw_url = raw_url.trim();
        if raw_url.is_empty() {
            return Err(invalid("URL is empty"));
        }

        let parsed = Url::parse(raw_url)
            .map_err(|e| invalid(format!("malformed URL '{}': {}", raw_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported URL scheme '{}'", parsed.scheme())));
        }

        let host = parsed
            .host_str()
            .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
            .ok_or_else(|| invalid("URL has no host"))?;

        if !self.allowed_hosts.iter().any(|allowed| *allowed == host) {
            return Err(invalid(format!("host '{}' is not a supported video platform", host)));
        }

        let video_id = extract_video_id(&parsed, &host)?;

        Ok(VideoIdentity {
            video_id,
            source_host: host,
        })
    }
}

fn extract_video_id(parsed: &Url, host: &str) -> Result<String> {
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let first = segments.first().map(|s| s.to_ascii_lowercase());

    let candidate = if host == SHORT_LINK_HOST {
        segments.first().map(|s| s.to_string())
    } else {
        match first.as_deref() {
            Some("playlist") => {
                return Err(invalid("playlist URLs are not supported, link a single video"));
            }
            Some("channel") | Some("c") | Some("user") => {
                return Err(invalid("channel and user pages are not supported, link a single video"));
            }
            Some(seg) if seg.starts_with('@') => {
                return Err(invalid("channel pages are not supported, link a single video"));
            }
            Some("watch") => {
                let video = query_value(parsed, "v");
                if video.is_none() && query_value(parsed, "list").is_some() {
                    return Err(invalid("playlist URLs are not supported, link a single video"));
                }
                video
            }
            Some("shorts") | Some("embed") | Some("live") | Some("v") => segments.get(1).map(|s| s.to_string()),
            _ => None,
        }
    };

    match candidate {
        Some(id) if is_valid_video_id(&id) => Ok(id),
        Some(id) => Err(invalid(format!("'{}' is not a valid video id", id))),
        None => Err(invalid(format!("no video id found in URL '{}'", parsed))),
    }
}

fn query_value(parsed: &Url, key: &str) -> Option<String> {
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid<S: Into<String>>(message: S) -> ReangleError {
    ReangleError::InvalidInput(message.into())
}
