use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::command::{ToolCommandBuilder, ToolOutput};
use super::{
    CaptionFile, CaptionSnippet, LanguageCaptions, PlatformError, PlatformResult, RawMetadata, TrackDescriptor,
    VideoPlatform, watch_url,
};
use crate::config::YoutubeConfig;
use crate::subtitle::{parse_json3, parse_subtitle_markup};

const TOOL_NAME: &str = "yt-dlp";
const TIMEDTEXT_ENDPOINT: &str = "https://www.youtube.com/api/timedtext";
/// BCP 47 code for a caption file whose language cannot be read
const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Debug, Clone)]
enum ToolStatus {
    Available(String),
    Unavailable(String),
}

/// Video platform backed by the yt-dlp binary for metadata and caption
/// discovery, and plain HTTP for caption payloads.
pub struct YtDlpPlatform {
    builder: ToolCommandBuilder,
    binary_path: String,
    status: OnceCell<ToolStatus>,
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl YtDlpPlatform {
    pub fn from_config(config: &YoutubeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            builder: ToolCommandBuilder::new(&config.ytdlp_path),
            binary_path: config.ytdlp_path.clone(),
            status: OnceCell::new(),
            client,
            fetch_timeout: config.fetch_timeout(),
        }
    }

    /// Version string of the tool, checking availability once per instance.
    pub async fn version(&self) -> PlatformResult<String> {
        let status = self
            .status
            .get_or_init(|| async {
                match self.builder.version_check().timeout(self.fetch_timeout).run().await {
                    Ok(output) if output.success => {
                        let version = output.stdout.trim().to_string();
                        info!("Found {} {} at {}", TOOL_NAME, version, self.binary_path);
                        ToolStatus::Available(version)
                    }
                    Ok(output) => ToolStatus::Unavailable(first_line(&output.stderr)),
                    Err(e) => ToolStatus::Unavailable(e.to_string()),
                }
            })
            .await;

        match status {
            ToolStatus::Available(version) => Ok(version.clone()),
            ToolStatus::Unavailable(reason) => Err(PlatformError::ToolUnavailable {
                tool: TOOL_NAME.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    async fn info_json(&self, url: &str, video_id: &str) -> PlatformResult<String> {
        self.version().await?;
        let output = self.builder.probe(url).timeout(self.fetch_timeout).run().await?;
        if !output.success {
            return Err(classify_failure(&output, video_id));
        }
        Ok(output.stdout)
    }

    async fn get_text(&self, request: reqwest::RequestBuilder) -> PlatformResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PlatformError::Timeout(self.fetch_timeout)
            } else {
                PlatformError::Retrieval(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Retrieval(format!("caption request returned HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| PlatformError::Retrieval(e.to_string()))
    }
}

#[async_trait]
impl VideoPlatform for YtDlpPlatform {
    async fn probe_metadata(&self, url: &str) -> PlatformResult<RawMetadata> {
        let stdout = self.info_json(url, url).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| PlatformError::Retrieval(format!("unreadable metadata from {}: {}", TOOL_NAME, e)))
    }

    async fn list_caption_tracks(&self, video_id: &str) -> PlatformResult<Vec<TrackDescriptor>> {
        let stdout = self.info_json(&watch_url(video_id), video_id).await?;
        let tracks = tracks_from_info(&stdout)?;
        debug!("Listed {} caption tracks for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    async fn fetch_track(&self, track: &TrackDescriptor) -> PlatformResult<Vec<CaptionSnippet>> {
        let url = track
            .url
            .as_deref()
            .ok_or_else(|| PlatformError::Retrieval(format!("track '{}' has no download url", track.language_code)))?;

        let body = self.get_text(self.client.get(url)).await?;
        parse_caption_payload(&body, track.ext.as_deref())
    }

    async fn fetch_transcript(&self, video_id: &str, languages: &[String]) -> PlatformResult<LanguageCaptions> {
        for language in languages {
            let request = self.client.get(TIMEDTEXT_ENDPOINT).query(&[
                ("v", video_id),
                ("lang", language.as_str()),
                ("fmt", "json3"),
            ]);
            let body = match self.get_text(request).await {
                Ok(body) => body,
                Err(e) => {
                    debug!("timedtext lookup for {} ({}) failed: {}", video_id, language, e);
                    continue;
                }
            };
            if body.trim().is_empty() {
                continue;
            }

            let snippets = parse_caption_payload(&body, Some("json3"))?;
            if !snippets.is_empty() {
                return Ok(LanguageCaptions {
                    language_code: language.clone(),
                    snippets,
                });
            }
        }

        Err(PlatformError::NoTranscriptFound {
            video_id: video_id.to_string(),
            languages: languages.to_vec(),
        })
    }

    async fn download_caption_file(&self, video_id: &str, languages: &[String]) -> PlatformResult<Option<CaptionFile>> {
        self.version().await?;

        let tmpdir = tempfile::tempdir().map_err(|e| PlatformError::Retrieval(format!("tempdir: {}", e)))?;
        let output = self
            .builder
            .caption_file(&watch_url(video_id), languages, tmpdir.path())
            .timeout(self.fetch_timeout)
            .run()
            .await?;
        if !output.success {
            return Err(classify_failure(&output, video_id));
        }

        let Some(path) = pick_caption_file(tmpdir.path(), languages).await? else {
            return Ok(None);
        };
        debug!("Reading caption file {}", path.display());
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| PlatformError::Retrieval(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(Some(CaptionFile {
            language_code: caption_file_language(&path).unwrap_or_else(|| UNDETERMINED_LANGUAGE.to_string()),
            content,
        }))
    }
}

#[derive(Deserialize)]
struct CaptionInfo {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<CaptionFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<CaptionFormat>>,
}

#[derive(Deserialize)]
struct CaptionFormat {
    ext: Option<String>,
    url: Option<String>,
    name: Option<String>,
}

/// Build track descriptors from an info record. Human tracks come first.
/// Machine translations of the generated track are not real tracks and are
/// skipped, as are live chat replays.
fn tracks_from_info(info_json: &str) -> PlatformResult<Vec<TrackDescriptor>> {
    let info: CaptionInfo = serde_json::from_str(info_json)
        .map_err(|e| PlatformError::Retrieval(format!("unreadable caption listing: {}", e)))?;

    let mut tracks: Vec<TrackDescriptor> = Vec::new();
    let sources = [(false, &info.subtitles), (true, &info.automatic_captions)];
    for (is_generated, map) in sources {
        for (code, formats) in map {
            if code == "live_chat" {
                continue;
            }
            let Some(format) = preferred_format(formats) else {
                continue;
            };
            if is_generated && format.url.as_deref().is_some_and(|u| u.contains("tlang=")) {
                continue;
            }
            let language_code = code.strip_suffix("-orig").unwrap_or(code).to_string();
            if tracks
                .iter()
                .any(|t| t.is_generated == is_generated && t.language_code == language_code)
            {
                continue;
            }
            tracks.push(TrackDescriptor {
                language_code,
                is_generated,
                name: format.name.clone(),
                url: format.url.clone(),
                ext: format.ext.clone(),
            });
        }
    }

    Ok(tracks)
}

fn preferred_format(formats: &[CaptionFormat]) -> Option<&CaptionFormat> {
    ["json3", "vtt", "srt"]
        .iter()
        .find_map(|ext| formats.iter().find(|f| f.ext.as_deref() == Some(*ext) && f.url.is_some()))
        .or_else(|| formats.iter().find(|f| f.url.is_some()))
}

fn parse_caption_payload(body: &str, ext: Option<&str>) -> PlatformResult<Vec<CaptionSnippet>> {
    if ext == Some("json3") || body.trim_start().starts_with('{') {
        parse_json3(body).map_err(|e| PlatformError::Retrieval(e.to_string()))
    } else {
        Ok(parse_subtitle_markup(body))
    }
}

/// First caption file in the directory, preferring files that match the
/// earliest language in `languages`.
async fn pick_caption_file(dir: &Path, languages: &[String]) -> PlatformResult<Option<std::path::PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| PlatformError::Retrieval(format!("failed to list {}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PlatformError::Retrieval(e.to_string()))?
    {
        let path = entry.path();
        if matches!(path.extension().and_then(|e| e.to_str()), Some("vtt") | Some("srt")) {
            files.push(path);
        }
    }
    files.sort();

    let by_language = languages.iter().find_map(|lang| {
        let suffix = format!(".{}.", lang.to_ascii_lowercase());
        files
            .iter()
            .find(|p| p.to_string_lossy().to_ascii_lowercase().contains(&suffix))
            .cloned()
    });
    Ok(by_language.or_else(|| files.into_iter().next()))
}

/// Language code of a caption file named `<id>.<lang>.<ext>`.
fn caption_file_language(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, language) = stem.split_once('.')?;
    let language = language.strip_suffix("-orig").unwrap_or(language);
    (!language.is_empty()).then(|| language.to_string())
}

/// Map a failed tool run to a platform error using its stderr.
fn classify_failure(output: &ToolOutput, video: &str) -> PlatformError {
    let stderr = output.stderr.to_ascii_lowercase();
    if stderr.contains("private video")
        || stderr.contains("video unavailable")
        || stderr.contains("this video is not available")
        || stderr.contains("has been removed")
    {
        PlatformError::VideoUnavailable(video.to_string())
    } else if stderr.contains("sign in") || stderr.contains("login required") {
        PlatformError::Retrieval(format!("login required for {}", video))
    } else if stderr.contains("subtitles are disabled") {
        PlatformError::CaptionsDisabled(video.to_string())
    } else {
        PlatformError::Retrieval(first_line(&output.stderr))
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}
