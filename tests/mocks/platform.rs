use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reangle::youtube::{
    CaptionFile, CaptionSnippet, LanguageCaptions, PlatformError, PlatformResult, RawMetadata, TrackDescriptor,
    VideoPlatform,
};

/// Scripted video platform that records every call it receives.
#[derive(Clone)]
pub struct FakePlatform {
    pub metadata: RawMetadata,
    pub probe_delay: Option<Duration>,
    pub tracks: Vec<TrackDescriptor>,
    /// `None` makes the direct track download fail
    pub track_lines: Option<Vec<String>>,
    /// Language reported by the by-id path and the caption file; defaults
    /// to the first requested language
    pub found_language: Option<String>,
    pub by_id_lines: Option<Vec<String>>,
    pub caption_file: Option<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

fn lines(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

pub fn track(language_code: &str, is_generated: bool) -> TrackDescriptor {
    TrackDescriptor {
        language_code: language_code.to_string(),
        is_generated,
        name: None,
        url: Some(format!("https://captions.test/{language_code}")),
        ext: Some("json3".to_string()),
    }
}

pub fn public_video(id: &str) -> RawMetadata {
    RawMetadata {
        id: Some(id.to_string()),
        title: Some("Parliament in session".to_string()),
        duration: Some(1800.4),
        is_live: Some(false),
        live_status: Some("was_live".to_string()),
        availability: Some("public".to_string()),
        age_limit: Some(0),
        kind: Some("video".to_string()),
        entries: None,
    }
}

impl FakePlatform {
    pub fn new(metadata: RawMetadata, tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            metadata,
            probe_delay: None,
            tracks,
            track_lines: None,
            found_language: None,
            by_id_lines: None,
            caption_file: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_track_lines(mut self, texts: &[&str]) -> Self {
        self.track_lines = Some(lines(texts));
        self
    }

    pub fn with_by_id_lines(mut self, texts: &[&str]) -> Self {
        self.by_id_lines = Some(lines(texts));
        self
    }

    pub fn with_caption_file(mut self, content: &str) -> Self {
        self.caption_file = Some(content.to_string());
        self
    }

    pub fn with_found_language(mut self, language_code: &str) -> Self {
        self.found_language = Some(language_code.to_string());
        self
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn language_for(&self, languages: &[String]) -> String {
        self.found_language
            .clone()
            .or_else(|| languages.first().cloned())
            .unwrap_or_default()
    }
}

fn snippets(texts: &[String]) -> Vec<CaptionSnippet> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| CaptionSnippet {
            text: text.clone(),
            start: Some(i as f64),
        })
        .collect()
}

#[async_trait]
impl VideoPlatform for FakePlatform {
    async fn probe_metadata(&self, url: &str) -> PlatformResult<RawMetadata> {
        self.record(format!("probe:{url}"));
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.metadata.clone())
    }

    async fn list_caption_tracks(&self, video_id: &str) -> PlatformResult<Vec<TrackDescriptor>> {
        self.record(format!("list:{video_id}"));
        Ok(self.tracks.clone())
    }

    async fn fetch_track(&self, track: &TrackDescriptor) -> PlatformResult<Vec<CaptionSnippet>> {
        self.record(format!("track:{}", track.language_code));
        match &self.track_lines {
            Some(texts) => Ok(snippets(texts)),
            None => Err(PlatformError::Retrieval("HTTP 429".to_string())),
        }
    }

    async fn fetch_transcript(&self, video_id: &str, languages: &[String]) -> PlatformResult<LanguageCaptions> {
        self.record(format!("by_id:{}:{}", video_id, languages.first().cloned().unwrap_or_default()));
        match &self.by_id_lines {
            Some(texts) => Ok(LanguageCaptions {
                language_code: self.language_for(languages),
                snippets: snippets(texts),
            }),
            None => Err(PlatformError::NoTranscriptFound {
                video_id: video_id.to_string(),
                languages: languages.to_vec(),
            }),
        }
    }

    async fn download_caption_file(&self, video_id: &str, languages: &[String]) -> PlatformResult<Option<CaptionFile>> {
        self.record(format!("file:{video_id}"));
        Ok(self.caption_file.clone().map(|content| CaptionFile {
            language_code: self.language_for(languages),
            content,
        }))
    }
}
