//! Caption track selection and the transcript fetch cascade.
//!
//! The fetcher never transcribes audio. It lists the caption tracks once,
//! picks one by preference, then walks an ordered list of strategies until
//! one yields text:
//!
//! 1. `SelectedTrack`: download the selected track directly
//! 2. `TranscriptById`: the generic fetch-by-id path with the same languages
//! 3. `CaptionFile`: let the extraction tool write a caption file and parse it

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    PlatformError, TrackDescriptor, TranscriptResult, TranscriptSource, TranscriptType, VideoPlatform,
    expand_language_preferences, join_snippets,
};
use crate::error::{ReangleError, Result};
use crate::subtitle::parse_subtitle_markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    SelectedTrack,
    TranscriptById,
    CaptionFile,
}

impl FetchStrategy {
    pub const DEFAULT_ORDER: [FetchStrategy; 3] = [
        FetchStrategy::SelectedTrack,
        FetchStrategy::TranscriptById,
        FetchStrategy::CaptionFile,
    ];
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::SelectedTrack => write!(f, "selected track"),
            FetchStrategy::TranscriptById => write!(f, "fetch by id"),
            FetchStrategy::CaptionFile => write!(f, "caption file download"),
        }
    }
}

/// Outcome of a single strategy.
enum Attempt {
    /// Text and the language it was found in
    Found(String, String),
    NotFound(String),
}

/// Pick the caption track to use.
///
/// Priority: a human track in a preferred language, then a generated track
/// in a preferred language (both in the order of `languages`). With
/// `allow_any_language_fallback`, any human track and finally any generated
/// track is accepted.
pub fn select_track<'a>(
    tracks: &'a [TrackDescriptor],
    languages: &[String],
    allow_any_language_fallback: bool,
) -> Option<&'a TrackDescriptor> {
    let in_language = |generated: bool| {
        languages.iter().find_map(|code| {
            tracks
                .iter()
                .find(|t| t.is_generated == generated && t.language_code.eq_ignore_ascii_case(code))
        })
    };

    in_language(false).or_else(|| in_language(true)).or_else(|| {
        if !allow_any_language_fallback {
            return None;
        }
        tracks
            .iter()
            .find(|t| !t.is_generated)
            .or_else(|| tracks.iter().find(|t| t.is_generated))
    })
}

/// Transcript type for text found in `language_code`. The selected track
/// decides for its own language. Other languages count as human when the
/// listing has a human track in them.
fn type_for_language(selected: &TrackDescriptor, tracks: &[TrackDescriptor], language_code: &str) -> TranscriptType {
    if selected.language_code.eq_ignore_ascii_case(language_code) {
        return TranscriptType::of(selected);
    }
    let human = tracks
        .iter()
        .any(|t| !t.is_generated && t.language_code.eq_ignore_ascii_case(language_code));
    if human { TranscriptType::Human } else { TranscriptType::Auto }
}

pub struct TranscriptFetcher {
    platform: Arc<dyn VideoPlatform>,
    strategies: Vec<FetchStrategy>,
}

impl TranscriptFetcher {
    pub fn new(platform: Arc<dyn VideoPlatform>) -> Self {
        Self::with_strategies(platform, FetchStrategy::DEFAULT_ORDER.to_vec())
    }

    pub fn with_strategies(platform: Arc<dyn VideoPlatform>, strategies: Vec<FetchStrategy>) -> Self {
        Self { platform, strategies }
    }

    async fn attempt(
        &self,
        strategy: FetchStrategy,
        video_id: &str,
        track: &TrackDescriptor,
        languages: &[String],
    ) -> Attempt {
        let result = match strategy {
            FetchStrategy::SelectedTrack => self
                .platform
                .fetch_track(track)
                .await
                .map(|snippets| (join_snippets(&snippets), track.language_code.clone())),
            FetchStrategy::TranscriptById => self
                .platform
                .fetch_transcript(video_id, languages)
                .await
                .map(|found| (join_snippets(&found.snippets), found.language_code)),
            FetchStrategy::CaptionFile => self
                .platform
                .download_caption_file(video_id, languages)
                .await
                .map(|file| match file {
                    Some(file) => (join_snippets(&parse_subtitle_markup(&file.content)), file.language_code),
                    None => (String::new(), track.language_code.clone()),
                }),
        };

        match result {
            Ok((text, language_code)) if !text.trim().is_empty() => Attempt::Found(text, language_code),
            Ok(_) => Attempt::NotFound("empty transcript".to_string()),
            Err(e) => Attempt::NotFound(e.to_string()),
        }
    }
}

#[async_trait]
impl TranscriptSource for TranscriptFetcher {
    async fn fetch(
        &self,
        video_id: &str,
        preferred_languages: &[String],
        allow_any_language_fallback: bool,
    ) -> Result<TranscriptResult> {
        let languages = expand_language_preferences(preferred_languages);
        debug!("Caption language order for {}: {:?}", video_id, languages);

        let tracks = self.platform.list_caption_tracks(video_id).await?;
        if tracks.is_empty() {
            return Err(PlatformError::CaptionsDisabled(video_id.to_string()).into());
        }
        debug!("Video {} offers {} caption tracks", video_id, tracks.len());

        let track = select_track(&tracks, &languages, allow_any_language_fallback).ok_or_else(|| {
            ReangleError::ContentExtraction(format!(
                "no usable captions for video {} (wanted {:?})",
                video_id, preferred_languages
            ))
        })?;
        let transcript_type = TranscriptType::of(track);
        info!(
            "Selected {:?} caption track '{}' for video {}",
            transcript_type, track.language_code, video_id
        );

        // Fallback paths look for the selected language first.
        let mut fallback_languages = vec![track.language_code.clone()];
        fallback_languages.extend(
            languages
                .into_iter()
                .filter(|code| !code.eq_ignore_ascii_case(&track.language_code)),
        );

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match self.attempt(*strategy, video_id, track, &fallback_languages).await {
                Attempt::Found(raw_text, language_code) => {
                    info!(
                        "Transcript for {} retrieved via {} in '{}' ({} chars)",
                        video_id,
                        strategy,
                        language_code,
                        raw_text.chars().count()
                    );
                    return Ok(TranscriptResult {
                        raw_text,
                        transcript_type: type_for_language(track, &tracks, &language_code),
                        language_code,
                    });
                }
                Attempt::NotFound(reason) => {
                    warn!("Transcript strategy '{}' failed for {}: {}", strategy, video_id, reason);
                    failures.push(format!("{}: {}", strategy, reason));
                }
            }
        }

        Err(ReangleError::ContentExtraction(format!(
            "transcript retrieval failed for video {} ({})",
            video_id,
            failures.join("; ")
        )))
    }
}
