use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{Result, ReangleError};
use crate::youtube::CaptionSnippet;

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("inline tag pattern is valid"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]+);").expect("entity pattern is valid")
});

/// Parse WebVTT or SRT caption markup into plain caption cues.
///
/// Headers, NOTE/STYLE/REGION blocks, sequence numbers, timing lines and
/// inline styling tags are dropped. Each remaining cue becomes one snippet
/// whose lines are joined with `\n`.
pub fn parse_subtitle_markup(content: &str) -> Vec<CaptionSnippet> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut snippets = Vec::new();

    for block in content.split("\n\n") {
        let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let Some(first) = lines.first() else {
            continue;
        };
        if ["WEBVTT", "NOTE", "STYLE", "REGION"].iter().any(|h| first.starts_with(h)) {
            continue;
        }

        let Some(timing_idx) = lines.iter().position(|l| l.contains("-->")) else {
            continue;
        };
        let start = lines[timing_idx]
            .split("-->")
            .next()
            .and_then(|t| parse_timestamp(t.trim()));

        let text = lines[timing_idx + 1..]
            .iter()
            .map(|l| decode_entities(&INLINE_TAG.replace_all(l, "")).trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if !text.is_empty() {
            snippets.push(CaptionSnippet { text, start });
        }
    }

    snippets
}

#[derive(Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<u64>,
    segs: Option<Vec<Json3Segment>>,
}

#[derive(Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse the platform's json3 caption payload.
pub fn parse_json3(content: &str) -> Result<Vec<CaptionSnippet>> {
    let captions: Json3Captions = serde_json::from_str(content)
        .map_err(|e| ReangleError::ContentExtraction(format!("Failed to parse json3 captions: {}", e)))?;

    Ok(captions
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(CaptionSnippet {
                text,
                start: event.t_start_ms.map(|ms| ms as f64 / 1000.0),
            })
        })
        .collect())
}

/// Parse a caption timestamp (`HH:MM:SS.mmm`, `MM:SS.mmm` or SRT's
/// `HH:MM:SS,mmm`) into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let value = value.split_whitespace().next()?.replace(',', ".");
    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some((hours * 3600 + minutes * 60) as f64 + seconds)
}

/// Decode named and numeric character references in one pass. Unknown or
/// invalid references are kept as written.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "nbsp" => Some(' '),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(|code| code.ok())
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
