//! Input sources for the rewrite workflow: pasted text, web pages, local
//! files and YouTube videos.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::error::{ReangleError, Result};
use crate::ingest::{IngestRequest, IngestionMeta, Ingestor};

const BLOCK_TAGS: [&str; 10] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "pre", "blockquote"];
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];
const BOILERPLATE_MARKERS: [&str; 14] = [
    "nav", "navbar", "menu", "sidebar", "footer", "header", "banner", "cookie", "consent", "ads", "advert", "promo",
    "subscribe", "newsletter",
];

#[derive(Debug, Clone)]
pub enum Source {
    Text(String),
    Url(String),
    File(PathBuf),
    YouTube(IngestRequest),
}

/// Text obtained from a source, plus ingestion details for videos.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub text: String,
    pub ingestion: Option<IngestionMeta>,
}

pub struct SourceLoader {
    client: Client,
    ingestor: Option<Arc<Ingestor>>,
}

impl SourceLoader {
    pub fn new(config: &ExtractConfig, ingestor: Option<Arc<Ingestor>>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.url_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ReangleError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, ingestor })
    }

    pub async fn load(&self, source: &Source) -> Result<LoadedSource> {
        let (text, ingestion) = match source {
            Source::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ReangleError::InvalidInput("text is empty".to_string()));
                }
                (text.trim().to_string(), None)
            }
            Source::Url(url) => (self.fetch_page(url).await?, None),
            Source::File(path) => (read_text_file(path).await?, None),
            Source::YouTube(request) => {
                let ingestor = self.ingestor.as_ref().ok_or_else(|| {
                    ReangleError::InvalidInput("YouTube sources need the ingestion pipeline".to_string())
                })?;
                let outcome = ingestor.ingest(request).await?;
                (outcome.text, Some(outcome.meta))
            }
        };

        if text.trim().is_empty() {
            return Err(ReangleError::ContentExtraction("empty content after extraction".to_string()));
        }
        Ok(LoadedSource { text, ingestion })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let url = normalize_page_url(url)?;
        info!("Fetching {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ReangleError::ContentExtraction(format!("failed to fetch {}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReangleError::ContentExtraction(format!("HTTP {} fetching {}", status, url)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ReangleError::ContentExtraction(format!("failed to read {}: {}", url, e)))?;
        debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(extract_main_text(&html))
    }
}

/// Add `https://` when no scheme is given and check the result parses.
pub fn normalize_page_url(input: &str) -> Result<url::Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ReangleError::InvalidInput("URL is empty".to_string()));
    }
    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let url = url::Url::parse(&with_scheme)
        .map_err(|e| ReangleError::InvalidInput(format!("invalid URL '{}': {}", input, e)))?;
    if url.host_str().is_none() {
        return Err(ReangleError::InvalidInput(format!("URL '{}' has no host", input)));
    }
    Ok(url)
}

/// Readable text of an HTML page, one trimmed line per block.
///
/// The densest `article`/`main`/`section`/`div` container wins, scored by
/// text length minus twice its link text. Containers that look like
/// navigation or page chrome are skipped. Falls back to the whole body.
pub fn extract_main_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let best = Selector::parse("article, main, section, div").ok().and_then(|sel| {
        doc.select(&sel)
            .filter(|el| !is_boilerplate(el))
            .filter_map(|el| container_score(&el).map(|score| (score, el)))
            .fold(None, |best: Option<(i64, ElementRef)>, (score, el)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, el)),
            })
            .map(|(_, el)| el)
    });

    let root = best.or_else(|| {
        Selector::parse("body")
            .ok()
            .and_then(|sel| doc.select(&sel).next())
    });
    match root {
        Some(el) => element_lines(el).join("\n"),
        None => String::new(),
    }
}

fn class_or_id(el: &ElementRef) -> String {
    let value = el.value();
    format!("{} {}", value.attr("class").unwrap_or_default(), value.attr("id").unwrap_or_default())
        .to_ascii_lowercase()
}

fn is_boilerplate(el: &ElementRef) -> bool {
    let names = class_or_id(el);
    names.split(|c: char| !c.is_ascii_alphanumeric()).any(|word| BOILERPLATE_MARKERS.contains(&word))
}

fn text_chars<'a>(texts: impl Iterator<Item = &'a str>) -> usize {
    texts.map(|t| t.trim().chars().count()).sum()
}

fn container_score(el: &ElementRef) -> Option<i64> {
    let text = text_chars(el.text());
    if text < 20 {
        return None;
    }
    let links = Selector::parse("a")
        .map(|sel| el.select(&sel).map(|a| text_chars(a.text())).sum::<usize>())
        .unwrap_or(0);

    let mut score = text as i64 - 2 * links as i64;
    match el.value().name() {
        "article" => score += 500,
        "main" => score += 300,
        _ => {}
    }
    if links > text / 2 {
        score -= 500;
    }
    (score > 0).then_some(score)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_ancestor_in(el: &ElementRef, tags: &[&str]) -> bool {
    el.ancestors()
        .filter_map(|a| a.value().as_element())
        .any(|e| tags.contains(&e.name()))
}

/// One line per top-level block element. Containers without block markup
/// keep the line breaks of their visible text.
fn element_lines(root: ElementRef) -> Vec<String> {
    let block_selector = BLOCK_TAGS.join(", ");
    let lines: Vec<String> = Selector::parse(&block_selector)
        .map(|sel| {
            root.select(&sel)
                .filter(|el| !has_ancestor_in(el, &BLOCK_TAGS) && !has_ancestor_in(el, &HIDDEN_TAGS))
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if !lines.is_empty() {
        return lines;
    }

    let visible: String = root
        .descendants()
        .filter(|node| {
            !node
                .ancestors()
                .filter_map(|a| a.value().as_element())
                .any(|e| HIDDEN_TAGS.contains(&e.name()))
        })
        .filter_map(|node| node.value().as_text().map(|t| String::from(&**t)))
        .collect();
    visible
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

async fn read_text_file(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        None | Some("txt") | Some("text") | Some("md") | Some("markdown") => {}
        Some("pdf") | Some("docx") | Some("doc") => {
            return Err(ReangleError::InvalidInput(format!(
                "document extraction is not supported: {}",
                path.display()
            )));
        }
        Some(other) => {
            return Err(ReangleError::InvalidInput(format!("unsupported file type '.{}'", other)));
        }
    }

    let bytes = tokio::fs::read(path).await?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}
