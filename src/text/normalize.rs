use regex::Regex;
use std::sync::LazyLock;

/// Non-speech caption markers such as `[Music]`, `(applause)` or `[音乐]`.
static SOUND_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[\[(]\s*(?:music|applause|laughter|laughs|cheering|inaudible|silence|noise|音乐|音樂|掌声|掌聲|笑声|笑聲|欢呼|歡呼)\s*[\])]",
    )
    .expect("sound marker pattern is valid")
});

static INLINE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]{2,}").expect("inline spaces pattern is valid"));

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank runs pattern is valid"));

const INVISIBLE: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

/// First cleanup pass: line endings, sound markers, whitespace runs.
pub fn basic_cleanup(text: &str) -> String {
    let mut cleaned = text.replace("\r\n", "\n").replace('\r', "\n");

    // Removing a marker can join the halves of an enclosing one.
    loop {
        let next = SOUND_MARKER.replace_all(&cleaned, "").into_owned();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }

    let cleaned = INLINE_SPACES.replace_all(&cleaned, " ");
    BLANK_RUNS.replace_all(&cleaned, "\n\n").into_owned()
}

/// Second pass: trim each line, collapse consecutive duplicate lines and
/// keep at most one blank line between paragraphs.
///
/// Duplicates are compared against the previous non-blank line, so a line
/// repeated across a paragraph break is still dropped.
pub fn normalize_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut last_content: Option<String> = None;
    let mut pending_blank = false;

    for raw in text.split('\n') {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if last_content.as_deref() == Some(line.as_str()) {
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        last_content = Some(line.clone());
        lines.push(line);
    }

    lines.join("\n")
}

/// Full transcript normalization. Idempotent.
pub fn normalize_transcript(text: &str) -> String {
    let mut current = normalize_text(&basic_cleanup(&strip_invisible(text)));
    // Dropping a duplicate line can bring the halves of a marker together.
    loop {
        let next = normalize_text(&basic_cleanup(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}
