/// Regional and script variants tried before the bare language code.
fn variants(code: &str) -> &'static [&'static str] {
    match code {
        "zh" => &["zh-Hans", "zh-Hant", "zh-CN", "zh-TW", "zh-HK", "zh-SG"],
        "en" => &["en-US", "en-GB", "en-CA", "en-AU"],
        "es" => &["es-419", "es-ES", "es-MX"],
        "pt" => &["pt-BR", "pt-PT"],
        "fr" => &["fr-FR", "fr-CA"],
        "de" => &["de-DE", "de-AT", "de-CH"],
        "sr" => &["sr-Latn", "sr-Cyrl"],
        _ => &[],
    }
}

/// Expand logical language preferences into the ordered list of concrete
/// caption codes to look for.
///
/// Each bare code is followed by its common variants and then the bare code
/// itself. Codes that already carry a region or script are kept as given.
/// Order is preserved and duplicates (case-insensitive) are dropped.
pub fn expand_language_preferences(preferences: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |code: &str| {
        if !expanded.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            expanded.push(code.to_string());
        }
    };

    for preference in preferences {
        let code = preference.trim().replace('_', "-");
        if code.is_empty() {
            continue;
        }
        let bare = code.to_ascii_lowercase();
        for variant in variants(&bare) {
            push(variant);
        }
        push(&code);
    }

    expanded
}
