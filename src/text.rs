use once_cell::sync::Lazy;
use regex::Regex;

/// Single-element marker for "field has no data". Callers must treat a
/// `[NO_DATA]` list differently from an empty one: render a dash, not a list.
pub const NO_DATA: &str = "-";

static NOTION_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(https://www\.notion\.so/[^)]+\)").expect("static pattern is valid")
});

/// Splits a raw Notion multi-value cell into clean items.
///
/// Link fragments like `(https://www.notion.so/abc123)` are removed, the rest
/// is split on commas, and each piece loses surrounding whitespace plus one
/// pair of enclosing double quotes. Order is preserved; duplicates are kept.
/// Absent or blank input yields the `["-"]` placeholder.
pub fn clean_multi_value(raw: Option<&str>) -> Vec<String> {
    let Some(text) = raw else {
        return vec![NO_DATA.to_string()];
    };
    if text.trim().is_empty() {
        return vec![NO_DATA.to_string()];
    }
    let stripped = NOTION_LINK.replace_all(text, "");
    stripped
        .split(',')
        .map(|piece| strip_enclosing_quotes(piece.trim()).to_string())
        .collect()
}

/// True when the list is the "no data" placeholder rather than real items.
pub fn is_placeholder(items: &[String]) -> bool {
    matches!(items, [only] if only == NO_DATA)
}

/// Normalizes a title for comparison: everything before the first colon,
/// trimmed and lowercased. Never used for display.
pub fn title_prefix(name: &str) -> String {
    let head = name.split(':').next().unwrap_or(name);
    head.trim().to_lowercase()
}

fn strip_enclosing_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}
