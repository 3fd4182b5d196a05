//! Text helpers shared by the tool output parsers.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static ANSI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\[\d+(?:;\d+)*m").expect("ansi regex compiles")
});

static TRIPLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").expect("version regex compiles"));

const CURRENT_ANNOTATIONS: &[&str] = &["(current)", "(当前)", "currently using"];

/// Remove colour and cursor escape sequences, including the bracket-only
/// `[32m` form some Windows terminals leave behind after dropping `ESC`.
#[must_use]
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_PATTERN.replace_all(text, "")
}

/// Every `X.Y.Z` triple in `line`, in order.
pub fn version_triples(line: &str) -> impl Iterator<Item = &str> {
    TRIPLE_PATTERN.find_iter(line).map(|m| m.as_str())
}

#[must_use]
pub fn has_current_annotation(line: &str) -> bool {
    let lowered = line.to_lowercase();
    CURRENT_ANNOTATIONS
        .iter()
        .any(|annotation| lowered.contains(annotation))
}

/// `18.17.0` and `v18.17.0` both become `v18.17.0`.
#[must_use]
pub fn normalize_version(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('v') {
        trimmed.to_string()
    } else {
        format!("v{trimmed}")
    }
}
