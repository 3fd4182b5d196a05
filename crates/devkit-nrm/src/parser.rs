use std::sync::LazyLock;

use log::trace;
use regex::Regex;

use devkit_backend::{RegistryRecord, has_current_annotation, strip_ansi};

/// `nrm ls` line shapes, most specific first. Each pattern captures the
/// optional `*` marker, the registry name and its URL.
static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("arrow", r"^(\*?)\s*(\S+?)\s*->\s*(\S+)"),
        ("dashes", r"^(\*?)\s*(\S+?)\s*-{3,}\s*(\S+)"),
        ("whitespace", r"^(\*?)\s*(\S+)\s+(https?://\S+)"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("registry regex compiles")))
    .collect()
});

static CURRENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"当前使用的镜像源是[:：]\s*(\S+)",
        r"(?i)current registry is:?\s*(\S+)",
        r"(?i)you are using\s+(\S+)\s+registry",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("current registry regex compiles"))
    .collect()
});

/// Parse `nrm ls`.
///
/// ```text
/// * npm ---------- https://registry.npmjs.org/
///   yarn --------- https://registry.yarnpkg.com/
/// ```
#[must_use]
pub fn parse_registries(output: &str) -> Vec<RegistryRecord> {
    let cleaned = strip_ansi(output);
    let mut records: Vec<RegistryRecord> = Vec::new();

    for line in cleaned.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((label, captures)) = PATTERNS
            .iter()
            .find_map(|(label, pattern)| pattern.captures(line).map(|c| (label, c)))
        else {
            trace!("nrm: skipping unrecognised line {line:?}");
            continue;
        };
        trace!("nrm: {label} line {line:?}");

        let name = captures[2].to_string();
        if records.iter().any(|record| record.name == name) {
            continue;
        }

        records.push(RegistryRecord {
            name,
            url: captures[3].to_string(),
            is_current: &captures[1] == "*" || has_current_annotation(line),
        });
    }

    records
}

/// Parse `nrm current` (or `npm config get registry`) down to the registry
/// name or URL.
#[must_use]
pub fn parse_current_registry(output: &str) -> Option<String> {
    let cleaned = strip_ansi(output);
    let text = cleaned.trim();

    CURRENT_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text).map(|c| c[1].to_string()))
        .or_else(|| text.split_whitespace().next().map(ToString::to_string))
        .map(|value| value.trim_matches(|c| matches!(c, '\'' | '"' | '.')).to_string())
        .filter(|value| !value.is_empty())
}
