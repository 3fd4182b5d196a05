//! Parsers for nvm-windows and nvm-sh output.
//!
//! None of these fail: lines that do not look like what is expected are
//! dropped, and an unrecognisable listing is simply empty.

use std::collections::HashSet;

use devkit_backend::{
    VersionRecord, has_current_annotation, normalize_version, strip_ansi, version_triples,
};

/// Parse `nvm list` (Windows) or `nvm ls` (Unix).
///
/// ```text
///   * 18.17.0 (Currently using 64-bit executable)
///     16.20.0
/// ->     v20.5.0
/// default -> 20 (-> v20.5.0)
/// ```
#[must_use]
pub fn parse_installed(output: &str) -> Vec<VersionRecord> {
    let cleaned = strip_ansi(output);
    let mut records: Vec<VersionRecord> = Vec::new();

    for line in cleaned.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (marked, rest) = split_current_marker(trimmed);

        // Aliases (`default -> 18`, `lts/* -> …`, `system`) name versions
        // that already appear on their own line.
        if !starts_like_version(rest) {
            continue;
        }

        let Some(triple) = version_triples(rest).next() else {
            continue;
        };

        let value = normalize_version(triple);
        let is_current = marked || has_current_annotation(rest);

        match records.iter_mut().find(|record| record.value == value) {
            Some(existing) => existing.is_current |= is_current,
            None => records.push(VersionRecord::new(value, is_current)),
        }
    }

    records
}

/// Parse `nvm list available` (a pipe table on Windows) or `nvm ls-remote`
/// (one version per line on Unix). Versions come back deduplicated and in
/// source order.
#[must_use]
pub fn parse_available(output: &str) -> Vec<String> {
    let cleaned = strip_ansi(output);
    let lines: Vec<&str> = cleaned.lines().map(str::trim).collect();

    let one_per_line = lines.iter().any(|line| is_bare_version(line));

    let found: Vec<&str> = if one_per_line {
        lines
            .iter()
            .filter_map(|line| version_triples(line).next())
            .collect()
    } else {
        lines
            .iter()
            .skip_while(|line| !line.contains('|'))
            .skip(1)
            .flat_map(|line| version_triples(line))
            .collect()
    };

    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(normalize_version)
        .filter(|version| seen.insert(version.clone()))
        .collect()
}

/// Parse `nvm current`. `none`, `system` and nvm-windows' "No current
/// version" message all mean there is no active nvm-managed version.
#[must_use]
pub fn parse_current(output: &str) -> Option<String> {
    let cleaned = strip_ansi(output);
    cleaned
        .lines()
        .map(str::trim)
        .find_map(|line| version_triples(line).next())
        .map(normalize_version)
}

/// Parse `node --version`.
#[must_use]
pub fn parse_node_version(output: &str) -> Option<VersionRecord> {
    parse_current(output).map(|value| VersionRecord::new(value, true))
}

fn split_current_marker(line: &str) -> (bool, &str) {
    if let Some(rest) = line.strip_prefix("->") {
        (true, rest.trim_start())
    } else if let Some(rest) = line.strip_prefix('*') {
        (true, rest.trim_start())
    } else {
        (false, line)
    }
}

fn starts_like_version(text: &str) -> bool {
    let digits = text.strip_prefix('v').unwrap_or(text);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn is_bare_version(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('v') else {
        return false;
    };
    let parts: Vec<&str> = rest.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}
