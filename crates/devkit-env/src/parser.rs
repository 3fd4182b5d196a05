use log::warn;
use serde_json::{Map, Value};

use devkit_backend::{EnvScope, EnvVariableRecord};

/// Name prefixes treated as system variables on Unix, where the OS draws
/// no user/system line.
const SYSTEM_PREFIXES: &[&str] = &["USER", "HOME", "PATH"];

#[must_use]
pub fn classify_unix(name: &str) -> EnvScope {
    if SYSTEM_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        EnvScope::System
    } else {
        EnvScope::User
    }
}

/// Parse `printenv`/`env` output. A line that does not start with
/// `NAME=` continues the previous value. User records come first, then
/// system records, each in the order printed.
#[must_use]
pub fn parse_printenv(output: &str) -> Vec<EnvVariableRecord> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for line in output.lines() {
        match line.split_once('=') {
            Some((name, value)) if is_variable_name(name) => {
                match entries.iter_mut().find(|(existing, _)| existing.as_str() == name) {
                    Some(entry) => entry.1 = value.to_string(),
                    None => entries.push((name.to_string(), value.to_string())),
                }
            }
            _ => {
                if let Some((_, value)) = entries.last_mut() {
                    value.push('\n');
                    value.push_str(line);
                }
            }
        }
    }

    let (user, system): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .map(|(name, value)| {
            let scope = classify_unix(&name);
            EnvVariableRecord::new(name, value, scope)
        })
        .partition(|record| record.scope == EnvScope::User);

    user.into_iter().chain(system).collect()
}

/// Parse the `ConvertTo-Json` dump of one Windows environment scope.
/// A blank or undecodable blob is an empty scope.
#[must_use]
pub fn parse_windows_scope(json: &str, scope: EnvScope) -> Vec<EnvVariableRecord> {
    let json = json.trim();
    if json.is_empty() {
        return Vec::new();
    }

    let map: Map<String, Value> = match serde_json::from_str(json) {
        Ok(map) => map,
        Err(error) => {
            warn!("Ignoring unreadable {scope} environment dump: {error}");
            return Vec::new();
        }
    };

    map.into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            EnvVariableRecord::new(name, value, scope)
        })
        .collect()
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && c != '=')
}
