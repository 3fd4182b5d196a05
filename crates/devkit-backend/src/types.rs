use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Numeric `major.minor.patch` triple. Ordering is purely numeric, so
/// `v10.0.0` sorts above `v9.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl NodeVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Ord for NodeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}

impl PartialOrd for NodeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y.Z format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: &'static str,
        value: String,
    },
}

impl FromStr for NodeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let parts: Vec<&str> = bare.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(VersionParseError::InvalidFormat {
                input: trimmed.to_string(),
            });
        };

        let component = |name: &'static str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|_| VersionParseError::InvalidComponent {
                    component: name,
                    value: value.to_string(),
                })
        };

        Ok(NodeVersion::new(
            component("major", major)?,
            component("minor", minor)?,
            component("patch", patch)?,
        ))
    }
}

/// One installed Node.js version as reported by the version manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Always `v`-prefixed, e.g. `v18.17.0`.
    pub value: String,
    pub is_current: bool,
}

impl VersionRecord {
    pub fn new(value: impl Into<String>, is_current: bool) -> Self {
        Self {
            value: value.into(),
            is_current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub name: String,
    pub url: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvScope {
    User,
    System,
}

impl EnvScope {
    /// Target name understood by `[Environment]::SetEnvironmentVariable`.
    #[must_use]
    pub fn windows_target(self) -> &'static str {
        match self {
            EnvScope::User => "User",
            EnvScope::System => "Machine",
        }
    }
}

impl fmt::Display for EnvScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvScope::User => write!(f, "user"),
            EnvScope::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariableRecord {
    pub name: String,
    pub value: String,
    pub scope: EnvScope,
}

impl EnvVariableRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>, scope: EnvScope) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            scope,
        }
    }
}

/// Raw text a mutating tool invocation printed, handed back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<devkit_exec::ExecutionResult> for ToolOutput {
    fn from(result: devkit_exec::ExecutionResult) -> Self {
        Self {
            stdout: result.stdout,
            stderr: result.stderr,
            warning: None,
        }
    }
}
