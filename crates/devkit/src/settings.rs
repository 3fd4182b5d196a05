use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use devkit_exec::StderrPolicy;
use devkit_platform::AppPaths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Per-attempt timeout for listing and lookup commands.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Base URL of a Node.js dist mirror; nodejs.org when unset.
    #[serde(default)]
    pub node_dist_mirror: Option<String>,

    /// Ask the release index when nvm cannot list available versions.
    #[serde(default = "default_true")]
    pub remote_fallback: bool,

    /// Use this nvm directory (Unix) or `nvm.exe` (Windows) instead of
    /// detecting it.
    #[serde(default)]
    pub nvm_path: Option<PathBuf>,

    /// Treat stderr from an otherwise successful tool run as an error.
    #[serde(default = "default_true")]
    pub strict_stderr: bool,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_install_timeout() -> u64 {
    600
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            install_timeout_secs: default_install_timeout(),
            http_timeout_secs: default_http_timeout(),
            node_dist_mirror: None,
            remote_fallback: true,
            nvm_path: None,
            strict_stderr: true,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from(&paths.settings_file())
    }

    /// Read settings from `path`. A missing or unreadable file gives the
    /// defaults; missing fields take their defaults individually.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn stderr_policy(&self) -> StderrPolicy {
        if self.strict_stderr {
            StderrPolicy::Surface
        } else {
            StderrPolicy::Ignore
        }
    }
}
