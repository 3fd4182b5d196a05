use std::sync::Arc;

use log::{debug, info, warn};

use devkit_backend::{
    GROUP_CAP, ReleaseIndex, ToolError, ToolOutput, VersionRecord, flatten_groups,
    group_by_major,
};
use devkit_exec::{ChainError, CommandRunner};

use crate::client::NvmClient;
use crate::parser::{parse_available, parse_current, parse_installed, parse_node_version};

/// Node version operations on top of nvm, with the `node --version` and
/// release-index fallbacks.
#[derive(Clone)]
pub struct NvmBackend {
    client: NvmClient,
    runner: Arc<dyn CommandRunner>,
    index: Arc<dyn ReleaseIndex>,
}

impl NvmBackend {
    pub fn new(
        client: NvmClient,
        runner: Arc<dyn CommandRunner>,
        index: Arc<dyn ReleaseIndex>,
    ) -> Self {
        Self {
            client,
            runner,
            index,
        }
    }

    #[must_use]
    pub fn client(&self) -> &NvmClient {
        &self.client
    }

    /// Installed versions in the order nvm prints them.
    ///
    /// # Errors
    /// Returns [`ToolError::NothingFound`] when nvm lists nothing, or the
    /// nvm failure when neither nvm nor `node --version` could run.
    pub async fn list_installed(&self) -> Result<Vec<VersionRecord>, ToolError> {
        let output = match self.client.list_installed().run(self.runner.as_ref()).await {
            Ok(output) => output,
            Err(error @ ChainError::Exhausted { .. }) => {
                return self.installed_from_node(error).await;
            }
            Err(error) => return Err(error.into()),
        };

        let records = parse_installed(&output.stdout);
        debug!("nvm listed {} installed versions", records.len());

        if records.is_empty() {
            return Err(ToolError::NothingFound {
                what: "installed Node.js versions",
            });
        }
        Ok(records)
    }

    async fn installed_from_node(
        &self,
        nvm_error: ChainError,
    ) -> Result<Vec<VersionRecord>, ToolError> {
        warn!("nvm unavailable ({nvm_error}), asking node for its version");

        match self.client.node_version().run(self.runner.as_ref()).await {
            Ok(output) => parse_node_version(&output.stdout)
                .map(|record| vec![record])
                .ok_or_else(|| nvm_error.into()),
            Err(node_error) => {
                debug!("node fallback failed: {node_error}");
                Err(nvm_error.into())
            }
        }
    }

    /// Versions available to install, newest major first, at most
    /// [`GROUP_CAP`] per major.
    ///
    /// # Errors
    /// Returns the local nvm failure when the release index is empty as well,
    /// or [`ToolError::NothingFound`] when nvm ran but listed nothing. Errors
    /// nvm itself reported are returned without asking the index.
    pub async fn list_available(&self) -> Result<Vec<String>, ToolError> {
        let versions = match self.client.list_available().run(self.runner.as_ref()).await {
            Ok(output) => parse_available(&output.stdout),
            Err(local @ ChainError::Exhausted { .. }) => {
                warn!(
                    "nvm could not list available versions ({local}), trying {}",
                    self.index.source()
                );
                let remote = self.index.fetch_available_versions().await;
                if remote.is_empty() {
                    return Err(local.into());
                }
                remote
            }
            Err(error) => return Err(error.into()),
        };

        if versions.is_empty() {
            return Err(ToolError::NothingFound {
                what: "available Node.js versions",
            });
        }

        Ok(flatten_groups(&group_by_major(&versions, GROUP_CAP)))
    }

    /// The version nvm currently activates, falling back to whatever `node`
    /// is on PATH.
    ///
    /// # Errors
    /// Returns the nvm failure when neither nvm nor node could be run.
    pub async fn current_version(&self) -> Result<Option<String>, ToolError> {
        match self.client.current().run(self.runner.as_ref()).await {
            Ok(output) => Ok(parse_current(&output.stdout)),
            Err(error @ ChainError::Exhausted { .. }) => Ok(self
                .installed_from_node(error)
                .await?
                .into_iter()
                .next()
                .map(|record| record.value)),
            Err(error) => Err(error.into()),
        }
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed version, otherwise
    /// whatever nvm reported.
    pub async fn install(&self, version: &str) -> Result<ToolOutput, ToolError> {
        let version = validate_version(version)?;
        info!("Installing Node.js {version}");
        let output = self.client.install(version).run(self.runner.as_ref()).await?;
        Ok(output.into())
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed version, otherwise
    /// whatever nvm reported.
    pub async fn switch(&self, version: &str) -> Result<ToolOutput, ToolError> {
        let version = validate_version(version)?;
        info!("Switching to Node.js {version}");
        let output = self
            .client
            .use_version(version)
            .run(self.runner.as_ref())
            .await?;
        Ok(output.into())
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed version, otherwise
    /// whatever nvm reported.
    pub async fn uninstall(&self, version: &str) -> Result<ToolOutput, ToolError> {
        let version = validate_version(version)?;
        info!("Uninstalling Node.js {version}");
        let output = self
            .client
            .uninstall(version)
            .run(self.runner.as_ref())
            .await?;
        Ok(output.into())
    }
}

const VERSION_KEYWORDS: &[&str] = &["lts", "latest", "node"];

/// Accept `lts`, `latest`, `node`, or `18`, `18.17`, `v18.17.0`.
fn validate_version(raw: &str) -> Result<&str, ToolError> {
    let version = raw.trim();

    if VERSION_KEYWORDS.contains(&version) {
        return Ok(version);
    }

    let bare = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = bare.split('.').collect();
    let numeric = parts.len() <= 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));

    if numeric {
        Ok(version)
    } else {
        Err(ToolError::invalid_input(
            "version",
            format!("expected lts, latest, node or a version like 18.17.0, got {raw:?}"),
        ))
    }
}
