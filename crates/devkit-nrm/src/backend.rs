use std::sync::Arc;

use log::{debug, info, warn};

use devkit_backend::{RegistryRecord, ToolError, ToolOutput};
use devkit_exec::{ChainError, CommandRunner};

use crate::client::NrmClient;
use crate::parser::{parse_current_registry, parse_registries};

/// Registries nrm ships with. Deleting them only breaks nrm's own listing.
pub const BUILTIN_REGISTRIES: &[&str] =
    &["npm", "yarn", "tencent", "cnpm", "taobao", "npmMirror"];

#[derive(Clone)]
pub struct NrmBackend {
    client: NrmClient,
    runner: Arc<dyn CommandRunner>,
}

impl NrmBackend {
    pub fn new(client: NrmClient, runner: Arc<dyn CommandRunner>) -> Self {
        Self { client, runner }
    }

    /// # Errors
    /// Returns [`ToolError::NothingFound`] when nrm printed no registry lines,
    /// or the nrm failure.
    pub async fn list_registries(&self) -> Result<Vec<RegistryRecord>, ToolError> {
        let output = self.client.list().run(self.runner.as_ref()).await?;
        let records = parse_registries(&output.stdout);
        debug!("nrm listed {} registries", records.len());

        if records.is_empty() {
            return Err(ToolError::NothingFound {
                what: "npm registries",
            });
        }
        Ok(records)
    }

    /// Registry name from nrm, or the registry URL from npm when nrm is
    /// unavailable.
    ///
    /// # Errors
    /// Returns the nrm failure when neither nrm nor npm could answer.
    pub async fn current_registry(&self) -> Result<String, ToolError> {
        let output = match self.client.current().run(self.runner.as_ref()).await {
            Ok(output) => output,
            Err(error @ ChainError::Exhausted { .. }) => {
                return self.registry_from_npm(error).await;
            }
            Err(error) => return Err(error.into()),
        };

        parse_current_registry(&output.stdout).ok_or(ToolError::NothingFound {
            what: "current npm registry",
        })
    }

    async fn registry_from_npm(&self, nrm_error: ChainError) -> Result<String, ToolError> {
        warn!("nrm unavailable ({nrm_error}), asking npm for its registry");

        match self.client.npm_registry().run(self.runner.as_ref()).await {
            Ok(output) => {
                parse_current_registry(&output.stdout).ok_or_else(|| nrm_error.into())
            }
            Err(npm_error) => {
                debug!("npm fallback failed: {npm_error}");
                Err(nrm_error.into())
            }
        }
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed name, otherwise
    /// whatever nrm reported.
    pub async fn use_registry(&self, name: &str) -> Result<ToolOutput, ToolError> {
        let name = validate_name(name)?;
        info!("Switching npm registry to {name}");
        let output = self
            .client
            .use_registry(name)
            .run(self.runner.as_ref())
            .await?;
        Ok(output.into())
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed name or a non-HTTP
    /// URL, otherwise whatever nrm reported.
    pub async fn add_registry(&self, name: &str, url: &str) -> Result<ToolOutput, ToolError> {
        let name = validate_name(name)?;
        let url = validate_url(url)?;
        info!("Adding npm registry {name} ({url})");
        let output = self.client.add(name, url).run(self.runner.as_ref()).await?;
        Ok(output.into())
    }

    /// Refuses nrm's built-in registries and the registry currently in use.
    ///
    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for refused names, otherwise
    /// whatever nrm reported.
    pub async fn delete_registry(&self, name: &str) -> Result<ToolOutput, ToolError> {
        let name = validate_name(name)?;

        if BUILTIN_REGISTRIES.contains(&name) {
            return Err(ToolError::invalid_input(
                "registry",
                format!("{name} is built into nrm and cannot be deleted"),
            ));
        }

        match self.current_registry().await {
            Ok(current) if current == name => {
                return Err(ToolError::invalid_input(
                    "registry",
                    format!("{name} is in use; switch to another registry first"),
                ));
            }
            Ok(_) => {}
            Err(error) => debug!("Could not determine current registry: {error}"),
        }

        info!("Deleting npm registry {name}");
        let output = self.client.delete(name).run(self.runner.as_ref()).await?;
        Ok(output.into())
    }

    /// Raw `nrm test` timing output.
    ///
    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed name, otherwise
    /// whatever nrm reported.
    pub async fn test_registry_speed(&self, name: &str) -> Result<ToolOutput, ToolError> {
        let name = validate_name(name)?;
        let output = self.client.test(name).run(self.runner.as_ref()).await?;
        Ok(output.into())
    }
}

/// Characters `cmd.exe` gives meaning to even outside quotes. Arguments
/// reach `cmd /C` verbatim on Windows, so they never get that far.
const CMD_METACHARACTERS: &[char] = &['&', '|', '<', '>', '^', '%', '"', '!', '`'];

fn validate_name(raw: &str) -> Result<&str, ToolError> {
    let name = raw.trim();
    let plain = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));

    if name.is_empty() || !plain {
        return Err(ToolError::invalid_input(
            "registry name",
            format!("expected letters, digits, '-', '_', '.' or '@', got {raw:?}"),
        ));
    }
    Ok(name)
}

fn validate_url(raw: &str) -> Result<&str, ToolError> {
    let url = raw.trim();
    let has_scheme = ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme));

    if !has_scheme {
        return Err(ToolError::invalid_input(
            "registry url",
            format!("expected an http(s) URL, got {raw:?}"),
        ));
    }
    if let Some(bad) = url
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || CMD_METACHARACTERS.contains(c))
    {
        return Err(ToolError::invalid_input(
            "registry url",
            format!("{bad:?} is not allowed in a registry URL"),
        ));
    }
    Ok(url)
}
