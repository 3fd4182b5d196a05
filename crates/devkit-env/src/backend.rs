use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};

use devkit_backend::{EnvScope, EnvVariableRecord, ToolError, ToolOutput};
use devkit_exec::{
    AcceptPolicy, ChainError, CommandRunner, CommandSpec, DEFAULT_TIMEOUT, StderrPolicy,
    StrategyChain,
};
use devkit_platform::{Platform, powershell_quote};

use crate::parser::{parse_printenv, parse_windows_scope};

/// Attached to Unix set/delete results: the change only reaches processes
/// devkit itself starts.
pub const SESSION_ONLY_WARNING: &str =
    "Applied to this devkit session only; add it to your shell profile to make it permanent";

/// Session overlay: `Some` sets a variable, `None` removes it.
type Overlay = BTreeMap<String, Option<String>>;

/// Environment variables: the registry-backed User/Machine stores on
/// Windows, the process environment plus a session overlay elsewhere.
#[derive(Clone)]
pub struct EnvBackend {
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
    overlay: Arc<Mutex<Overlay>>,
    timeout: Duration,
    stderr: StderrPolicy,
}

impl EnvBackend {
    pub fn new(platform: Platform, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            platform,
            runner,
            overlay: Arc::new(Mutex::new(Overlay::new())),
            timeout: DEFAULT_TIMEOUT,
            stderr: StderrPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr = policy;
        self
    }

    /// User variables first, then system variables.
    ///
    /// # Errors
    /// Returns [`ToolError::NothingFound`] for an empty environment, or the
    /// tool failure when nothing could be read at all.
    pub async fn list_variables(&self) -> Result<Vec<EnvVariableRecord>, ToolError> {
        let records = if self.platform.is_windows() {
            self.list_windows().await?
        } else {
            let output = self.printenv_chain().run(self.runner.as_ref()).await?;
            parse_printenv(&output.stdout)
        };

        debug!("Read {} environment variables", records.len());
        if records.is_empty() {
            return Err(ToolError::NothingFound {
                what: "environment variables",
            });
        }
        Ok(records)
    }

    async fn list_windows(&self) -> Result<Vec<EnvVariableRecord>, ToolError> {
        let user_chain = self.read_scope_chain(EnvScope::User);
        let system_chain = self.read_scope_chain(EnvScope::System);

        let (user, system) = tokio::join!(
            user_chain.run(self.runner.as_ref()),
            system_chain.run(self.runner.as_ref()),
        );

        let mut records = Vec::new();
        let mut first_error: Option<ChainError> = None;

        for (scope, result) in [(EnvScope::User, user), (EnvScope::System, system)] {
            match result {
                Ok(output) => records.extend(parse_windows_scope(&output.stdout, scope)),
                Err(error) => {
                    warn!("Could not read {scope} environment variables: {error}");
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) if records.is_empty() => Err(error.into()),
            _ => Ok(records),
        }
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed name or value, or
    /// for the system scope outside Windows, and
    /// [`ToolError::PermissionDenied`] when Windows refuses the write.
    pub async fn set_variable(
        &self,
        name: &str,
        value: &str,
        scope: EnvScope,
    ) -> Result<ToolOutput, ToolError> {
        let name = validate_name(name)?;
        self.check_scope(scope)?;
        if value.contains('\0') {
            return Err(ToolError::invalid_input("value", "must not contain NUL"));
        }

        info!("Setting {scope} environment variable {name}");
        if self.platform.is_windows() {
            let script = format!(
                "[Environment]::SetEnvironmentVariable({}, {}, '{}')",
                powershell_quote(name),
                powershell_quote(value),
                scope.windows_target(),
            );
            self.write_windows(&script).await
        } else {
            self.update_overlay(name, Some(value.to_string()));
            Ok(session_only())
        }
    }

    /// # Errors
    /// Returns [`ToolError::InvalidInput`] for a malformed name or for the
    /// system scope outside Windows, and [`ToolError::PermissionDenied`] when
    /// Windows refuses the write.
    pub async fn delete_variable(
        &self,
        name: &str,
        scope: EnvScope,
    ) -> Result<ToolOutput, ToolError> {
        let name = validate_name(name)?;
        self.check_scope(scope)?;

        info!("Deleting {scope} environment variable {name}");
        if self.platform.is_windows() {
            let script = format!(
                "[Environment]::SetEnvironmentVariable({}, $null, '{}')",
                powershell_quote(name),
                scope.windows_target(),
            );
            self.write_windows(&script).await
        } else {
            self.update_overlay(name, None);
            Ok(session_only())
        }
    }

    /// Outside Windows there is no system-wide store devkit can write, only
    /// the session overlay.
    fn check_scope(&self, scope: EnvScope) -> Result<(), ToolError> {
        if scope == EnvScope::System && !self.platform.is_windows() {
            return Err(ToolError::invalid_input(
                "scope",
                "system variables can only be changed on Windows; use the user scope",
            ));
        }
        Ok(())
    }

    async fn write_windows(&self, script: &str) -> Result<ToolOutput, ToolError> {
        let output = self
            .powershell_chain(script)
            .accept(AcceptPolicy::AllowEmpty)
            .run(self.runner.as_ref())
            .await?;
        Ok(output.into())
    }

    fn update_overlay(&self, name: &str, value: Option<String>) {
        self.overlay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    fn overlay_snapshot(&self) -> Overlay {
        self.overlay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn printenv_chain(&self) -> StrategyChain {
        let overlay = self.overlay_snapshot();
        let spec = |program: &str| {
            CommandSpec::new(program)
                .envs(overlay.clone())
                .timeout(self.timeout)
        };

        StrategyChain::new("printenv", spec("printenv"))
            .then(spec("printenv").through_shell())
            .then(spec("env"))
            .stderr_policy(self.stderr)
    }

    fn read_scope_chain(&self, scope: EnvScope) -> StrategyChain {
        let script = format!(
            "[Environment]::GetEnvironmentVariables('{}') | ConvertTo-Json -Compress",
            scope.windows_target()
        );
        self.powershell_chain(&script)
    }

    /// Windows PowerShell first, then PowerShell 7.
    fn powershell_chain(&self, script: &str) -> StrategyChain {
        let command = format!("[Console]::OutputEncoding=[System.Text.Encoding]::UTF8; {script}");
        let spec = |program: &str| {
            CommandSpec::new(program)
                .args(["-NoProfile", "-NonInteractive", "-Command", command.as_str()])
                .timeout(self.timeout)
        };

        StrategyChain::new("powershell", spec("powershell"))
            .then(spec("pwsh"))
            .with_hint("confirm Windows PowerShell or pwsh is available")
            .stderr_policy(self.stderr)
    }
}

fn session_only() -> ToolOutput {
    ToolOutput {
        warning: Some(SESSION_ONLY_WARNING.to_string()),
        ..ToolOutput::default()
    }
}

fn validate_name(raw: &str) -> Result<&str, ToolError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ToolError::invalid_input("name", "must not be empty"));
    }
    if name.contains('=') || name.contains('\0') {
        return Err(ToolError::invalid_input(
            "name",
            format!("{raw:?} must not contain '=' or NUL"),
        ));
    }
    Ok(name)
}
