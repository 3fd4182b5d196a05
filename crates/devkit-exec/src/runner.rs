use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use tokio::process::Command;

use devkit_platform::{HideWindow, Platform};

use crate::error::ExecutionFailure;
use crate::spec::CommandSpec;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured output of an attempt that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty()
    }

    #[must_use]
    pub fn has_stderr(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one spec to completion. Implementations never retry.
    async fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecutionFailure>;
}

/// Runs specs as real child processes on the host.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    platform: Platform,
    default_timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SystemRunner {
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            platform: Platform::current(),
            default_timeout,
        }
    }

    fn build_command(&self, spec: &CommandSpec) -> Command {
        let mut cmd = if spec.uses_shell() {
            let (program, args) = self.platform.shell_wrap(spec.program(), spec.arguments());
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        } else {
            let mut cmd = Command::new(spec.program());
            cmd.args(spec.arguments());
            cmd
        };

        if let Some(dir) = spec.working_directory() {
            cmd.current_dir(dir);
        }

        for (key, value) in spec.env_overrides() {
            match value {
                Some(value) => cmd.env(key, value),
                None => cmd.env_remove(key),
            };
        }

        cmd.stdin(Stdio::null())
            .kill_on_drop(true)
            .hide_window_if(spec.is_hidden());
        cmd
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecutionFailure> {
        let timeout = spec.timeout_override().unwrap_or(self.default_timeout);
        debug!("Executing `{spec}` (timeout {}s)", timeout.as_secs());

        let output = match tokio::time::timeout(timeout, self.build_command(spec).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                debug!("`{spec}` could not be started: {error}");
                return Err(ExecutionFailure::from_spawn(spec, &error));
            }
            Err(_) => {
                debug!("`{spec}` timed out, child killed");
                return Err(ExecutionFailure::timeout(spec, timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        debug!("`{spec}` exit status: {:?}", output.status);
        trace!("stdout: {stdout}");
        if !stderr.is_empty() {
            trace!("stderr: {stderr}");
        }

        if output.status.success() {
            Ok(ExecutionResult { stdout, stderr })
        } else {
            Err(ExecutionFailure::from_exit(spec, output.status.code(), &stderr))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("echo").arg("hello");

        let result = runner.execute(&spec).await.expect("echo should succeed");

        assert_eq!(result.stdout.trim(), "hello");
        assert!(!result.has_stderr());
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("devkit-definitely-not-installed");

        let failure = runner.execute(&spec).await.expect_err("spawn should fail");

        assert_eq!(failure.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn missing_binary_through_shell_is_not_found() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("devkit-definitely-not-installed").through_shell();

        let failure = runner.execute(&spec).await.expect_err("shell should fail");

        assert_eq!(failure.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn script_calling_a_missing_command_is_not_found() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("sh")
            .args(["-c", "devkit-definitely-not-installed \"$@\"", "sh", "ls"])
            .interpreted();

        let failure = runner.execute(&spec).await.expect_err("script should fail");

        assert_eq!(failure.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("sh").args(["-c", "echo broken >&2; exit 3"]);

        let failure = runner.execute(&spec).await.expect_err("exit 3 should fail");

        assert_eq!(failure.kind, FailureKind::NonZeroExit);
        assert!(failure.message.contains("code 3"));
        assert!(failure.message.contains("broken"));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let runner = SystemRunner::new(Duration::from_millis(100));
        let spec = CommandSpec::new("sleep").arg("5");

        let failure = runner.execute(&spec).await.expect_err("sleep should time out");

        assert_eq!(failure.kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn env_overrides_reach_the_child() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf %s \"$DEVKIT_PROBE\""])
            .env("DEVKIT_PROBE", "bar");

        let result = runner.execute(&spec).await.expect("sh should succeed");

        assert_eq!(result.stdout, "bar");
    }

    #[tokio::test]
    async fn shell_wrapped_arguments_are_not_resplit() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("printf")
            .args(["%s|", "a b", "c"])
            .through_shell();

        let result = runner.execute(&spec).await.expect("printf should succeed");

        assert_eq!(result.stdout, "a b|c|");
    }

    #[tokio::test]
    async fn working_directory_is_applied() {
        let runner = SystemRunner::default();
        let spec = CommandSpec::new("pwd").current_dir("/");

        let result = runner.execute(&spec).await.expect("pwd should succeed");

        assert_eq!(result.stdout.trim(), "/");
    }
}
