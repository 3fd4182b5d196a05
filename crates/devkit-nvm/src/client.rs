use std::path::{Path, PathBuf};
use std::time::Duration;

use devkit_exec::{AcceptPolicy, CommandSpec, DEFAULT_TIMEOUT, StderrPolicy, StrategyChain};
use devkit_platform::{posix_quote, powershell_quote};

/// Where nvm lives and how it has to be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NvmEnvironment {
    /// nvm-sh: a shell function defined by sourcing `$NVM_DIR/nvm.sh`.
    Unix { nvm_dir: PathBuf },
    /// nvm-windows: a regular executable.
    Windows { nvm_exe: PathBuf },
}

impl NvmEnvironment {
    /// Resolve the environment for the host: `NVM_HOME\nvm.exe` or `nvm` on
    /// PATH on Windows, `$NVM_DIR` or `~/.nvm` elsewhere.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(windows) {
            let nvm_exe = std::env::var_os("NVM_HOME")
                .map(|home| PathBuf::from(home).join("nvm.exe"))
                .filter(|exe| exe.is_file())
                .or_else(|| which::which("nvm").ok())
                .unwrap_or_else(|| PathBuf::from("nvm"));
            NvmEnvironment::Windows { nvm_exe }
        } else {
            let nvm_dir = std::env::var_os("NVM_DIR")
                .map(PathBuf::from)
                .or_else(|| dirs::home_dir().map(|home| home.join(".nvm")))
                .unwrap_or_else(|| PathBuf::from(".nvm"));
            NvmEnvironment::Unix { nvm_dir }
        }
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        matches!(self, NvmEnvironment::Windows { .. })
    }
}

/// Builds the strategy chains for every nvm operation.
#[derive(Debug, Clone)]
pub struct NvmClient {
    pub environment: NvmEnvironment,
    timeout: Duration,
    install_timeout: Duration,
    stderr: StderrPolicy,
}

impl NvmClient {
    #[must_use]
    pub fn new(environment: NvmEnvironment) -> Self {
        Self {
            environment,
            timeout: DEFAULT_TIMEOUT,
            install_timeout: Duration::from_secs(600),
            stderr: StderrPolicy::default(),
        }
    }

    #[must_use]
    pub fn unix(nvm_dir: impl Into<PathBuf>) -> Self {
        Self::new(NvmEnvironment::Unix {
            nvm_dir: nvm_dir.into(),
        })
    }

    #[must_use]
    pub fn windows(nvm_exe: impl Into<PathBuf>) -> Self {
        Self::new(NvmEnvironment::Windows {
            nvm_exe: nvm_exe.into(),
        })
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeout: Duration, install_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.install_timeout = install_timeout;
        self
    }

    #[must_use]
    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr = policy;
        self
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.environment.is_windows()
    }

    #[must_use]
    pub fn list_installed(&self) -> StrategyChain {
        if self.is_windows() {
            self.chain(&["list"], self.timeout)
        } else {
            self.chain(&["ls", "--no-colors"], self.timeout)
        }
    }

    #[must_use]
    pub fn list_available(&self) -> StrategyChain {
        if self.is_windows() {
            self.chain(&["list", "available"], self.timeout)
        } else {
            self.chain(&["ls-remote", "--no-colors"], self.timeout)
        }
    }

    #[must_use]
    pub fn current(&self) -> StrategyChain {
        self.chain(&["current"], self.timeout)
    }

    #[must_use]
    pub fn install(&self, version: &str) -> StrategyChain {
        self.chain(&["install", version], self.install_timeout)
            .accept(AcceptPolicy::AllowEmpty)
    }

    #[must_use]
    pub fn use_version(&self, version: &str) -> StrategyChain {
        self.chain(&["use", version], self.timeout)
            .accept(AcceptPolicy::AllowEmpty)
    }

    #[must_use]
    pub fn uninstall(&self, version: &str) -> StrategyChain {
        self.chain(&["uninstall", version], self.timeout)
            .accept(AcceptPolicy::AllowEmpty)
    }

    /// `node --version`, used when nvm itself cannot list anything.
    #[must_use]
    pub fn node_version(&self) -> StrategyChain {
        let direct = CommandSpec::new("node")
            .arg("--version")
            .timeout(self.timeout);
        StrategyChain::new("node", direct.clone())
            .then(direct.through_shell())
            .with_hint("confirm Node.js is installed and on PATH")
            .stderr_policy(self.stderr)
    }

    fn chain(&self, args: &[&str], timeout: Duration) -> StrategyChain {
        let direct = match &self.environment {
            NvmEnvironment::Windows { nvm_exe } => CommandSpec::new(nvm_exe.display().to_string()),
            NvmEnvironment::Unix { .. } => CommandSpec::new("nvm"),
        }
        .args(args.iter().copied())
        .timeout(timeout);

        let wrapped = CommandSpec::new("nvm")
            .args(args.iter().copied())
            .through_shell()
            .timeout(timeout);

        let interpreter = match &self.environment {
            NvmEnvironment::Windows { .. } => powershell_spec(args),
            NvmEnvironment::Unix { nvm_dir } => sourced_nvm_spec(nvm_dir, args),
        }
        .timeout(timeout);

        StrategyChain::new("nvm", direct)
            .then(wrapped)
            .then(interpreter)
            .stderr_policy(self.stderr)
    }
}

fn powershell_spec(args: &[&str]) -> CommandSpec {
    let command = std::iter::once("nvm".to_string())
        .chain(args.iter().map(|arg| powershell_quote(arg)))
        .collect::<Vec<_>>()
        .join(" ");

    CommandSpec::new("powershell")
        .args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            command.as_str(),
        ])
        .interpreted()
}

/// nvm-sh is a shell function, so it only exists after `nvm.sh` is sourced.
fn sourced_nvm_spec(nvm_dir: &Path, args: &[&str]) -> CommandSpec {
    let script = format!(
        "export NVM_DIR={}; [ -s \"$NVM_DIR/nvm.sh\" ] && \\. \"$NVM_DIR/nvm.sh\"; nvm \"$@\"",
        posix_quote(&nvm_dir.display().to_string()),
    );

    CommandSpec::new("bash")
        .args(["-c", script.as_str(), "bash"])
        .args(args.iter().copied())
        .env("TERM", "dumb")
        .env("NO_COLOR", "1")
        .interpreted()
}
