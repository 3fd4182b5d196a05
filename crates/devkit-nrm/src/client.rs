use std::time::Duration;

use devkit_exec::{AcceptPolicy, CommandSpec, DEFAULT_TIMEOUT, StderrPolicy, StrategyChain};
use devkit_platform::Platform;

const NRM_HINT: &str = "confirm nrm is installed (npm install -g nrm) and on PATH";

/// Builds the strategy chains for nrm and the `npm config` fallback.
#[derive(Debug, Clone)]
pub struct NrmClient {
    platform: Platform,
    timeout: Duration,
    stderr: StderrPolicy,
}

impl Default for NrmClient {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl NrmClient {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
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

    #[must_use]
    pub fn list(&self) -> StrategyChain {
        self.chain(&["ls"])
    }

    #[must_use]
    pub fn current(&self) -> StrategyChain {
        self.chain(&["current"])
    }

    #[must_use]
    pub fn use_registry(&self, name: &str) -> StrategyChain {
        self.chain(&["use", name]).accept(AcceptPolicy::AllowEmpty)
    }

    #[must_use]
    pub fn add(&self, name: &str, url: &str) -> StrategyChain {
        self.chain(&["add", name, url]).accept(AcceptPolicy::AllowEmpty)
    }

    #[must_use]
    pub fn delete(&self, name: &str) -> StrategyChain {
        self.chain(&["del", name]).accept(AcceptPolicy::AllowEmpty)
    }

    #[must_use]
    pub fn test(&self, name: &str) -> StrategyChain {
        self.chain(&["test", name])
    }

    /// `npm config get registry`. npm routinely prints config warnings on
    /// stderr, so they never fail this lookup.
    #[must_use]
    pub fn npm_registry(&self) -> StrategyChain {
        let direct = CommandSpec::new("npm")
            .args(["config", "get", "registry"])
            .timeout(self.timeout);

        StrategyChain::new("npm", direct.clone())
            .then(direct.through_shell())
            .with_hint("confirm Node.js and npm are installed and on PATH")
            .stderr_policy(StderrPolicy::Ignore)
    }

    fn chain(&self, args: &[&str]) -> StrategyChain {
        let direct = CommandSpec::new("nrm")
            .args(args.iter().copied())
            .timeout(self.timeout);
        let wrapped = direct.clone().through_shell();

        // npx is a `.cmd` shim on Windows and needs cmd to resolve it.
        let npx = CommandSpec::new("npx")
            .arg("nrm")
            .args(args.iter().copied())
            .timeout(self.timeout)
            .launcher();
        let npx = if self.platform.is_windows() {
            npx.through_shell()
        } else {
            npx
        };

        StrategyChain::new("nrm", direct)
            .then(wrapped)
            .then(npx)
            .with_hint(NRM_HINT)
            .stderr_policy(self.stderr)
    }
}
