use log::{debug, warn};

use crate::error::{ChainError, ExecutionFailure, FailureKind, looks_like_permission_denied};
use crate::runner::{CommandRunner, ExecutionResult};
use crate::spec::CommandSpec;

/// Whether an attempt has to print something on stdout to count as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptPolicy {
    /// Listings: blank stdout moves on to the next strategy.
    #[default]
    RequireOutput,
    /// Mutations: a clean exit is enough.
    AllowEmpty,
}

/// What to do with stderr text from an attempt that exited with status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrPolicy {
    /// Report the stderr text as the tool's error and stop.
    #[default]
    Surface,
    /// Treat stderr as informational.
    Ignore,
}

/// Ordered, non-empty list of invocations for one logical operation.
///
/// Strategies run strictly one after another: the next one starts only once
/// the previous one has failed with [`FailureKind::NotFound`],
/// [`FailureKind::NonZeroExit`] or [`FailureKind::Timeout`], or produced no
/// output under [`AcceptPolicy::RequireOutput`].
#[derive(Debug, Clone)]
pub struct StrategyChain {
    tool: &'static str,
    strategies: Vec<CommandSpec>,
    hint: String,
    accept: AcceptPolicy,
    stderr: StderrPolicy,
}

impl StrategyChain {
    #[must_use]
    pub fn new(tool: &'static str, first: CommandSpec) -> Self {
        Self {
            tool,
            strategies: vec![first],
            hint: format!("confirm {tool} is installed and on PATH"),
            accept: AcceptPolicy::default(),
            stderr: StderrPolicy::default(),
        }
    }

    /// Build a chain from a list computed at runtime. Returns `None` for an
    /// empty list.
    #[must_use]
    pub fn from_specs(tool: &'static str, specs: Vec<CommandSpec>) -> Option<Self> {
        let mut specs = specs.into_iter();
        let first = specs.next()?;
        Some(specs.fold(Self::new(tool, first), Self::then))
    }

    /// Append a fallback strategy.
    #[must_use]
    pub fn then(mut self, spec: CommandSpec) -> Self {
        self.strategies.push(spec);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    #[must_use]
    pub fn accept(mut self, policy: AcceptPolicy) -> Self {
        self.accept = policy;
        self
    }

    #[must_use]
    pub fn stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr = policy;
        self
    }

    #[must_use]
    pub fn tool(&self) -> &'static str {
        self.tool
    }

    #[must_use]
    pub fn strategies(&self) -> &[CommandSpec] {
        &self.strategies
    }

    /// Run the strategies in order until one produces a usable result.
    ///
    /// # Errors
    /// Returns [`ChainError::ToolReported`] when an attempt exits cleanly but
    /// writes to stderr (under [`StderrPolicy::Surface`]),
    /// [`ChainError::PermissionDenied`] when the OS or the tool refuses the
    /// operation, and [`ChainError::Exhausted`] when every strategy failed.
    pub async fn run(&self, runner: &dyn CommandRunner) -> Result<ExecutionResult, ChainError> {
        let total = self.strategies.len();
        let mut last_failure: Option<ExecutionFailure> = None;
        let mut blank: Option<ExecutionResult> = None;
        // Whether any attempt got as far as running the tool.
        let mut reached = false;

        for (index, spec) in self.strategies.iter().enumerate() {
            debug!("{}: strategy {}/{total}: {spec}", self.tool, index + 1);

            match runner.execute(spec).await {
                Ok(result) => {
                    if result.has_stderr() && self.stderr == StderrPolicy::Surface {
                        let stderr = result.stderr.trim().to_string();
                        warn!("{}: `{spec}` wrote to stderr: {stderr}", self.tool);
                        if looks_like_permission_denied(&stderr) {
                            return Err(ChainError::PermissionDenied {
                                tool: self.tool,
                                message: stderr,
                            });
                        }
                        return Err(ChainError::ToolReported {
                            tool: self.tool,
                            stderr,
                        });
                    }

                    if !result.has_output() && self.accept == AcceptPolicy::RequireOutput {
                        debug!("{}: `{spec}` printed nothing, trying next", self.tool);
                        reached = true;
                        blank.get_or_insert(result);
                        continue;
                    }

                    return Ok(result);
                }
                Err(failure) if failure.kind == FailureKind::PermissionDenied => {
                    warn!("{}: `{spec}` was denied: {failure}", self.tool);
                    return Err(ChainError::PermissionDenied {
                        tool: self.tool,
                        message: failure.message,
                    });
                }
                Err(failure) => {
                    debug!("{}: `{spec}` failed ({}): {failure}", self.tool, failure.kind);
                    let failure = if spec.is_launcher() && !reached {
                        launcher_missed(spec, failure)
                    } else {
                        failure
                    };
                    reached |= failure.kind != FailureKind::NotFound;
                    last_failure = Some(failure);
                }
            }
        }

        if let Some(result) = blank {
            return Ok(result);
        }

        let last = last_failure.unwrap_or_else(|| {
            ExecutionFailure::new(FailureKind::NotFound, format!("{} produced no result", self.tool))
        });
        warn!("{}: all {total} strategies failed, last: {last}", self.tool);

        Err(ChainError::Exhausted {
            tool: self.tool,
            attempts: total,
            hint: self.hint.clone(),
            last,
        })
    }
}

/// A launcher that exits non-zero after the tool was missing everywhere
/// else could not provide the tool either.
fn launcher_missed(spec: &CommandSpec, failure: ExecutionFailure) -> ExecutionFailure {
    if failure.kind != FailureKind::NonZeroExit {
        return failure;
    }
    let missed = ExecutionFailure::new(
        FailureKind::NotFound,
        format!("`{spec}` could not provide the tool: {}", failure.message),
    );
    match failure.raw {
        Some(raw) => missed.with_raw(raw),
        None => missed,
    }
}
