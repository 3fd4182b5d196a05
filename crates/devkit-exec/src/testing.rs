//! Deterministic [`CommandRunner`] for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ExecutionFailure, FailureKind};
use crate::runner::{CommandRunner, ExecutionResult};
use crate::spec::CommandSpec;

type Reply = Result<ExecutionResult, ExecutionFailure>;
type Handler = Box<dyn Fn(&CommandSpec) -> Reply + Send + Sync>;

/// Replays queued replies in order and records every spec it was asked to
/// run. Once the queue is drained it defers to the handler, if any, or
/// reports [`FailureKind::NotFound`].
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<Reply>>,
    handler: Option<Handler>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `handler` once the queue is empty.
    #[must_use]
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&CommandSpec) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn succeed(self, stdout: &str) -> Self {
        self.respond(stdout, "")
    }

    #[must_use]
    pub fn respond(self, stdout: &str, stderr: &str) -> Self {
        self.push(Ok(ExecutionResult::new(stdout, stderr)))
    }

    #[must_use]
    pub fn fail(self, kind: FailureKind) -> Self {
        self.fail_with(kind, format!("scripted {kind}"))
    }

    #[must_use]
    pub fn fail_with(self, kind: FailureKind, message: impl Into<String>) -> Self {
        self.push(Err(ExecutionFailure::new(kind, message)))
    }

    fn push(self, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Every spec executed so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn execute(&self, spec: &CommandSpec) -> Reply {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(spec.clone());

        let queued = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();

        match (queued, &self.handler) {
            (Some(reply), _) => reply,
            (None, Some(handler)) => handler(spec),
            (None, None) => Err(ExecutionFailure::new(
                FailureKind::NotFound,
                format!("`{}` was not found", spec.program()),
            )),
        }
    }
}
