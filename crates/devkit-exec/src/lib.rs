//! Process execution for devkit's tool integrations.
//!
//! A [`CommandSpec`] describes one concrete way of invoking an external tool.
//! A [`CommandRunner`] turns a spec into an [`ExecutionResult`] or a typed
//! [`ExecutionFailure`], and a [`StrategyChain`] tries an ordered list of
//! specs for one logical operation until one of them yields usable output.

mod chain;
mod error;
mod runner;
mod spec;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use chain::{AcceptPolicy, StderrPolicy, StrategyChain};
pub use error::{ChainError, ExecutionFailure, FailureKind};
pub use runner::{CommandRunner, DEFAULT_TIMEOUT, ExecutionResult, SystemRunner};
pub use spec::CommandSpec;
