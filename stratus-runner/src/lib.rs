//! Stratus Runner
//!
//! The deployment engine behind the `stratus` CLI.
//!
//! This crate contains:
//! - Process seam: `CommandSpec` and the `CommandRunner` trait every external
//!   tool call goes through
//! - Preflight checks for tools, cloud credentials and the container daemon
//! - Thin wrappers over terraform, docker, git and the aws CLI
//! - The pipeline stages and the sequential, fail-fast pipeline executor
//! - The two-phase teardown state machine

pub mod config;
pub mod context;
pub mod error;
pub mod inventory;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod stages;
pub mod teardown;
pub mod tools;

#[cfg(test)]
mod testing;

pub use config::DeployConfig;
pub use context::{EnginePrivilege, ExecutionContext};
pub use error::{DeployError, Result};
pub use pipeline::{Pipeline, SilentObserver, StageObserver};
pub use preflight::{PreflightReport, Requirements, run_preflight};
pub use process::{CommandRunner, SystemCommandRunner};
pub use stages::{DeployStages, StageExecutor};
pub use teardown::{Blocker, ConfirmationToken, DestroyPlan, Teardown, TeardownReport};
