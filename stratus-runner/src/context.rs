//! Execution context for a deployment run
//!
//! Carries everything a stage needs that is decided once per invocation:
//! - The deployment configuration
//! - The command runner every external call goes through
//! - Whether the container engine needs elevated privilege
//! - The run id used to correlate log lines

use std::sync::Arc;
use stratus_core::domain::run::RunId;
use tracing::{debug, error};

use crate::config::DeployConfig;
use crate::error::{DeployError, Result};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

/// Program used to elevate container engine calls
const ELEVATE_PROGRAM: &str = "sudo";

/// How container engine commands are invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnginePrivilege {
    /// The current user can reach the daemon
    #[default]
    Direct,
    /// Every engine call runs through `sudo`
    Elevated,
}

/// Execution context shared by every stage of a run
pub struct ExecutionContext {
    config: DeployConfig,
    runner: Arc<dyn CommandRunner>,
    privilege: EnginePrivilege,
    run_id: RunId,
}

impl ExecutionContext {
    /// Creates a new execution context with direct engine access
    pub fn new(config: DeployConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            privilege: EnginePrivilege::Direct,
            run_id: RunId::new(),
        }
    }

    pub fn with_privilege(mut self, privilege: EnginePrivilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn set_privilege(&mut self, privilege: EnginePrivilege) {
        self.privilege = privilege;
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn privilege(&self) -> EnginePrivilege {
        self.privilege
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Builds a container engine command honouring the privilege mode
    pub fn engine<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new("docker").args(args);
        match self.privilege {
            EnginePrivilege::Direct => spec,
            EnginePrivilege::Elevated => spec.prefixed(ELEVATE_PROGRAM),
        }
    }

    /// Runs a command and returns its output whatever the exit code
    pub async fn probe(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.runner.run(spec).await
    }

    /// Runs a command, treating a non-zero exit as failure
    pub async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.runner.run(spec).await?;

        if !output.success() {
            let command = spec.display();
            error!(
                "Command failed: {} (exit code {}): {}",
                command,
                output.exit_code,
                output.stderr.trim()
            );
            return Err(DeployError::CommandFailed {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        debug!("Command succeeded: {}", spec);
        Ok(output)
    }

    /// Runs a command, treating a non-zero exit as failure, and returns stdout
    pub async fn exec(&self, spec: &CommandSpec) -> Result<String> {
        Ok(self.output(spec).await?.stdout)
    }
}
