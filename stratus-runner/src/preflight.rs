//! Preflight checks
//!
//! Verifies, before any stage runs, that the tools a run needs are
//! installed, that the AWS CLI holds valid credentials and that the
//! container daemon is reachable. Decides the engine privilege mode for
//! the rest of the run.

use stratus_core::domain::stage::Stage;
use tracing::{info, warn};

use crate::context::{EnginePrivilege, ExecutionContext};
use crate::error::{DeployError, Result};
use crate::process::CommandSpec;

/// Name of the credential check, as reported on failure
pub const CREDENTIALS_CHECK: &str = "AWS credentials (aws sts get-caller-identity)";

/// An external tool a run may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tool {
    Aws,
    Terraform,
    Docker,
}

impl Tool {
    pub fn program(&self) -> &'static str {
        match self {
            Tool::Aws => "aws",
            Tool::Terraform => "terraform",
            Tool::Docker => "docker",
        }
    }

    fn version_command(&self) -> CommandSpec {
        match self {
            Tool::Terraform => CommandSpec::new("terraform").arg("version"),
            other => CommandSpec::new(other.program()).arg("--version"),
        }
    }
}

/// What a run needs before it may start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    pub tools: Vec<Tool>,
    /// Whether the AWS CLI must hold valid credentials
    pub credentials: bool,
}

impl Requirements {
    /// Union of what each stage needs
    pub fn for_stages(stages: &[Stage]) -> Self {
        let mut req = Self::default();
        for stage in stages {
            let (tools, credentials): (&[Tool], bool) = match stage {
                Stage::Provision | Stage::Rollout | Stage::Secrets | Stage::AssetSync => {
                    (&[Tool::Aws, Tool::Terraform], true)
                }
                Stage::Publish => (&[Tool::Aws, Tool::Terraform, Tool::Docker], true),
                Stage::Status => (&[Tool::Aws, Tool::Terraform], true),
                Stage::Verify => (&[Tool::Terraform], false),
            };
            req.require(tools);
            req.credentials |= credentials;
        }
        req
    }

    /// What teardown needs
    pub fn teardown() -> Self {
        let mut req = Self {
            credentials: true,
            ..Self::default()
        };
        req.require(&[Tool::Aws, Tool::Terraform]);
        req
    }

    fn require(&mut self, tools: &[Tool]) {
        for tool in tools {
            if !self.tools.contains(tool) {
                self.tools.push(*tool);
            }
        }
        self.tools.sort();
    }

    pub fn needs(&self, tool: Tool) -> bool {
        self.tools.contains(&tool)
    }
}

/// Result of a successful preflight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub privilege: EnginePrivilege,
    /// AWS account the credentials belong to
    pub account: Option<String>,
}

/// Runs every check `req` names, in order: tools, credentials, daemon
pub async fn run_preflight(ctx: &ExecutionContext, req: &Requirements) -> Result<PreflightReport> {
    for tool in &req.tools {
        check_tool(ctx, *tool).await?;
    }

    let account = if req.credentials {
        Some(check_credentials(ctx).await?)
    } else {
        None
    };

    let privilege = if req.needs(Tool::Docker) {
        check_daemon(ctx).await?
    } else {
        EnginePrivilege::Direct
    };

    Ok(PreflightReport { privilege, account })
}

async fn check_tool(ctx: &ExecutionContext, tool: Tool) -> Result<()> {
    let check = format!("{} installed", tool.program());
    let output = ctx
        .probe(&tool.version_command())
        .await
        .map_err(|e| DeployError::precondition(&check, e.to_string()))?;

    if !output.success() {
        return Err(DeployError::precondition(
            check,
            format!(
                "`{}` exited with code {}",
                tool.version_command(),
                output.exit_code
            ),
        ));
    }

    let version = output.stdout.lines().next().unwrap_or_default().trim();
    info!("{} is available: {}", tool.program(), version);
    Ok(())
}

async fn check_credentials(ctx: &ExecutionContext) -> Result<String> {
    let spec = CommandSpec::new("aws").args(["sts", "get-caller-identity", "--output", "json"]);
    let output = ctx
        .probe(&spec)
        .await
        .map_err(|e| DeployError::precondition(CREDENTIALS_CHECK, e.to_string()))?;

    if !output.success() {
        let detail = match output.stderr.trim() {
            "" => "no valid credentials configured".to_string(),
            stderr => stderr.to_string(),
        };
        return Err(DeployError::precondition(CREDENTIALS_CHECK, detail));
    }

    let identity: serde_json::Value = serde_json::from_str(&output.stdout)
        .map_err(|e| DeployError::precondition(CREDENTIALS_CHECK, e.to_string()))?;
    let account = identity
        .get("Account")
        .and_then(|a| a.as_str())
        .unwrap_or_default()
        .to_string();

    info!("AWS credentials valid for account {}", account);
    Ok(account)
}

async fn check_daemon(ctx: &ExecutionContext) -> Result<EnginePrivilege> {
    let direct = CommandSpec::new("docker").arg("info");
    if let Ok(output) = ctx.probe(&direct).await {
        if output.success() {
            info!("Docker daemon reachable");
            return Ok(EnginePrivilege::Direct);
        }
    }

    warn!("Docker daemon not reachable as current user, retrying with sudo");
    let elevated = direct.prefixed("sudo");
    match ctx.probe(&elevated).await {
        Ok(output) if output.success() => {
            info!("Docker daemon reachable with sudo");
            Ok(EnginePrivilege::Elevated)
        }
        Ok(output) => Err(DeployError::precondition(
            "Docker daemon reachable (docker info)",
            output.stderr.trim().to_string(),
        )),
        Err(e) => Err(DeployError::precondition(
            "Docker daemon reachable (docker info)",
            e.to_string(),
        )),
    }
}
