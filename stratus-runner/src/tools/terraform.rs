//! Terraform wrapper

use std::path::PathBuf;
use stratus_core::domain::infra::InfraOutputs;
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::error::{DeployError, Result};
use crate::process::CommandSpec;

/// Terraform invocations against the configured directory
pub struct Terraform<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> Terraform<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self { ctx }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("terraform")
            .args(args)
            .current_dir(self.ctx.config().terraform_path())
    }

    pub async fn init(&self) -> Result<()> {
        info!("Initializing terraform");
        self.ctx
            .output(&self.command(["init", "-input=false"]).streaming())
            .await?;
        Ok(())
    }

    /// Writes a plan for the desired state to `plan_file`
    pub async fn plan(&self, plan_file: &str) -> Result<()> {
        info!("Planning infrastructure changes");
        self.ctx
            .output(
                &self
                    .command(["plan", "-input=false"])
                    .arg(format!("-out={}", plan_file))
                    .streaming(),
            )
            .await?;
        Ok(())
    }

    /// Writes a destroy plan to `plan_file` and returns the rendered diff
    pub async fn plan_destroy(&self, plan_file: &str) -> Result<String> {
        info!("Planning infrastructure destruction");
        self.ctx
            .exec(
                &self
                    .command(["plan", "-destroy", "-input=false", "-no-color"])
                    .arg(format!("-out={}", plan_file)),
            )
            .await
    }

    /// Applies a previously written plan file
    pub async fn apply_plan(&self, plan_file: &str) -> Result<()> {
        info!("Applying {}", plan_file);
        self.ctx
            .output(
                &self
                    .command(["apply", "-input=false"])
                    .arg(plan_file)
                    .streaming(),
            )
            .await?;
        Ok(())
    }

    /// Reads the current outputs from Terraform state
    pub async fn outputs(&self) -> Result<InfraOutputs> {
        let stdout = self.ctx.exec(&self.command(["output", "-json"])).await?;
        InfraOutputs::from_json(&stdout).map_err(|e| DeployError::parse("terraform outputs", e))
    }

    /// Deletes a plan file; plans are single-use
    pub async fn remove_plan(&self, plan_file: &str) -> Result<()> {
        let path: PathBuf = self.ctx.config().terraform_path().join(plan_file);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed plan file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
