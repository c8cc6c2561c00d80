//! Provision stage

use stratus_core::domain::stage::{Stage, StageReport};
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::tools::Terraform;

/// Plan file written and consumed by a single provision run
const PLAN_FILE: &str = "tfplan";

/// Brings the infrastructure to the state declared in the Terraform configuration
pub async fn provision(ctx: &ExecutionContext) -> Result<StageReport> {
    let terraform = Terraform::new(ctx);

    terraform.init().await?;
    terraform.plan(PLAN_FILE).await?;

    let applied = terraform.apply_plan(PLAN_FILE).await;
    terraform.remove_plan(PLAN_FILE).await?;
    applied?;

    info!("Infrastructure is up to date");
    Ok(StageReport::completed(Stage::Provision))
}
