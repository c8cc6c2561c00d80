//! Status stage

use stratus_core::domain::infra::keys;
use stratus_core::domain::stage::{Stage, StageDetail, StageReport};
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::stages::require;
use crate::tools::{Aws, Terraform};

/// Describes the running service and its public address
pub async fn report_status(ctx: &ExecutionContext) -> Result<StageReport> {
    let outputs = Terraform::new(ctx).outputs().await?;
    let cluster = require(&outputs, keys::ECS_CLUSTER_NAME)?;
    let service = require(&outputs, keys::ECS_SERVICE_NAME)?;

    let status = Aws::new(ctx).ecs_describe(cluster, service).await?;
    let url = outputs
        .get(keys::LOAD_BALANCER_DNS)
        .map(|dns| format!("http://{}", dns));

    info!(
        "Service {} is {} ({}/{} tasks running)",
        status.service_name, status.status, status.running_count, status.desired_count
    );

    Ok(StageReport::completed(Stage::Status).with_detail(StageDetail::Service { status, url }))
}
