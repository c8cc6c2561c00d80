//! Rollout stage

use stratus_core::domain::infra::keys;
use stratus_core::domain::stage::{Stage, StageReport};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::stages::require;
use crate::tools::{Aws, Terraform};

/// Forces a new deployment and blocks until ECS reports the service stable
pub async fn rollout(ctx: &ExecutionContext) -> Result<StageReport> {
    let outputs = Terraform::new(ctx).outputs().await?;
    let cluster = require(&outputs, keys::ECS_CLUSTER_NAME)?;
    let service = require(&outputs, keys::ECS_SERVICE_NAME)?;

    let aws = Aws::new(ctx);
    aws.ecs_force_deployment(cluster, service).await?;
    aws.ecs_wait_stable(cluster, service).await?;

    Ok(StageReport::completed(Stage::Rollout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::testing::ScriptedRunner;

    #[tokio::test]
    async fn test_rollout_waits_after_update() {
        let runner = ScriptedRunner::new();
        runner.provisioned();
        let ctx = ExecutionContext::new(DeployConfig::default(), runner.clone());

        rollout(&ctx).await.unwrap();

        let update = runner.position("aws ecs update-service").unwrap();
        let wait = runner.position("aws ecs wait services-stable").unwrap();
        assert!(update < wait);
        assert!(runner.lines()[update].contains("--force-new-deployment"));
    }

    #[tokio::test]
    async fn test_wait_timeout_fails_rollout() {
        let runner = ScriptedRunner::new();
        runner.provisioned().fail(
            "aws ecs wait services-stable",
            255,
            "Waiter ServicesStable failed: Max attempts exceeded",
        );
        let ctx = ExecutionContext::new(DeployConfig::default(), runner.clone());

        let err = rollout(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("Max attempts exceeded"));
    }
}
