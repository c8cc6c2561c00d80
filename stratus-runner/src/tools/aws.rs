//! AWS CLI wrapper
//!
//! Covers the services a deployment touches: ECR (registry login, image
//! listing and deletion), ECS (rollout, stability wait, status), Secrets
//! Manager and S3. Every call targets the configured region.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use stratus_core::domain::service::{DescribeServices, ServiceStatus};
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::error::{DeployError, Result};
use crate::process::CommandSpec;

/// ECR rejects `batch-delete-image` requests with more ids than this
pub const ECR_BATCH_DELETE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImages {
    #[serde(default)]
    image_ids: Vec<ImageId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageId {
    image_digest: Option<String>,
}

pub struct Aws<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> Aws<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self { ctx }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("aws")
            .args(args)
            .arg("--region")
            .arg(self.ctx.config().region.as_str())
    }

    // =============================================================================
    // ECR
    // =============================================================================

    /// Password for `docker login` against the account's registry
    pub async fn ecr_login_password(&self) -> Result<String> {
        let stdout = self
            .ctx
            .exec(&self.command(["ecr", "get-login-password"]))
            .await?;
        Ok(stdout.trim().to_string())
    }

    /// Digests of every image in `repository`, deduplicated across tags
    pub async fn ecr_image_digests(&self, repository: &str) -> Result<Vec<String>> {
        let stdout = self
            .ctx
            .exec(&self.command([
                "ecr",
                "list-images",
                "--repository-name",
                repository,
                "--output",
                "json",
            ]))
            .await?;

        let listed: ListImages =
            serde_json::from_str(&stdout).map_err(|e| DeployError::parse("ecr list-images", e))?;

        let digests: BTreeSet<String> = listed
            .image_ids
            .into_iter()
            .filter_map(|id| id.image_digest)
            .collect();
        Ok(digests.into_iter().collect())
    }

    /// Deletes images by digest, in batches ECR accepts
    pub async fn ecr_delete_images(&self, repository: &str, digests: &[String]) -> Result<()> {
        for chunk in digests.chunks(ECR_BATCH_DELETE_LIMIT) {
            let ids: Vec<serde_json::Value> = chunk
                .iter()
                .map(|d| serde_json::json!({ "imageDigest": d }))
                .collect();
            let ids = serde_json::Value::Array(ids).to_string();

            info!("Deleting {} image(s) from {}", chunk.len(), repository);
            self.ctx
                .exec(&self.command([
                    "ecr",
                    "batch-delete-image",
                    "--repository-name",
                    repository,
                    "--image-ids",
                    ids.as_str(),
                ]))
                .await?;
        }
        Ok(())
    }

    // =============================================================================
    // ECS
    // =============================================================================

    /// Replaces the service's tasks with fresh ones pulling the current image
    pub async fn ecs_force_deployment(&self, cluster: &str, service: &str) -> Result<()> {
        info!("Forcing new deployment of {}/{}", cluster, service);
        self.ctx
            .exec(&self.command([
                "ecs",
                "update-service",
                "--cluster",
                cluster,
                "--service",
                service,
                "--force-new-deployment",
                "--output",
                "json",
            ]))
            .await?;
        Ok(())
    }

    /// Blocks until ECS reports the service stable, or its waiter gives up
    pub async fn ecs_wait_stable(&self, cluster: &str, service: &str) -> Result<()> {
        info!("Waiting for {}/{} to become stable", cluster, service);
        self.ctx
            .exec(&self.command([
                "ecs",
                "wait",
                "services-stable",
                "--cluster",
                cluster,
                "--services",
                service,
            ]))
            .await?;
        Ok(())
    }

    pub async fn ecs_describe(&self, cluster: &str, service: &str) -> Result<ServiceStatus> {
        let stdout = self
            .ctx
            .exec(&self.command([
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--services",
                service,
                "--output",
                "json",
            ]))
            .await?;

        let doc: DescribeServices = serde_json::from_str(&stdout)
            .map_err(|e| DeployError::parse("ecs describe-services", e))?;

        if let Some(service) = doc.services.into_iter().next() {
            return Ok(service);
        }

        let reason = doc
            .failures
            .into_iter()
            .next()
            .and_then(|f| f.reason)
            .unwrap_or_else(|| "no such service".to_string());
        Err(DeployError::parse(
            "ecs describe-services",
            format!("{}/{}: {}", cluster, service, reason),
        ))
    }

    // =============================================================================
    // Secrets Manager
    // =============================================================================

    /// Stores a new version of `secret_id`; the value is redacted in logs
    pub async fn put_secret(&self, secret_id: &str, value: &str) -> Result<()> {
        info!("Writing secret {}", secret_id);
        let spec = CommandSpec::new("aws")
            .args([
                "secretsmanager",
                "put-secret-value",
                "--secret-id",
                secret_id,
                "--secret-string",
            ])
            .secret_arg(value)
            .arg("--region")
            .arg(self.ctx.config().region.as_str());
        self.ctx.exec(&spec).await?;
        Ok(())
    }

    // =============================================================================
    // S3
    // =============================================================================

    /// Mirrors `local` to `s3://bucket/prefix`, deleting remote extras
    pub async fn s3_sync_mirror(&self, local: &Path, bucket: &str, prefix: &str) -> Result<()> {
        let destination = s3_url(bucket, prefix);
        info!("Syncing {} to {}", local.display(), destination);
        self.ctx
            .output(
                &self
                    .command(["s3", "sync"])
                    .arg(local.to_string_lossy())
                    .arg(destination)
                    .arg("--delete")
                    .streaming(),
            )
            .await?;
        Ok(())
    }

    /// Number of objects in `bucket`
    ///
    /// Goes through `s3api` so an empty bucket counts as zero instead of
    /// failing the way an empty `s3 ls` listing does.
    pub async fn s3_object_count(&self, bucket: &str) -> Result<usize> {
        let stdout = self
            .ctx
            .exec(&self.command([
                "s3api",
                "list-objects-v2",
                "--bucket",
                bucket,
                "--query",
                "length(Contents || `[]`)",
                "--output",
                "text",
            ]))
            .await?;
        let count = stdout
            .trim()
            .parse::<usize>()
            .map_err(|e| DeployError::parse("s3api list-objects-v2", e))?;
        debug!("Bucket {} holds {} object(s)", bucket, count);
        Ok(count)
    }

    /// Deletes every object in `bucket`, returning how many were removed
    pub async fn s3_empty(&self, bucket: &str) -> Result<usize> {
        info!("Emptying bucket {}", bucket);
        let stdout = self
            .ctx
            .exec(
                &self
                    .command(["s3", "rm", "--recursive"])
                    .arg(s3_url(bucket, "")),
            )
            .await?;
        Ok(stdout
            .lines()
            .filter(|l| l.trim_start().starts_with("delete:"))
            .count())
    }
}
