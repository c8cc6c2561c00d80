//! Pipeline stages
//!
//! One module per stage. Each stage re-reads the Terraform outputs it
//! needs; nothing is carried from one stage to the next.

mod assets;
mod provision;
mod publish;
mod rollout;
mod secrets;
mod status;
mod verify;

pub use assets::sync_assets;
pub use provision::provision;
pub use publish::publish;
pub use rollout::rollout;
pub use secrets::provision_secrets;
pub use status::report_status;
pub use verify::{verify, wait_healthy};

use async_trait::async_trait;
use stratus_core::domain::infra::InfraOutputs;
use stratus_core::domain::stage::{Stage, StageReport};

use crate::context::ExecutionContext;
use crate::error::{DeployError, Result};

/// Executes a single pipeline stage
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, stage: Stage) -> Result<StageReport>;
}

/// Stage executor backed by the real tool wrappers
pub struct DeployStages<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> DeployStages<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StageExecutor for DeployStages<'_> {
    async fn execute(&self, stage: Stage) -> Result<StageReport> {
        match stage {
            Stage::Provision => provision(self.ctx).await,
            Stage::Publish => publish(self.ctx).await,
            Stage::Rollout => rollout(self.ctx).await,
            Stage::Secrets => provision_secrets(self.ctx).await,
            Stage::AssetSync => sync_assets(self.ctx).await,
            Stage::Verify => verify(self.ctx).await,
            Stage::Status => report_status(self.ctx).await,
        }
    }
}

/// Looks up an output a stage cannot proceed without
pub(crate) fn require<'o>(outputs: &'o InfraOutputs, key: &str) -> Result<&'o str> {
    outputs
        .get(key)
        .ok_or_else(|| DeployError::MissingOutput(key.to_string()))
}
