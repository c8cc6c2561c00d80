//! Pipeline stage types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::service::ServiceStatus;

/// One discrete step of the deployment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Provision,
    Publish,
    Rollout,
    Secrets,
    AssetSync,
    Verify,
    Status,
}

impl Stage {
    /// Stages run by a full `deploy`, in execution order
    pub const DEPLOY_ORDER: [Stage; 7] = [
        Stage::Provision,
        Stage::Publish,
        Stage::Rollout,
        Stage::Secrets,
        Stage::AssetSync,
        Stage::Verify,
        Stage::Status,
    ];

    /// Short lowercase name used in logs and console output
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Provision => "provision",
            Stage::Publish => "publish",
            Stage::Rollout => "rollout",
            Stage::Secrets => "secrets",
            Stage::AssetSync => "asset-sync",
            Stage::Verify => "verify",
            Stage::Status => "status",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a stage finished, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    /// Every external call of the stage succeeded
    Completed,
    /// A missing optional input turned the stage into a no-op
    Skipped { reason: String },
}

impl StageOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped { .. })
    }
}

/// Stage-specific result worth showing to the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageDetail {
    /// Image references pushed by a publish
    Image { references: Vec<String> },
    /// Health endpoint answered after `attempts` probes
    Healthy { url: String, attempts: u32 },
    /// Current service state and public address
    Service {
        status: ServiceStatus,
        url: Option<String>,
    },
}

/// Report for a stage that finished without error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    /// Soft-skip messages, one per missing directory or unset credential
    pub warnings: Vec<String>,
    pub detail: Option<StageDetail>,
    pub elapsed: Duration,
}

impl StageReport {
    pub fn completed(stage: Stage) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Completed,
            warnings: Vec::new(),
            detail: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Skipped {
                reason: reason.into(),
            },
            warnings: Vec::new(),
            detail: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_detail(mut self, detail: StageDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}
