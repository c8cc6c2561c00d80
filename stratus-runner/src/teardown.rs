//! Two-phase infrastructure teardown
//!
//! A destroy run walks `TeardownState` one step at a time. Nothing
//! destructive happens until the operator has agreed twice: once to the
//! intent, and once to the concrete plan. The second agreement yields a
//! `ConfirmationToken` bound to that plan, and only a matching token
//! unlocks `execute`.

use std::fmt;
use stratus_core::domain::image::Repository;
use stratus_core::domain::infra::keys;
use stratus_core::domain::teardown::{TeardownState, is_affirmative};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::error::{DeployError, Result};
use crate::tools::{Aws, Terraform};

/// Plan file written by `plan` and consumed by `execute`
pub const DESTROY_PLAN_FILE: &str = "destroy.tfplan";

/// A resource that must be emptied before Terraform can delete it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    Bucket { name: String, objects: usize },
    Repository { name: String, digests: Vec<String> },
}

impl Blocker {
    pub fn is_empty(&self) -> bool {
        match self {
            Blocker::Bucket { objects, .. } => *objects == 0,
            Blocker::Repository { digests, .. } => digests.is_empty(),
        }
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::Bucket { name, objects } => {
                write!(f, "s3 bucket {} ({} object(s))", name, objects)
            }
            Blocker::Repository { name, digests } => {
                write!(f, "ecr repository {} ({} image(s))", name, digests.len())
            }
        }
    }
}

/// What a confirmed teardown will do
#[derive(Debug, Clone)]
pub struct DestroyPlan {
    id: Uuid,
    /// Terraform's rendered destroy diff
    pub diff: String,
    /// Non-empty resources that will be emptied first
    pub blockers: Vec<Blocker>,
    bucket: Option<String>,
    repository: Option<String>,
}

impl DestroyPlan {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Proof that the operator accepted a specific destroy plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationToken {
    plan_id: Uuid,
}

/// Summary of a finished teardown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub objects_removed: usize,
    pub images_removed: usize,
}

pub struct Teardown<'a> {
    ctx: &'a ExecutionContext,
    state: TeardownState,
    plan: Option<DestroyPlan>,
    confirmed: Option<ConfirmationToken>,
}

impl<'a> Teardown<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self {
            ctx,
            state: TeardownState::AwaitConfirm1,
            plan: None,
            confirmed: None,
        }
    }

    pub fn state(&self) -> TeardownState {
        self.state
    }

    fn expect_state(&self, expected: TeardownState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DeployError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// First gate: the operator agrees to tear the deployment down at all
    pub fn confirm_intent(&mut self, answer: &str) -> Result<()> {
        self.expect_state(TeardownState::AwaitConfirm1, "confirm intent")?;
        if !is_affirmative(answer) {
            info!("Teardown declined at first confirmation");
            self.state = TeardownState::Aborted;
            return Err(DeployError::TeardownDeclined {
                gate: "first confirmation",
            });
        }
        self.state = TeardownState::PlanDestroy;
        Ok(())
    }

    /// Inspects blockers and writes the destroy plan; changes nothing remote
    pub async fn plan(&mut self) -> Result<&DestroyPlan> {
        self.expect_state(TeardownState::PlanDestroy, "plan")?;

        let terraform = Terraform::new(self.ctx);
        let aws = Aws::new(self.ctx);
        terraform.init().await?;

        let outputs = terraform.outputs().await?;
        if outputs.is_empty() {
            warn!("Terraform state has no outputs; nothing to empty");
        }

        let bucket = outputs.get(keys::S3_BUCKET_NAME).map(str::to_string);
        let repository = outputs
            .get(keys::ECR_REPOSITORY_URL)
            .map(|url| Repository::new(url).name().to_string());
        let mut blockers = Vec::new();

        if let Some(name) = &bucket {
            let objects = aws.s3_object_count(name).await?;
            blockers.push(Blocker::Bucket {
                name: name.clone(),
                objects,
            });
        }
        if let Some(name) = &repository {
            let digests = aws.ecr_image_digests(name).await?;
            blockers.push(Blocker::Repository {
                name: name.clone(),
                digests,
            });
        }
        blockers.retain(|b| !b.is_empty());

        let diff = terraform.plan_destroy(DESTROY_PLAN_FILE).await?;

        self.state = TeardownState::AwaitConfirm2;
        Ok(self.plan.insert(DestroyPlan {
            id: Uuid::new_v4(),
            diff,
            blockers,
            bucket,
            repository,
        }))
    }

    /// Second gate: the operator accepts the plan just shown
    pub async fn confirm_plan(&mut self, answer: &str) -> Result<ConfirmationToken> {
        self.expect_state(TeardownState::AwaitConfirm2, "confirm plan")?;
        let Some(plan) = self.plan.as_ref() else {
            return Err(DeployError::InvalidState {
                operation: "confirm plan",
                state: self.state,
            });
        };

        if !is_affirmative(answer) {
            info!("Teardown declined at second confirmation");
            self.state = TeardownState::Aborted;
            self.plan = None;
            Terraform::new(self.ctx).remove_plan(DESTROY_PLAN_FILE).await?;
            return Err(DeployError::TeardownDeclined {
                gate: "second confirmation",
            });
        }

        let token = ConfirmationToken { plan_id: plan.id };
        self.confirmed = Some(token);
        Ok(token)
    }

    /// Empties blockers, then destroys the planned infrastructure
    pub async fn execute(&mut self, token: ConfirmationToken) -> Result<TeardownReport> {
        self.expect_state(TeardownState::AwaitConfirm2, "execute")?;
        if self.confirmed != Some(token) {
            return Err(DeployError::InvalidToken);
        }
        let Some(plan) = self.plan.take() else {
            return Err(DeployError::InvalidToken);
        };

        let result = self.empty_and_destroy(&plan).await;
        let removed = Terraform::new(self.ctx).remove_plan(DESTROY_PLAN_FILE).await;
        let report = result?;
        removed?;

        self.state = TeardownState::Done;
        info!("Teardown complete");
        Ok(report)
    }

    /// Empties what the bucket and repository hold now, then applies the plan
    async fn empty_and_destroy(&mut self, plan: &DestroyPlan) -> Result<TeardownReport> {
        self.state = TeardownState::EmptyingBlockers;
        let aws = Aws::new(self.ctx);
        let mut report = TeardownReport::default();

        if let Some(bucket) = &plan.bucket {
            if aws.s3_object_count(bucket).await? > 0 {
                report.objects_removed = aws.s3_empty(bucket).await?;
            }
        }
        if let Some(repository) = &plan.repository {
            let digests = aws.ecr_image_digests(repository).await?;
            if !digests.is_empty() {
                aws.ecr_delete_images(repository, &digests).await?;
                report.images_removed = digests.len();
            }
        }

        self.state = TeardownState::Destroying;
        Terraform::new(self.ctx).apply_plan(DESTROY_PLAN_FILE).await?;
        Ok(report)
    }
}
