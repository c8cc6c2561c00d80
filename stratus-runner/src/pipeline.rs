//! Pipeline executor
//!
//! Runs a fixed, ordered list of stages and stops at the first failure.
//! Stages that already completed are left as they are.

use std::time::Instant;
use stratus_core::domain::stage::{Stage, StageReport};
use tracing::{error, info};

use crate::error::{DeployError, Result};
use crate::stages::StageExecutor;

/// Receives progress notifications while a pipeline runs
pub trait StageObserver: Send + Sync {
    fn started(&self, _stage: Stage, _index: usize, _total: usize) {}
    fn finished(&self, _report: &StageReport) {}
    fn failed(&self, _stage: Stage, _error: &DeployError) {}
}

/// Observer that ignores every notification
pub struct SilentObserver;

impl StageObserver for SilentObserver {}

/// An ordered list of stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// The full deployment: provision through status
    pub fn deploy() -> Self {
        Self {
            stages: Stage::DEPLOY_ORDER.to_vec(),
        }
    }

    /// A pipeline of one stage, for partial re-runs
    pub fn single(stage: Stage) -> Self {
        Self {
            stages: vec![stage],
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Executes every stage in order
    ///
    /// Returns the reports of all stages on success. On the first failure
    /// the remaining stages are not started and the error is returned
    /// tagged with the failed stage.
    pub async fn run(
        &self,
        executor: &dyn StageExecutor,
        observer: &dyn StageObserver,
    ) -> Result<Vec<StageReport>> {
        let total = self.stages.len();
        let mut reports = Vec::with_capacity(total);

        for (idx, stage) in self.stages.iter().copied().enumerate() {
            info!("Executing stage {}/{}: {}", idx + 1, total, stage);
            observer.started(stage, idx, total);

            let started = Instant::now();
            match executor.execute(stage).await {
                Ok(report) => {
                    let report = report.with_elapsed(started.elapsed());
                    info!("Stage '{}' completed in {:?}", stage, report.elapsed);
                    observer.finished(&report);
                    reports.push(report);
                }
                Err(e) => {
                    error!("Stage '{}' failed: {}", stage, e);
                    observer.failed(stage, &e);
                    return Err(e.in_stage(stage));
                }
            }
        }

        Ok(reports)
    }
}
