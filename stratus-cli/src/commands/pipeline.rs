//! Pipeline command handler
//!
//! Runs a pipeline against the real tools and renders progress, warnings
//! and stage results on the console.

use anyhow::Result;
use colored::*;
use stratus_core::domain::service::ServiceStatus;
use stratus_core::domain::stage::{Stage, StageDetail, StageOutcome, StageReport};
use stratus_runner::{DeployError, DeployStages, ExecutionContext, Pipeline, StageObserver};

/// Prints one block per stage as the pipeline advances
struct ConsoleObserver;

impl StageObserver for ConsoleObserver {
    fn started(&self, stage: Stage, index: usize, total: usize) {
        println!();
        println!(
            "{} {}",
            format!("[{}/{}]", index + 1, total).dimmed(),
            stage.name().bold()
        );
    }

    fn finished(&self, report: &StageReport) {
        for warning in &report.warnings {
            println!("  {} {}", "!".yellow().bold(), warning.yellow());
        }

        match &report.outcome {
            StageOutcome::Completed => println!(
                "{}",
                format!("✓ {} completed in {:.1?}", report.stage, report.elapsed).green()
            ),
            StageOutcome::Skipped { reason } => println!(
                "{}",
                format!("- {} skipped: {}", report.stage, reason).yellow()
            ),
        }

        if let Some(detail) = &report.detail {
            print_detail(detail);
        }
    }

    fn failed(&self, stage: Stage, error: &DeployError) {
        println!("{}", format!("✗ {} failed: {}", stage, error).red().bold());
    }
}

fn print_detail(detail: &StageDetail) {
    match detail {
        StageDetail::Image { references } => {
            for reference in references {
                println!("  Pushed: {}", reference.cyan());
            }
        }
        StageDetail::Healthy { url, attempts } => {
            println!(
                "  Healthy: {} {}",
                url.cyan(),
                format!("(after {} attempt(s))", attempts).dimmed()
            );
        }
        StageDetail::Service { status, url } => {
            print_service(status);
            if let Some(url) = url {
                println!("  URL:        {}", url.cyan().bold());
            }
        }
    }
}

fn print_service(status: &ServiceStatus) {
    let state = if status.is_stable() {
        status.status.green()
    } else {
        status.status.yellow()
    };
    println!("  Service:    {}", status.service_name.bold());
    println!("  Status:     {}", state);
    println!(
        "  Tasks:      {} running / {} desired / {} pending",
        status.running_count, status.desired_count, status.pending_count
    );
    if let Some(task_definition) = status.task_definition_short() {
        println!("  Task def:   {}", task_definition.dimmed());
    }
    for deployment in &status.deployments {
        println!(
            "    - {} {} ({}/{})",
            deployment.status,
            deployment
                .rollout_state
                .as_deref()
                .unwrap_or_default()
                .dimmed(),
            deployment.running_count,
            deployment.desired_count
        );
    }
}

/// Runs `pipeline` and prints a closing summary
pub async fn run_pipeline(ctx: &ExecutionContext, pipeline: &Pipeline) -> Result<()> {
    let stages = DeployStages::new(ctx);
    let reports = pipeline.run(&stages, &ConsoleObserver).await?;

    let skipped = reports.iter().filter(|r| r.outcome.is_skipped()).count();
    let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();

    println!();
    if skipped == 0 && warnings == 0 {
        println!("{}", "✓ All stages completed successfully!".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "✓ Finished with {} skipped stage(s) and {} warning(s)",
                skipped, warnings
            )
            .yellow()
            .bold()
        );
    }

    Ok(())
}
