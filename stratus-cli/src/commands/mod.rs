//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod destroy;
mod pipeline;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use std::sync::Arc;
use stratus_core::domain::stage::Stage;
use stratus_runner::{
    DeployConfig, EnginePrivilege, ExecutionContext, Pipeline, Requirements, SystemCommandRunner,
    run_preflight,
};
use tracing::{Instrument, info, info_span};

/// Top-level CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Commands {
    /// Provision infrastructure with Terraform
    Infrastructure,
    /// Build and push the container image
    Build,
    /// Run the full deployment pipeline
    #[default]
    Deploy,
    /// Show the ECS service status and public URL
    Status,
    /// Write API keys from the environment into Secrets Manager
    Secrets,
    /// Mirror models/ and data/ to the assets bucket
    Models,
    /// Probe the deployed application's health endpoint
    Test,
    /// Tear down all infrastructure (asks for confirmation twice)
    Destroy,
}

impl Commands {
    /// Stages the command runs, or `None` for teardown
    pub fn pipeline(&self) -> Option<Pipeline> {
        let stage = match self {
            Commands::Deploy => return Some(Pipeline::deploy()),
            Commands::Destroy => return None,
            Commands::Infrastructure => Stage::Provision,
            Commands::Build => Stage::Publish,
            Commands::Status => Stage::Status,
            Commands::Secrets => Stage::Secrets,
            Commands::Models => Stage::AssetSync,
            Commands::Test => Stage::Verify,
        };
        Some(Pipeline::single(stage))
    }

    fn name(&self) -> &'static str {
        match self {
            Commands::Infrastructure => "infrastructure",
            Commands::Build => "build",
            Commands::Deploy => "deploy",
            Commands::Status => "status",
            Commands::Secrets => "secrets",
            Commands::Models => "models",
            Commands::Test => "test",
            Commands::Destroy => "destroy",
        }
    }
}

/// Handle a CLI command
///
/// Runs preflight checks for what the command needs, then either the
/// command's pipeline or the interactive teardown.
pub async fn handle_command(command: Commands, config: DeployConfig) -> Result<()> {
    let mut ctx = ExecutionContext::new(config, Arc::new(SystemCommandRunner));
    let span = info_span!("run", id = %ctx.run_id().short(), command = command.name());

    run(command, &mut ctx).instrument(span).await
}

async fn run(command: Commands, ctx: &mut ExecutionContext) -> Result<()> {
    let pipeline = command.pipeline();
    let requirements = match &pipeline {
        Some(p) => Requirements::for_stages(p.stages()),
        None => Requirements::teardown(),
    };

    info!("Running preflight checks");
    let preflight = run_preflight(ctx, &requirements).await?;
    if let Some(account) = &preflight.account {
        println!("{} {}", "AWS account:".bold(), account.cyan());
    }
    if preflight.privilege == EnginePrivilege::Elevated {
        println!(
            "{}",
            "Docker daemon requires sudo; docker commands will be elevated".yellow()
        );
    }
    ctx.set_privilege(preflight.privilege);

    match pipeline {
        Some(pipeline) => pipeline::run_pipeline(ctx, &pipeline).await,
        None => destroy::run_destroy(ctx).await,
    }
}
