//! Stratus CLI
//!
//! Command-line entry point for deploying, inspecting and tearing down the
//! ClimatePredict stack.

mod commands;
mod config;

use clap::Parser;
use clap::error::ErrorKind;
use colored::*;
use commands::{Commands, handle_command};
use config::Overrides;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stratus", version)]
#[command(about = "Deploy the ClimatePredict stack to AWS", long_about = None)]
struct Cli {
    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Project root holding the Dockerfile, terraform/, models/ and data/
    #[arg(long, global = true, env = "STRATUS_PROJECT_ROOT")]
    project_root: Option<PathBuf>,

    /// Terraform directory, relative to the project root
    #[arg(long, global = true, env = "STRATUS_TERRAFORM_DIR")]
    terraform_dir: Option<PathBuf>,

    /// Defaults to `deploy`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_exit_status(e.kind()));
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stratus_cli=info,stratus_runner=info,stratus_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let overrides = Overrides {
        region: cli.region,
        project_root: cli.project_root,
        terraform_dir: cli.terraform_dir,
    };
    let command = cli.command.unwrap_or_default();

    let result = match config::load(overrides) {
        Ok(config) => handle_command(command, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Help and version requests succeed; every other parse error is a usage error
fn parse_exit_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}
