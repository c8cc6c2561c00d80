//! Destroy command handler
//!
//! Interactive front end for the teardown state machine. Both prompts read a
//! line from stdin; anything but `yes` stops the teardown and the command
//! fails.

use anyhow::{Context, Result, anyhow};
use colored::*;
use stratus_runner::{DeployError, ExecutionContext, Teardown};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn prompt<R>(input: &mut R, question: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{} ", question).as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .await
        .context("Failed to read confirmation")?;
    Ok(answer)
}

pub async fn run_destroy(ctx: &ExecutionContext) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin());
    destroy_with(ctx, &mut input).await
}

async fn destroy_with<R>(ctx: &ExecutionContext, input: &mut R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut teardown = Teardown::new(ctx);

    println!(
        "{}",
        "This destroys every resource of the deployment, including stored models and images."
            .red()
            .bold()
    );
    let answer = prompt(input, "Type 'yes' to plan the teardown:").await?;
    if let Err(e) = teardown.confirm_intent(&answer) {
        return declined(e);
    }

    let plan = teardown.plan().await?;
    println!();
    println!("{}", plan.diff);
    if plan.blockers.is_empty() {
        println!("{}", "No bucket or repository contents to remove.".dimmed());
    } else {
        println!("{}", "Emptied before destroy:".bold());
        for blocker in &plan.blockers {
            println!("  - {}", blocker.to_string().yellow());
        }
    }

    let answer = prompt(input, "Type 'yes' to destroy:").await?;
    let token = match teardown.confirm_plan(&answer).await {
        Ok(token) => token,
        Err(e) => return declined(e),
    };

    let report = teardown.execute(token).await?;
    println!("{}", "✓ Infrastructure destroyed".green().bold());
    println!(
        "  Removed {} object(s) and {} image(s)",
        report.objects_removed, report.images_removed
    );
    Ok(())
}

/// A declined gate changes nothing but still fails the command
fn declined(error: DeployError) -> Result<()> {
    match error {
        DeployError::TeardownDeclined { gate } => {
            println!("{}", "Teardown cancelled; nothing was changed.".yellow());
            Err(anyhow!("teardown declined at {}", gate))
        }
        other => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use stratus_runner::DeployConfig;
    use stratus_runner::process::{CommandOutput, CommandRunner, CommandSpec};

    /// Succeeds at everything and remembers what it ran
    #[derive(Default)]
    struct RecordingRunner {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> stratus_runner::Result<CommandOutput> {
            self.lines.lock().unwrap().push(spec.display());
            Ok(CommandOutput::default())
        }
    }

    fn context(runner: Arc<RecordingRunner>) -> ExecutionContext {
        let root = std::env::temp_dir().join(format!("stratus-cli-{}", std::process::id()));
        ExecutionContext::new(DeployConfig::new(root), runner)
    }

    #[tokio::test]
    async fn test_declined_intent_fails_command() {
        let runner = Arc::new(RecordingRunner::default());
        let ctx = context(runner.clone());
        let mut input: &[u8] = b"no\n";

        let err = destroy_with(&ctx, &mut input).await.unwrap_err();

        assert!(err.to_string().contains("first confirmation"));
        assert!(runner.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_declined_plan_fails_command() {
        let runner = Arc::new(RecordingRunner::default());
        let ctx = context(runner.clone());
        let mut input: &[u8] = b"yes\nno\n";

        let err = destroy_with(&ctx, &mut input).await.unwrap_err();

        assert!(err.to_string().contains("second confirmation"));
        let lines = runner.lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.starts_with("terraform plan -destroy")));
        assert!(!lines.iter().any(|l| l.starts_with("terraform apply")));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = declined(DeployError::InvalidToken).unwrap_err();
        assert!(err.downcast_ref::<DeployError>().is_some());
    }
}
