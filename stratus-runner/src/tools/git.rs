//! Git wrapper

use tracing::debug;

use crate::context::ExecutionContext;
use crate::process::CommandSpec;

pub struct Git<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> Git<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Short revision of `HEAD`, or `None` outside a repository or without git
    pub async fn short_revision(&self) -> Option<String> {
        let spec = CommandSpec::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .current_dir(&self.ctx.config().project_root);

        match self.ctx.probe(&spec).await {
            Ok(output) if output.success() => {
                let rev = output.stdout.trim().to_string();
                (!rev.is_empty()).then_some(rev)
            }
            Ok(output) => {
                debug!("No git revision available: {}", output.stderr.trim());
                None
            }
            Err(e) => {
                debug!("No git revision available: {}", e);
                None
            }
        }
    }
}
