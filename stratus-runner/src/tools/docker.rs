//! Container engine wrapper
//!
//! All commands are built through the execution context so the privilege
//! mode decided at preflight applies to every call.

use std::path::Path;
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::Result;

pub struct Docker<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> Docker<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Logs in to `registry`, passing the password on stdin
    pub async fn login(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        info!("Logging in to {}", registry);
        let spec = self
            .ctx
            .engine(["login", "--username", username, "--password-stdin", registry])
            .stdin(password);
        self.ctx.output(&spec).await?;
        Ok(())
    }

    /// Builds `context` with `dockerfile`, applying every reference in `tags`
    pub async fn build(&self, dockerfile: &Path, context: &Path, tags: &[String]) -> Result<()> {
        info!("Building image {}", tags.join(", "));
        let mut spec = self
            .ctx
            .engine(["build", "-f"])
            .arg(dockerfile.to_string_lossy());
        for tag in tags {
            spec = spec.arg("-t").arg(tag.as_str());
        }
        let spec = spec.arg(context.to_string_lossy()).streaming();
        self.ctx.output(&spec).await?;
        Ok(())
    }

    pub async fn push(&self, reference: &str) -> Result<()> {
        info!("Pushing {}", reference);
        self.ctx
            .output(&self.ctx.engine(["push", reference]).streaming())
            .await?;
        Ok(())
    }
}
