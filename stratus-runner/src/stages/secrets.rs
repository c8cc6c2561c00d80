//! Secrets stage
//!
//! Writes each configured API credential to its secret, if the credential
//! is set locally. An unset credential is a soft-skip: it is reported and
//! nothing is written for it.

use stratus_core::domain::stage::{Stage, StageReport};
use tracing::{info, warn};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::stages::require;
use crate::tools::{Aws, Terraform};

pub async fn provision_secrets(ctx: &ExecutionContext) -> Result<StageReport> {
    let mut warnings = Vec::new();
    let mut pending = Vec::new();

    for credential in &ctx.config().credentials {
        match credential.value() {
            Some(value) => pending.push((credential, value)),
            None => {
                let message = format!(
                    "{} is not set; its secret was left unchanged",
                    credential.env_var
                );
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    if pending.is_empty() {
        return Ok(StageReport::skipped(Stage::Secrets, "no credentials set").with_warnings(warnings));
    }

    let outputs = Terraform::new(ctx).outputs().await?;
    let aws = Aws::new(ctx);

    for (credential, value) in pending {
        let secret_id = require(&outputs, &credential.output_key)?;
        aws.put_secret(secret_id, value).await?;
        info!("Stored {} in {}", credential.env_var, secret_id);
    }

    Ok(StageReport::completed(Stage::Secrets).with_warnings(warnings))
}
