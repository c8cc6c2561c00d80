//! Verification stage
//!
//! Waits a grace period for the load balancer to route to the new tasks,
//! then probes the health endpoint with bounded, backed-off retries.
//! "Not ready" answers are retried until the budget runs out and end in a
//! timeout; any other failure ends the stage at once.

use std::future::Future;
use stratus_client::HealthClient;
use stratus_core::domain::infra::keys;
use stratus_core::domain::stage::{Stage, StageDetail, StageReport};
use tracing::{info, warn};

use crate::config::VerifyPolicy;
use crate::context::ExecutionContext;
use crate::error::{DeployError, Result};
use crate::stages::require;
use crate::tools::Terraform;

pub async fn verify(ctx: &ExecutionContext) -> Result<StageReport> {
    let outputs = Terraform::new(ctx).outputs().await?;
    let host = require(&outputs, keys::LOAD_BALANCER_DNS)?;

    let config = ctx.config();
    let policy = &config.verify;
    let client = HealthClient::with_timeout(host, policy.probe_timeout)
        .map_err(|e| DeployError::Config(format!("cannot build HTTP client: {}", e)))?;
    let url = client.url(&config.health_path);

    if !policy.grace_period.is_zero() {
        info!("Waiting {:?} before probing {}", policy.grace_period, url);
        tokio::time::sleep(policy.grace_period).await;
    }

    let attempts = wait_healthy(policy, &url, || client.probe(&config.health_path)).await?;

    Ok(StageReport::completed(Stage::Verify).with_detail(StageDetail::Healthy { url, attempts }))
}

/// Probes until healthy, returning the number of attempts it took
pub async fn wait_healthy<F, Fut>(policy: &VerifyPolicy, url: &str, mut probe: F) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = stratus_client::Result<()>>,
{
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match probe().await {
            Ok(()) => {
                info!("{} is healthy (attempt {})", url, attempt);
                return Ok(attempt);
            }
            Err(e) if e.is_not_ready() => {
                warn!(
                    "{} not ready (attempt {}/{}): {}",
                    url, attempt, policy.max_attempts, e
                );
                last_error = e.to_string();
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
            }
            Err(e) => {
                return Err(DeployError::Unhealthy {
                    url: url.to_string(),
                    source: e,
                });
            }
        }
    }

    Err(DeployError::VerificationTimeout {
        url: url.to_string(),
        attempts: policy.max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use stratus_client::ClientError;

    const URL: &str = "http://alb/_stcore/health";

    #[tokio::test]
    async fn test_retries_until_ready() {
        let calls = Cell::new(0);
        let attempts = wait_healthy(&VerifyPolicy::immediate(5), URL, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(ClientError::unexpected_status(503, "starting"))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_time_out() {
        let calls = Cell::new(0);
        let err = wait_healthy(&VerifyPolicy::immediate(4), URL, || {
            calls.set(calls.get() + 1);
            async { Err(ClientError::unexpected_status(502, "bad gateway")) }
        })
        .await
        .unwrap_err();

        assert!(err.is_verification_timeout());
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_genuine_failure_is_not_retried() {
        let calls = Cell::new(0);
        let err = wait_healthy(&VerifyPolicy::immediate(4), URL, || {
            calls.set(calls.get() + 1);
            async { Err(ClientError::unexpected_status(500, "model load failed")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Unhealthy { .. }));
        assert!(!err.is_verification_timeout());
        assert_eq!(calls.get(), 1);
    }
}
