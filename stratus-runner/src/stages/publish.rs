//! Publish stage
//!
//! Builds the application image and pushes it to the registry under both
//! `latest` and a run-specific tag.

use stratus_core::domain::image::{ImageTag, LATEST_TAG, Repository};
use stratus_core::domain::infra::keys;
use stratus_core::domain::stage::{Stage, StageDetail, StageReport};
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::stages::require;
use crate::tools::{Aws, Docker, Git, Terraform};

/// Username ECR expects for token-based logins
const ECR_USERNAME: &str = "AWS";

pub async fn publish(ctx: &ExecutionContext) -> Result<StageReport> {
    let outputs = Terraform::new(ctx).outputs().await?;
    let repository = Repository::new(require(&outputs, keys::ECR_REPOSITORY_URL)?);

    let revision = Git::new(ctx).short_revision().await;
    let tag = ImageTag::resolve(revision.as_deref(), chrono::Utc::now());
    info!("Publishing {} with tag {}", repository.url(), tag);

    let password = Aws::new(ctx).ecr_login_password().await?;
    let docker = Docker::new(ctx);
    docker
        .login(repository.registry(), ECR_USERNAME, &password)
        .await?;

    let references = vec![
        repository.reference(LATEST_TAG),
        repository.reference(tag.as_str()),
    ];

    let config = ctx.config();
    docker
        .build(&config.dockerfile_path(), &config.project_root, &references)
        .await?;

    for reference in &references {
        docker.push(reference).await?;
    }

    Ok(StageReport::completed(Stage::Publish).with_detail(StageDetail::Image { references }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::context::EnginePrivilege;
    use crate::testing::ScriptedRunner;

    const REPO: &str = "123456789012.dkr.ecr.ap-south-1.amazonaws.com/climatepredict";

    #[tokio::test]
    async fn test_publish_tags_latest_and_revision() {
        let runner = ScriptedRunner::new();
        runner
            .provisioned()
            .reply("git rev-parse", "a1b2c3d\n")
            .reply("aws ecr get-login-password", "token-123\n");
        let ctx = ExecutionContext::new(DeployConfig::default(), runner.clone());

        let report = publish(&ctx).await.unwrap();

        let lines = runner.lines();
        assert!(lines.contains(&format!(
            "docker build -f ./Dockerfile -t {REPO}:latest -t {REPO}:a1b2c3d ."
        )));
        assert!(lines.contains(&format!("docker push {REPO}:latest")));
        assert!(lines.contains(&format!("docker push {REPO}:a1b2c3d")));

        let login = runner
            .calls()
            .into_iter()
            .find(|c| c.line.starts_with("docker login"))
            .unwrap();
        assert_eq!(
            login.line,
            "docker login --username AWS --password-stdin 123456789012.dkr.ecr.ap-south-1.amazonaws.com"
        );
        assert_eq!(login.stdin.as_deref(), Some("token-123"));

        match report.detail {
            Some(StageDetail::Image { references }) => assert_eq!(references.len(), 2),
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_falls_back_to_timestamp() {
        let runner = ScriptedRunner::new();
        runner
            .provisioned()
            .fail("git rev-parse", 128, "fatal: not a git repository");
        let ctx = ExecutionContext::new(DeployConfig::default(), runner.clone());

        publish(&ctx).await.unwrap();

        let push = runner
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("docker push"))
            .nth(1)
            .unwrap();
        let tag = push.rsplit(':').next().unwrap();
        assert_eq!(tag.len(), "20260301-090507".len());
        assert_eq!(&tag[8..9], "-");
    }

    #[tokio::test]
    async fn test_publish_elevated_uses_sudo() {
        let runner = ScriptedRunner::new();
        runner.provisioned();
        let ctx = ExecutionContext::new(DeployConfig::default(), runner.clone())
            .with_privilege(EnginePrivilege::Elevated);

        publish(&ctx).await.unwrap();

        let docker_calls: Vec<String> = runner
            .lines()
            .into_iter()
            .filter(|l| l.contains("docker "))
            .collect();
        assert_eq!(docker_calls.len(), 4);
        assert!(docker_calls.iter().all(|l| l.starts_with("sudo docker ")));
    }

    #[tokio::test]
    async fn test_publish_requires_repository_output() {
        let runner = ScriptedRunner::new();
        runner.reply("terraform output -json", "{}");
        let ctx = ExecutionContext::new(DeployConfig::default(), runner.clone());

        let err = publish(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("ecr_repository_url"));
        assert!(!runner.called("aws ecr"));
    }
}
