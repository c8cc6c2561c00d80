//! Scripted command runner for unit tests
//!
//! Records every command it is asked to run and answers from a list of
//! prefix rules. The most recently added matching rule wins; commands with
//! no matching rule succeed with empty output.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{DeployError, Result};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

enum Reply {
    Output(CommandOutput),
    /// Behave as if the program is not installed
    Missing,
}

struct Rule {
    prefix: String,
    reply: Reply,
}

/// A command seen by the runner
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Rendered command line, secrets redacted
    pub line: String,
    pub stdin: Option<String>,
}

#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, prefix: &str, reply: Reply) {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.to_string(),
            reply,
        });
    }

    /// Commands starting with `prefix` succeed with `stdout`
    pub fn reply(&self, prefix: &str, stdout: &str) -> &Self {
        self.push(prefix, Reply::Output(CommandOutput::ok(stdout)));
        self
    }

    /// Commands starting with `prefix` exit with `exit_code`
    pub fn fail(&self, prefix: &str, exit_code: i32, stderr: &str) -> &Self {
        self.push(
            prefix,
            Reply::Output(CommandOutput::failed(exit_code, stderr)),
        );
        self
    }

    /// Commands starting with `prefix` cannot be spawned
    pub fn missing(&self, prefix: &str) -> &Self {
        self.push(prefix, Reply::Missing);
        self
    }

    /// Answers `terraform output -json` with a fully provisioned stack
    pub fn provisioned(&self) -> &Self {
        self.reply("terraform output -json", &provisioned_outputs())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.line).collect()
    }

    /// Whether any recorded command starts with `prefix`
    pub fn called(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Index of the first recorded command starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.lines().iter().filter(|l| l.starts_with(prefix)).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let line = spec.display();
        self.calls.lock().unwrap().push(RecordedCall {
            line: line.clone(),
            stdin: spec.stdin_data().map(str::to_string),
        });

        let rules = self.rules.lock().unwrap();
        match rules.iter().rev().find(|r| line.starts_with(&r.prefix)) {
            Some(Rule {
                reply: Reply::Output(output),
                ..
            }) => Ok(output.clone()),
            Some(Rule {
                reply: Reply::Missing,
                ..
            }) => Err(DeployError::Spawn {
                program: spec.program().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

/// `terraform output -json` document for a fully provisioned stack
pub fn provisioned_outputs() -> String {
    serde_json::json!({
        "ecr_repository_url": {"value": "123456789012.dkr.ecr.ap-south-1.amazonaws.com/climatepredict", "type": "string", "sensitive": false},
        "ecs_cluster_name": {"value": "climatepredict-cluster", "type": "string", "sensitive": false},
        "ecs_service_name": {"value": "climatepredict-service", "type": "string", "sensitive": false},
        "load_balancer_dns": {"value": "climatepredict-alb-1.ap-south-1.elb.amazonaws.com", "type": "string", "sensitive": false},
        "s3_bucket_name": {"value": "climatepredict-models-test", "type": "string", "sensitive": false},
        "google_api_key_secret_name": {"value": "climatepredict/google-api-key", "type": "string", "sensitive": false},
        "openweather_api_key_secret_name": {"value": "climatepredict/openweather-api-key", "type": "string", "sensitive": false},
    })
    .to_string()
}

/// A unique, not yet created directory under the system temp dir
pub fn scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("stratus-test-{}", uuid::Uuid::new_v4()))
}
