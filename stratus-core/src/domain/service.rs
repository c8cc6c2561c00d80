//! ECS service status types
//!
//! Shaped after the `services` array returned by `aws ecs describe-services`.

use serde::{Deserialize, Serialize};

/// Top-level `describe-services` document
#[derive(Debug, Clone, Deserialize)]
pub struct DescribeServices {
    #[serde(default)]
    pub services: Vec<ServiceStatus>,
    #[serde(default)]
    pub failures: Vec<ServiceFailure>,
}

/// Lookup failure reported by `describe-services` (e.g. `MISSING`)
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceFailure {
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Current state of a running service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub service_name: String,
    #[serde(default)]
    pub cluster_arn: Option<String>,
    pub status: String,
    pub desired_count: u32,
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default)]
    pub task_definition: Option<String>,
    #[serde(default)]
    pub deployments: Vec<DeploymentSummary>,
}

/// One deployment of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub status: String,
    #[serde(default)]
    pub rollout_state: Option<String>,
    #[serde(default)]
    pub task_definition: Option<String>,
    pub desired_count: u32,
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
}

impl ServiceStatus {
    /// Desired and running counts match with a single active deployment
    pub fn is_stable(&self) -> bool {
        self.deployments.len() == 1 && self.running_count == self.desired_count
    }

    /// Task definition family and revision, without the ARN prefix
    pub fn task_definition_short(&self) -> Option<&str> {
        self.task_definition
            .as_deref()
            .map(|arn| arn.rsplit('/').next().unwrap_or(arn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIBE: &str = r#"{
        "services": [{
            "serviceName": "climatepredict-service",
            "clusterArn": "arn:aws:ecs:ap-south-1:123:cluster/climatepredict-cluster",
            "status": "ACTIVE",
            "desiredCount": 2,
            "runningCount": 1,
            "pendingCount": 1,
            "taskDefinition": "arn:aws:ecs:ap-south-1:123:task-definition/climatepredict:7",
            "deployments": [
                {"status": "PRIMARY", "rolloutState": "IN_PROGRESS", "desiredCount": 2, "runningCount": 1, "pendingCount": 1},
                {"status": "ACTIVE", "rolloutState": "COMPLETED", "desiredCount": 0, "runningCount": 1}
            ]
        }],
        "failures": []
    }"#;

    #[test]
    fn test_parse_describe_services() {
        let doc: DescribeServices = serde_json::from_str(DESCRIBE).unwrap();
        let service = &doc.services[0];
        assert_eq!(service.service_name, "climatepredict-service");
        assert_eq!(service.deployments.len(), 2);
        assert_eq!(
            service.deployments[0].rollout_state.as_deref(),
            Some("IN_PROGRESS")
        );
        assert_eq!(service.task_definition_short(), Some("climatepredict:7"));
        assert!(!service.is_stable());
    }

    #[test]
    fn test_stable_service() {
        let mut doc: DescribeServices = serde_json::from_str(DESCRIBE).unwrap();
        let service = &mut doc.services[0];
        service.deployments.truncate(1);
        service.running_count = 2;
        assert!(service.is_stable());
    }
}
