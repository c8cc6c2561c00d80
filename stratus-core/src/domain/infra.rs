//! Terraform output types

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Well-known output names declared by the Terraform configuration
pub mod keys {
    pub const ECR_REPOSITORY_URL: &str = "ecr_repository_url";
    pub const ECS_CLUSTER_NAME: &str = "ecs_cluster_name";
    pub const ECS_SERVICE_NAME: &str = "ecs_service_name";
    pub const LOAD_BALANCER_DNS: &str = "load_balancer_dns";
    pub const S3_BUCKET_NAME: &str = "s3_bucket_name";
    pub const GOOGLE_API_KEY_SECRET: &str = "google_api_key_secret_name";
    pub const OPENWEATHER_API_KEY_SECRET: &str = "openweather_api_key_secret_name";
}

/// One entry of `terraform output -json`
#[derive(Debug, Deserialize)]
struct RawOutput {
    value: JsonValue,
}

/// Snapshot of the infrastructure outputs
///
/// Re-read from Terraform state by every stage that needs a value; a
/// snapshot never outlives the stage that queried it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfraOutputs {
    values: BTreeMap<String, String>,
}

impl InfraOutputs {
    /// Parses the document printed by `terraform output -json`
    ///
    /// Non-string values are kept in their JSON rendering. An empty document
    /// (no state yet) yields an empty snapshot.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let parsed: BTreeMap<String, RawOutput> = serde_json::from_str(raw)?;
        let mut outputs = Self::default();
        for (name, output) in parsed {
            let value = match output.value {
                JsonValue::String(s) => s,
                JsonValue::Null => continue,
                other => other.to_string(),
            };
            outputs.values.insert(name, value);
        }
        Ok(outputs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
