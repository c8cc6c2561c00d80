//! Configuration module
//!
//! Builds the engine configuration from the environment, then applies
//! command-line overrides.

use anyhow::{Context, Result};
use std::path::PathBuf;
use stratus_runner::DeployConfig;

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub project_root: Option<PathBuf>,
    pub terraform_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut DeployConfig) {
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(root) = self.project_root {
            config.project_root = root;
        }
        if let Some(dir) = self.terraform_dir {
            config.terraform_dir = dir;
        }
    }
}

/// Loads and validates the configuration for this run
pub fn load(overrides: Overrides) -> Result<DeployConfig> {
    let mut config = DeployConfig::from_env();
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_environment_values() {
        let mut config = DeployConfig::from_lookup(|key| match key {
            "AWS_REGION" => Some("us-east-1".to_string()),
            _ => None,
        });

        Overrides {
            region: Some("eu-west-1".to_string()),
            project_root: Some(PathBuf::from("/srv/climatepredict")),
            terraform_dir: None,
        }
        .apply(&mut config);

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(
            config.terraform_path(),
            PathBuf::from("/srv/climatepredict/terraform")
        );
    }

    #[test]
    fn test_empty_overrides_keep_defaults() {
        let mut config = DeployConfig::from_lookup(|_| None);
        Overrides::default().apply(&mut config);
        assert_eq!(config.region, stratus_runner::config::DEFAULT_REGION);
    }
}
