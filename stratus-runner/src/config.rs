//! Deployment configuration
//!
//! Defines all configurable parameters of a deployment run: target region,
//! where the Terraform configuration and Dockerfile live, which local
//! directories are mirrored to object storage, which credentials are
//! provisioned, and the verification retry policy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stratus_core::domain::infra::keys;

use crate::error::{DeployError, Result};

/// Region used when neither `AWS_REGION` nor `AWS_DEFAULT_REGION` is set
pub const DEFAULT_REGION: &str = "ap-south-1";

/// Streamlit's built-in health endpoint
pub const DEFAULT_HEALTH_PATH: &str = "/_stcore/health";

/// Deployment configuration
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// AWS region every `aws` call targets
    pub region: String,

    /// Repository root; the Docker build context and asset paths are relative to it
    pub project_root: PathBuf,

    /// Terraform configuration directory, relative to the project root unless absolute
    pub terraform_dir: PathBuf,

    /// Dockerfile, relative to the project root unless absolute
    pub dockerfile: PathBuf,

    /// Path probed on the load balancer after a rollout
    pub health_path: String,

    /// Retry policy of the verification stage
    pub verify: VerifyPolicy,

    /// Local directories mirrored to object storage
    pub asset_dirs: Vec<AssetDir>,

    /// Optional third-party API credentials written to the secret store
    pub credentials: Vec<Credential>,
}

/// Verification retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyPolicy {
    /// Wait before the first probe so the load balancer can route to new tasks
    pub grace_period: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Per-request timeout
    pub probe_timeout: Duration,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(30),
            max_attempts: 10,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

impl VerifyPolicy {
    /// Delay before attempt `attempt + 1`, doubling from the initial backoff
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// A policy with no waiting at all
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            grace_period: Duration::ZERO,
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            probe_timeout: Duration::from_secs(1),
        }
    }
}

/// How the contents of an asset directory are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLayout {
    /// Opaque files, synced as-is
    Plain,
    /// `<City>/model_info_<City>.json` plus per-target model and scaler files
    CityModels,
}

/// A local directory mirrored under a bucket prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDir {
    pub local: PathBuf,
    pub prefix: String,
    pub layout: AssetLayout,
}

impl AssetDir {
    pub fn new(local: impl Into<PathBuf>, prefix: impl Into<String>, layout: AssetLayout) -> Self {
        Self {
            local: local.into(),
            prefix: prefix.into(),
            layout,
        }
    }
}

/// An optional API credential sourced from the environment
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Environment variable the value is read from
    pub env_var: String,
    /// Terraform output naming the secret the value is written to
    pub output_key: String,
    pub value: Option<String>,
}

impl Credential {
    pub fn new(env_var: impl Into<String>, output_key: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            output_key: output_key.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The value, if set and non-empty
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("env_var", &self.env_var)
            .field("output_key", &self.output_key)
            .field("value", &self.value().map(|_| "****"))
            .finish()
    }
}

impl DeployConfig {
    /// Creates a configuration with defaults rooted at `project_root`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            project_root: project_root.into(),
            terraform_dir: PathBuf::from("terraform"),
            dockerfile: PathBuf::from("Dockerfile"),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            verify: VerifyPolicy::default(),
            asset_dirs: vec![
                AssetDir::new("models", "models", AssetLayout::CityModels),
                AssetDir::new("data", "data", AssetLayout::Plain),
            ],
            credentials: vec![
                Credential::new("GOOGLE_API_KEY", keys::GOOGLE_API_KEY_SECRET),
                Credential::new("OPENWEATHER_API_KEY", keys::OPENWEATHER_API_KEY_SECRET),
            ],
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - AWS_REGION, falling back to AWS_DEFAULT_REGION (default: ap-south-1)
    /// - STRATUS_PROJECT_ROOT (default: .)
    /// - STRATUS_TERRAFORM_DIR (default: terraform)
    /// - STRATUS_DOCKERFILE (default: Dockerfile)
    /// - STRATUS_HEALTH_PATH (default: /_stcore/health)
    /// - STRATUS_VERIFY_GRACE_SECS (default: 30)
    /// - STRATUS_VERIFY_ATTEMPTS (default: 10)
    /// - STRATUS_PROBE_TIMEOUT_SECS (default: 10)
    /// - GOOGLE_API_KEY, OPENWEATHER_API_KEY
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let root = lookup("STRATUS_PROJECT_ROOT").unwrap_or_else(|| ".".to_string());
        let mut config = Self::new(root);

        if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            config.region = region;
        }
        if let Some(dir) = lookup("STRATUS_TERRAFORM_DIR") {
            config.terraform_dir = PathBuf::from(dir);
        }
        if let Some(dockerfile) = lookup("STRATUS_DOCKERFILE") {
            config.dockerfile = PathBuf::from(dockerfile);
        }
        if let Some(path) = lookup("STRATUS_HEALTH_PATH") {
            config.health_path = path;
        }
        if let Some(secs) = lookup("STRATUS_VERIFY_GRACE_SECS").and_then(|s| s.parse::<u64>().ok())
        {
            config.verify.grace_period = Duration::from_secs(secs);
        }
        if let Some(attempts) =
            lookup("STRATUS_VERIFY_ATTEMPTS").and_then(|s| s.parse::<u32>().ok())
        {
            config.verify.max_attempts = attempts;
        }
        if let Some(secs) =
            lookup("STRATUS_PROBE_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok())
        {
            config.verify.probe_timeout = Duration::from_secs(secs);
        }

        for credential in &mut config.credentials {
            credential.value = lookup(&credential.env_var);
        }

        config
    }

    /// Resolves a path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn terraform_path(&self) -> PathBuf {
        self.resolve(&self.terraform_dir)
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.resolve(&self.dockerfile)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(DeployError::Config("region cannot be empty".to_string()));
        }

        if !self.health_path.starts_with('/') {
            return Err(DeployError::Config(format!(
                "health path must start with '/': {}",
                self.health_path
            )));
        }

        if self.verify.max_attempts == 0 {
            return Err(DeployError::Config(
                "verification attempts must be greater than 0".to_string(),
            ));
        }

        if self.verify.probe_timeout.is_zero() {
            return Err(DeployError::Config(
                "probe timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
