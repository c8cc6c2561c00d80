//! Error types for deployment runs

use stratus_client::ClientError;
use stratus_core::domain::stage::Stage;
use stratus_core::domain::teardown::TeardownState;
use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Errors that can occur while deploying or tearing down
#[derive(Debug, Error)]
pub enum DeployError {
    /// A required tool, credential or daemon is unavailable
    #[error("precondition failed: {check}: {detail}")]
    Precondition {
        /// Name of the check, e.g. "AWS credentials (aws sts get-caller-identity)"
        check: String,
        detail: String,
    },

    /// The program could not be started at all
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command exited with a non-zero status
    #[error("command `{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        /// Rendered command line with secrets redacted
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// A pipeline stage failed; later stages were not run
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<DeployError>,
    },

    /// A Terraform output needed by a stage is absent
    #[error("terraform output '{0}' is missing (has the infrastructure been provisioned?)")]
    MissingOutput(String),

    /// Tool output could not be parsed
    #[error("failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    /// The health endpoint answered, and the answer was a failure
    #[error("health check failed at {url}: {source}")]
    Unhealthy {
        url: String,
        #[source]
        source: ClientError,
    },

    /// The health endpoint never became ready within the retry budget
    #[error("{url} was not ready after {attempts} attempt(s); last error: {last_error}")]
    VerificationTimeout {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// The operator did not confirm a teardown gate
    #[error("teardown declined at {gate}; no resources were touched")]
    TeardownDeclined { gate: &'static str },

    /// A teardown operation was called out of order
    #[error("cannot {operation} while teardown is in state {state}")]
    InvalidState {
        operation: &'static str,
        state: TeardownState,
    },

    /// The confirmation token was not issued for the current destroy plan
    #[error("confirmation token does not match the current destroy plan")]
    InvalidToken,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    pub fn precondition(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Precondition {
            check: check.into(),
            detail: detail.into(),
        }
    }

    pub fn parse(what: impl Into<String>, detail: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    /// Wraps this error as the failure of `stage`
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::StageFailed { .. } => already,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage that failed, if this error aborted a pipeline
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Check if this error happened before any stage ran
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }

    /// Check if this is a verification timeout, as opposed to a genuine failure
    pub fn is_verification_timeout(&self) -> bool {
        match self {
            Self::VerificationTimeout { .. } => true,
            Self::StageFailed { source, .. } => source.is_verification_timeout(),
            _ => false,
        }
    }
}
