//! Error types for the Stratus health client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when probing the deployed application
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status code
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an unexpected-status error, keeping at most 200 bytes of body
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 200 {
            let mut cut = 200;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::UnexpectedStatus { status, body }
    }

    /// Check if the failure means "not routable yet" rather than "broken"
    ///
    /// Connection failures, timeouts and the gateway statuses a load balancer
    /// returns while targets register (502, 503, 504) all count as not ready.
    pub fn is_not_ready(&self) -> bool {
        match self {
            Self::RequestFailed(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::UnexpectedStatus { status, .. } => matches!(status, 502..=504),
            Self::InvalidRequest(_) => false,
        }
    }

    /// HTTP status code, if the endpoint answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
