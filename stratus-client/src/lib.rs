//! Stratus HTTP Client
//!
//! A small HTTP client for probing the health endpoint of the deployed
//! application through its load balancer.
//!
//! # Example
//!
//! ```no_run
//! use stratus_client::HealthClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HealthClient::new("http://climate-alb-1.ap-south-1.elb.amazonaws.com");
//!     client.probe("/_stcore/health").await?;
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ClientError, Result};

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the application health endpoint
#[derive(Debug, Clone)]
pub struct HealthClient {
    /// Base URL of the application (e.g., "http://my-alb.elb.amazonaws.com")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl HealthClient {
    /// Create a new health client
    ///
    /// A bare host name is given an `http://` scheme, since the load
    /// balancer listens on plain HTTP.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a health client whose requests time out after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a new health client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url
        } else {
            format!("http://{}", base_url)
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the application
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a path on the application
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue a single GET against `path`
    ///
    /// Succeeds on any 2xx status. Use [`ClientError::is_not_ready`] to tell
    /// a target that is still starting from one that is broken.
    pub async fn probe(&self, path: &str) -> Result<()> {
        if !path.starts_with('/') {
            return Err(ClientError::InvalidRequest(format!(
                "health path must start with '/': {}",
                path
            )));
        }

        let url = self.url(path);
        debug!("Probing {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::unexpected_status(status.as_u16(), body));
        }

        debug!("Probe of {} returned {}", url, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use std::net::SocketAddr;

    async fn spawn_app() -> SocketAddr {
        let app = Router::new()
            .route("/_stcore/health", get(|| async { "ok" }))
            .route(
                "/starting",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "starting") }),
            )
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model load failed") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_client_adds_scheme() {
        let client = HealthClient::new("my-alb.elb.amazonaws.com/");
        assert_eq!(client.base_url(), "http://my-alb.elb.amazonaws.com");
        assert_eq!(
            client.url("/_stcore/health"),
            "http://my-alb.elb.amazonaws.com/_stcore/health"
        );
    }

    #[test]
    fn test_client_keeps_explicit_scheme() {
        let client = HealthClient::new("https://example.com");
        assert_eq!(client.base_url(), "https://example.com");
    }

    #[tokio::test]
    async fn test_probe_healthy() {
        let addr = spawn_app().await;
        let client = HealthClient::new(addr.to_string());
        client.probe("/_stcore/health").await.unwrap();
    }

    #[tokio::test]
    async fn test_probe_starting_is_not_ready() {
        let addr = spawn_app().await;
        let client = HealthClient::new(addr.to_string());
        let err = client.probe("/starting").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn test_probe_broken_is_failure() {
        let addr = spawn_app().await;
        let client = HealthClient::new(addr.to_string());
        let err = client.probe("/broken").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_not_ready());
    }

    #[tokio::test]
    async fn test_probe_refused_is_not_ready() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HealthClient::new(addr.to_string());
        let err = client.probe("/_stcore/health").await.unwrap_err();
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn test_probe_rejects_relative_path() {
        let client = HealthClient::new("localhost:1");
        let err = client.probe("health").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
