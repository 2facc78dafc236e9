//! HTTP client for the registry proxy.

use std::time::Duration;

use async_trait::async_trait;

/// Path of the repository listing endpoint under the proxy base URL.
pub const REPOSITORIES_ENDPOINT: &str = "/repositories";

/// Query parameter carrying the registry project index.
pub const QUERY_PARAM_PROJECT_ID: &str = "project_id";

/// Query parameter asking for per-repository details (tag counts).
pub const QUERY_PARAM_DETAIL: &str = "detail";

/// Errors from the registry proxy.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The proxy returned a non-2xx status code.
    #[error("Registry proxy error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Fetches raw repository listings from the external registry.
#[async_trait]
pub trait RepositoryRegistry: Send + Sync {
    /// Raw listing body for the registry project `project_index`.
    async fn fetch_repositories(&self, project_index: &str) -> Result<String, RegistryError>;
}

/// [`RepositoryRegistry`] backed by the registry proxy's HTTP API.
pub struct RegistryProxyClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryProxyClient {
    /// Create a client for the proxy at `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the response unchanged on success, or an
    /// [`RegistryError::Api`] carrying status and body on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RegistryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RegistryError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RepositoryRegistry for RegistryProxyClient {
    async fn fetch_repositories(&self, project_index: &str) -> Result<String, RegistryError> {
        let response = self
            .client
            .get(format!("{}{REPOSITORIES_ENDPOINT}", self.base_url))
            .query(&[(QUERY_PARAM_PROJECT_ID, project_index), (QUERY_PARAM_DETAIL, "true")])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        tracing::debug!(project_index, bytes = body.len(), "Fetched registry repositories");
        Ok(body)
    }
}
