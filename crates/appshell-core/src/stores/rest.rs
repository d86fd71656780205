//! REST adapters for the document and auth stores.
//!
//! Both adapters share one `reqwest::Client` (cheap to clone, pooled
//! connections) and authenticate with an optional bearer token.
//!
//! Routes:
//! - documents: `DELETE {base}/{collection}/{id}`
//! - identities: `DELETE {base}/users/{uid}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use super::{AuthStore, DocumentStore, StoreError};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
struct RestClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl RestClient {
    fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Self::parse_base(base_url)?,
            token,
        })
    }

    /// Ensure the base ends in a slash so joined segments append instead of replace
    fn parse_base(base_url: &str) -> anyhow::Result<Url> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Url::parse(&normalized)
            .map_err(|e| anyhow::anyhow!("Invalid store base URL {}: {}", base_url, e))
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn delete(&self, url: Url) -> Result<Response, StoreError> {
        let mut request = self.client.delete(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, StoreError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::from_status(status, &body))
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Document store reached over HTTP. A 404 on delete counts as success.
#[derive(Clone)]
pub struct RestDocumentStore {
    inner: RestClient,
}

impl RestDocumentStore {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            inner: RestClient::new(base_url, token)?,
        })
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.inner.url_for(&[collection, id])?;
        let response = self.inner.delete(url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection, id, "Document already absent");
            return Ok(());
        }

        RestClient::check_response(response).await?;
        Ok(())
    }
}

// ============================================================================
// Identities
// ============================================================================

/// Identity store reached over HTTP. A 404 on delete is `StoreError::NotFound`.
#[derive(Clone)]
pub struct RestAuthStore {
    inner: RestClient,
}

impl RestAuthStore {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            inner: RestClient::new(base_url, token)?,
        })
    }
}

#[async_trait]
impl AuthStore for RestAuthStore {
    async fn delete_user(&self, uid: &str) -> Result<(), StoreError> {
        let url = self.inner.url_for(&["users", uid])?;
        let response = self.inner.delete(url).await?;
        RestClient::check_response(response).await?;
        Ok(())
    }
}
