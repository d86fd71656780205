//! Live network access for the offline cache.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use thiserror::Error;
use tracing::debug;

use super::assets::normalize_url;
use super::response::{AssetResponse, FetchRequest};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Headers that describe the upstream connection rather than the resource.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
];

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    #[error("Offline")]
    Offline,
}

/// Anything that can turn a request into a live response.
///
/// Only transport failures are errors; an HTTP error status is still a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<AssetResponse, NetworkError>;
}

#[async_trait]
impl<T: Network + ?Sized> Network for std::sync::Arc<T> {
    async fn fetch(&self, request: &FetchRequest) -> Result<AssetResponse, NetworkError> {
        (**self).fetch(request).await
    }
}

/// Fetches from a fixed upstream origin.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let origin = Url::parse(origin)
            .map_err(|e| anyhow::anyhow!("Invalid upstream origin {}: {}", origin, e))?;

        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Target on the configured origin for a request key. Never leaves the origin.
    fn resolve(&self, url: &str) -> Result<Url, NetworkError> {
        let key = normalize_url(url);
        let (path, query) = match key.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (key.as_str(), None),
        };

        let mut target = self.origin.clone();
        target.set_path(path);
        target.set_query(query);
        target.set_fragment(None);

        if target.origin() != self.origin.origin() {
            return Err(NetworkError::InvalidUrl {
                url: url.to_string(),
                reason: format!("resolves outside {}", self.origin),
            });
        }
        Ok(target)
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<AssetResponse, NetworkError> {
        let target = self.resolve(&request.url)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, target);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !HOP_BY_HOP_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Network fetch");
        Ok(AssetResponse::new(&request.url, status, headers, body))
    }
}
