use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assets::normalize_url;

/// A resource request as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    /// Path and query relative to the served origin, e.g. `/assets/logo.png?v=2`
    pub url: String,
    pub body: Vec<u8>,
}

impl FetchRequest {
    pub fn get(url: &str) -> Self {
        Self::new("GET", url, Vec::new())
    }

    pub fn new(method: &str, url: &str, body: Vec<u8>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: normalize_url(url),
            body,
        }
    }

    /// Only GET requests are answered from the cache
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }
}

/// Stored or live response for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl AssetResponse {
    pub fn new(url: &str, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            url: normalize_url(url),
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        }
    }

    pub fn ok(url: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(url, 200, Vec::new(), body.into())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
