//! Offline-first request interception.

use std::fmt;

use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::assets::{normalize_url, AssetList};
use super::cache::{CacheError, CacheStorage};
use super::network::{Network, NetworkError};
use super::response::{AssetResponse, FetchRequest};

// ============================================================================
// Constants
// ============================================================================

/// Name of the cache every install writes to.
pub const CACHE_NAME: &str = "offline-cache-v1";

/// Page served when a request misses the cache and the network is down.
pub const FALLBACK_PAGE: &str = "/index.html";

/// Maximum concurrent fetches while populating the cache.
const MAX_CONCURRENT_FETCHES: usize = 8;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installing,
    /// Installed but not yet controlling requests
    Waiting,
    Active,
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("An install is already in progress")]
    AlreadyInstalling,

    #[error("Failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("Fetching {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} is not cached, the network failed ({cause}), and no fallback page is cached")]
    FallbackMissing { url: String, cause: String },
}

/// Resolution steps, tried in order until one produces a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheMatch,
    Network,
    FallbackPage,
}

const STRATEGIES: [Strategy; 3] = [Strategy::CacheMatch, Strategy::Network, Strategy::FallbackPage];

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::CacheMatch => "cache",
            Strategy::Network => "network",
            Strategy::FallbackPage => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: AssetResponse,
    pub served_by: Strategy,
}

// ============================================================================
// Manager
// ============================================================================

/// Pre-caches the app shell on install and answers requests cache-first.
///
/// Cached entries are served without revalidation. Live network responses are
/// never written back, so the cache only grows at install time.
pub struct OfflineCacheManager<S, N> {
    storage: S,
    network: N,
    cache_name: String,
    fallback_url: String,
    skip_waiting: bool,
    state: Mutex<WorkerState>,
}

impl<S, N> OfflineCacheManager<S, N>
where
    S: CacheStorage,
    N: Network,
{
    pub fn new(storage: S, network: N) -> Self {
        Self {
            storage,
            network,
            cache_name: CACHE_NAME.to_string(),
            fallback_url: FALLBACK_PAGE.to_string(),
            skip_waiting: true,
            state: Mutex::new(WorkerState::Uninstalled),
        }
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_fallback(mut self, url: &str) -> Self {
        self.fallback_url = normalize_url(url);
        self
    }

    /// When false, a finished install waits for `activate` instead of taking over
    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    /// Populate the cache with the seed list followed by `assets`.
    ///
    /// Every URL must fetch with a 2xx status or nothing is stored and the
    /// previous state is restored.
    pub async fn install(&self, assets: &AssetList) -> Result<(), InstallError> {
        let previous = {
            let mut state = self.state.lock().await;
            if *state == WorkerState::Installing {
                return Err(InstallError::AlreadyInstalling);
            }
            std::mem::replace(&mut *state, WorkerState::Installing)
        };

        let urls = AssetList::with_seed(assets);
        info!(cache = %self.cache_name, count = urls.len(), "Installing offline cache");

        match self.populate(&urls).await {
            Ok(()) => {
                let next = if self.skip_waiting {
                    WorkerState::Active
                } else {
                    WorkerState::Waiting
                };
                *self.state.lock().await = next;
                info!(state = ?next, "Offline cache installed");
                Ok(())
            }
            Err(e) => {
                *self.state.lock().await = previous;
                warn!(error = %e, "Offline cache install failed");
                Err(e)
            }
        }
    }

    async fn populate(&self, urls: &AssetList) -> Result<(), InstallError> {
        let cache = self.storage.open(&self.cache_name).await?;

        // Owned items keep the install future Send for tokio::spawn
        let urls: Vec<String> = urls.iter().map(str::to_owned).collect();
        let responses: Vec<AssetResponse> = stream::iter(urls)
            .map(|url| async move {
                let response = match self.network.fetch(&FetchRequest::get(&url)).await {
                    Ok(response) => response,
                    Err(source) => return Err(InstallError::Network { url, source }),
                };
                if !response.is_success() {
                    return Err(InstallError::BadStatus {
                        url,
                        status: response.status,
                    });
                }
                Ok(response)
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .try_collect()
            .await?;

        cache.put_all(responses).await?;
        Ok(())
    }

    /// Promote a waiting install. Returns whether anything changed.
    pub async fn activate(&self) -> bool {
        let mut state = self.state.lock().await;
        if *state == WorkerState::Waiting {
            *state = WorkerState::Active;
            info!("Offline cache activated");
            true
        } else {
            false
        }
    }

    /// Answer one request: cache, then network, then the cached fallback page.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<Resolution, FetchError> {
        let mut network_error: Option<NetworkError> = None;

        for strategy in STRATEGIES {
            let response = match strategy {
                Strategy::CacheMatch if request.is_cacheable() => self.lookup(&request.url).await,
                Strategy::CacheMatch => None,
                Strategy::Network => match self.network.fetch(request).await {
                    Ok(response) => Some(response),
                    Err(e) => {
                        debug!(url = %request.url, error = %e, "Network failed, trying fallback");
                        network_error = Some(e);
                        None
                    }
                },
                Strategy::FallbackPage => self.lookup(&self.fallback_url).await,
            };

            if let Some(response) = response {
                debug!(url = %request.url, served_by = %strategy, "Request resolved");
                return Ok(Resolution {
                    response,
                    served_by: strategy,
                });
            }
        }

        let cause = network_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        warn!(url = %request.url, %cause, "No response available");
        Err(FetchError::FallbackMissing {
            url: request.url.clone(),
            cause,
        })
    }

    /// Cache read errors count as a miss
    async fn lookup(&self, url: &str) -> Option<AssetResponse> {
        let cache = match self.storage.open(&self.cache_name).await {
            Ok(cache) => cache,
            Err(e) => {
                warn!(cache = %self.cache_name, error = %e, "Failed to open cache");
                return None;
            }
        };

        match cache.match_url(url).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(url, error = %e, "Failed to read cache entry");
                None
            }
        }
    }
}
