//! Offline asset cache.
//!
//! This module plays the part of a caching service worker for the served web
//! app. On install it fetches the app shell (a fixed seed list plus every key
//! of the build's asset manifest) into the `offline-cache-v1` cache. After
//! that each request resolves cache-first, then from the network, and finally
//! from the cached `/index.html` when the network is down.

pub mod assets;
pub mod cache;
pub mod manager;
pub mod network;
pub mod response;

pub use assets::{normalize_url, AssetList, SEED_ASSETS};
pub use cache::{Cache, CacheError, CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use manager::{
    FetchError, InstallError, OfflineCacheManager, Resolution, Strategy, WorkerState, CACHE_NAME,
    FALLBACK_PAGE,
};
pub use network::{HttpNetwork, Network, NetworkError};
pub use response::{AssetResponse, FetchRequest};
