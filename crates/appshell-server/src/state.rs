use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use appshell_core::account::AccountDeletionHandler;
use appshell_core::offline::{
    AssetList, CacheStorage, DiskCacheStorage, HttpNetwork, Network, OfflineCacheManager,
};
use appshell_core::oplog::{LogSink, TracingLogSink};
use appshell_core::stores::{
    AuthStore, DocumentStore, MemoryAuthStore, MemoryDocumentStore, RestAuthStore,
    RestDocumentStore,
};
use appshell_core::Config;

pub type DeletionHandler =
    AccountDeletionHandler<Arc<dyn DocumentStore>, Arc<dyn AuthStore>, Arc<dyn LogSink>>;

pub type OfflineCache = OfflineCacheManager<Arc<dyn CacheStorage>, Arc<dyn Network>>;

pub struct AppState {
    pub deletion: DeletionHandler,
    pub offline: OfflineCache,
    /// Caps callable invocations in flight
    pub limiter: Semaphore,
}

impl AppState {
    pub fn new(deletion: DeletionHandler, offline: OfflineCache, max_instances: usize) -> Arc<Self> {
        Arc::new(Self {
            deletion,
            offline,
            limiter: Semaphore::new(max_instances),
        })
    }

    /// Wire stores, cache and network from configuration
    pub fn from_config(config: &Config) -> Result<Arc<Self>> {
        let documents: Arc<dyn DocumentStore> = match config.document_url {
            Some(ref url) => Arc::new(
                RestDocumentStore::new(url, config.token.clone())
                    .context("Failed to create document store client")?,
            ),
            None => {
                warn!("No document store URL configured, using in-memory store");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        let auth: Arc<dyn AuthStore> = match config.auth_url {
            Some(ref url) => Arc::new(
                RestAuthStore::new(url, config.token.clone())
                    .context("Failed to create auth store client")?,
            ),
            None => {
                warn!("No auth store URL configured, using in-memory store");
                Arc::new(MemoryAuthStore::new())
            }
        };

        let log: Arc<dyn LogSink> = Arc::new(TracingLogSink);
        let deletion = AccountDeletionHandler::new(documents, auth, log)
            .with_collection(config.users_collection.clone());

        let cache_dir = config.cache_dir()?;
        let storage: Arc<dyn CacheStorage> = Arc::new(
            DiskCacheStorage::new(cache_dir.clone())
                .with_context(|| format!("Failed to open cache directory: {}", cache_dir.display()))?,
        );
        let network: Arc<dyn Network> = Arc::new(
            HttpNetwork::new(&config.origin).context("Failed to create upstream client")?,
        );
        info!(origin = %config.origin, ?cache_dir, "Offline cache configured");

        Ok(Self::new(
            deletion,
            OfflineCacheManager::new(storage, network),
            config.max_instances,
        ))
    }
}

/// Asset list from the configured build manifest, empty when none is set
pub fn manifest_assets(config: &Config) -> Result<AssetList> {
    match config.manifest_path {
        Some(ref path) => AssetList::load_manifest(path),
        None => Ok(AssetList::default()),
    }
}
