//! Named response caches.
//!
//! `CacheStorage` opens caches by name (creating them if absent) and each
//! `Cache` maps a normalized URL to an `AssetResponse`. Two backends exist:
//!
//! - `MemoryCacheStorage`: process-local, for tests and ephemeral runs
//! - `DiskCacheStorage`: one directory per cache name, holding an
//!   `index.json` with response metadata and one body file per entry
//!
//! `put_all` is all-or-nothing for the disk backend: bodies are written
//! first and the index is swapped in with a rename, so a failed write never
//! leaves a partially populated index behind.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::response::AssetResponse;

/// Metadata file inside each cache directory
const INDEX_FILE: &str = "index.json";

/// Subdirectory holding response bodies
const BODIES_DIR: &str = "bodies";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache index: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Invalid cache name: {0}")]
    InvalidName(String),
}

#[async_trait]
pub trait Cache: Send + Sync {
    /// Exact-key lookup
    async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>, CacheError>;

    /// Store every entry, replacing existing keys
    async fn put_all(&self, entries: Vec<AssetResponse>) -> Result<(), CacheError>;

    async fn keys(&self) -> Result<Vec<String>, CacheError>;
}

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the cache called `name`, creating it if absent
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError>;
}

#[async_trait]
impl<T: CacheStorage + ?Sized> CacheStorage for Arc<T> {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError> {
        (**self).open(name).await
    }
}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, AssetResponse>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>, CacheError> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn put_all(&self, entries: Vec<AssetResponse>) -> Result<(), CacheError> {
        let mut map = self.entries.write().await;
        for entry in entries {
            map.insert(entry.url.clone(), entry);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[derive(Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<HashMap<String, Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError> {
        let cache: Arc<dyn Cache> = self
            .caches
            .lock()
            .await
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(cache)
    }
}

// ============================================================================
// Disk backend
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DiskIndex {
    next_id: u64,
    entries: HashMap<String, DiskEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskEntry {
    body_file: String,
    response: AssetResponse,
}

pub struct DiskCache {
    dir: PathBuf,
    index: Mutex<DiskIndex>,
}

impl DiskCache {
    async fn open(dir: PathBuf) -> Result<Self, CacheError> {
        fs::create_dir_all(dir.join(BODIES_DIR)).await?;

        let index = match fs::read_to_string(dir.join(INDEX_FILE)).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => DiskIndex::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    fn body_path(&self, body_file: &str) -> PathBuf {
        self.dir.join(BODIES_DIR).join(body_file)
    }

    async fn write_index(&self, index: &DiskIndex) -> Result<(), CacheError> {
        let tmp = self.dir.join(format!("{}.tmp", INDEX_FILE));
        let contents = serde_json::to_string_pretty(index)?;
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, self.dir.join(INDEX_FILE)).await?;
        Ok(())
    }

    async fn remove_files(&self, body_files: &[String]) {
        for body_file in body_files {
            if let Err(e) = fs::remove_file(self.body_path(body_file)).await {
                debug!(body_file, error = %e, "Failed to remove cache body");
            }
        }
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>, CacheError> {
        let entry = match self.index.lock().await.entries.get(url) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };

        let mut response = entry.response;
        response.body = fs::read(self.body_path(&entry.body_file)).await?;
        Ok(Some(response))
    }

    async fn put_all(&self, entries: Vec<AssetResponse>) -> Result<(), CacheError> {
        let mut index = self.index.lock().await;
        let mut staged = index.clone();
        let mut written = Vec::with_capacity(entries.len());
        let mut replaced = Vec::new();

        for entry in entries {
            let body_file = format!("{}.bin", staged.next_id);
            staged.next_id += 1;

            if let Err(e) = fs::write(self.body_path(&body_file), &entry.body).await {
                self.remove_files(&written).await;
                return Err(e.into());
            }
            written.push(body_file.clone());

            let url = entry.url.clone();
            if let Some(old) = staged.entries.insert(
                url,
                DiskEntry {
                    body_file,
                    response: entry,
                },
            ) {
                replaced.push(old.body_file);
            }
        }

        if let Err(e) = self.write_index(&staged).await {
            self.remove_files(&written).await;
            return Err(e);
        }

        // Bodies of replaced entries are unreachable once the new index is in place
        self.remove_files(&replaced).await;
        debug!(dir = ?self.dir, count = written.len(), "Cache entries written");
        *index = staged;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self.index.lock().await.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

pub struct DiskCacheStorage {
    root: PathBuf,
    caches: Mutex<HashMap<String, Arc<DiskCache>>>,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            caches: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, name: &str) -> Result<PathBuf, CacheError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && name != "."
            && name != "..";
        if !valid {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError> {
        let mut caches = self.caches.lock().await;
        if let Some(cache) = caches.get(name) {
            let cache: Arc<dyn Cache> = cache.clone();
            return Ok(cache);
        }

        let cache = Arc::new(DiskCache::open(self.cache_dir(name)?).await?);
        caches.insert(name.to_string(), cache.clone());
        let cache: Arc<dyn Cache> = cache;
        Ok(cache)
    }
}
