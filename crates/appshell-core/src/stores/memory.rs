//! In-memory store adapters.
//!
//! Both stores keep their records behind a tokio `RwLock` and count calls so
//! tests can assert which collaborators were touched. A failure can be armed
//! with `fail_with`, after which every call returns `StoreError::Unavailable`
//! until `clear_failure` is called.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AuthStore, DocumentStore, StoreError};

#[derive(Debug, Default)]
struct FailureSwitch {
    message: Mutex<Option<String>>,
}

impl FailureSwitch {
    fn arm(&self, message: &str) {
        if let Ok(mut slot) = self.message.lock() {
            *slot = Some(message.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.message.lock() {
            *slot = None;
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.message.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(message) => Err(StoreError::Unavailable(message.clone())),
                None => Ok(()),
            },
            Err(_) => Err(StoreError::Unavailable("failure switch poisoned".to_string())),
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
    deletes: AtomicUsize,
    failure: FailureSwitch,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, id: &str, document: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    pub async fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.contains_key(id))
            .unwrap_or(false)
    }

    /// Number of delete calls received, successful or not
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, message: &str) {
        self.failure.arm(message);
    }

    pub fn clear_failure(&self) {
        self.failure.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.failure.check()?;

        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        debug!(collection, id, removed, "Document delete");
        Ok(())
    }
}

// ============================================================================
// Identities
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    users: RwLock<HashSet<String>>,
    deletes: AtomicUsize,
    failure: FailureSwitch,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, uid: &str) {
        self.users.write().await.insert(uid.to_string());
    }

    pub async fn contains(&self, uid: &str) -> bool {
        self.users.read().await.contains(uid)
    }

    /// Number of delete calls received, successful or not
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, message: &str) {
        self.failure.arm(message);
    }

    pub fn clear_failure(&self) {
        self.failure.clear();
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn delete_user(&self, uid: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.failure.check()?;

        if self.users.write().await.remove(uid) {
            debug!(uid, "Identity deleted");
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("no user record for uid {}", uid)))
        }
    }
}
