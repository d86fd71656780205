//! Collaborator stores touched by account deletion.
//!
//! This module defines the two ports the deletion handler talks to:
//! - `DocumentStore`: per-record profile documents grouped in collections
//! - `AuthStore`: identity records keyed by uid
//!
//! Adapters are provided for an in-memory backend (tests, local runs) and a
//! REST backend reached over `reqwest`.

pub mod error;
pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::StoreError;
pub use memory::{MemoryAuthStore, MemoryDocumentStore};
pub use rest::{RestAuthStore, RestDocumentStore};

/// Schemaless document store addressed by collection and document id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Delete one document. Deleting a document that does not exist succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Identity store holding one record per user.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Delete one identity. A missing identity is `StoreError::NotFound`.
    async fn delete_user(&self, uid: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        (**self).delete(collection, id).await
    }
}

#[async_trait]
impl<T: AuthStore + ?Sized> AuthStore for Arc<T> {
    async fn delete_user(&self, uid: &str) -> Result<(), StoreError> {
        (**self).delete_user(uid).await
    }
}
