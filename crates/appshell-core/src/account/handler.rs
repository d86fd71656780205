use tracing::{debug, info};

use super::request::{DeletionRequest, DeletionResult, UID_REQUIRED};
use crate::oplog::LogSink;
use crate::stores::{AuthStore, DocumentStore};

/// Collection holding one profile document per user.
pub const USERS_COLLECTION: &str = "users";

/// Tag attached to operational log entries for failed deletions.
const LOG_TAG: &str = "Delete Error:";

/// Removes a user's profile document and identity record.
///
/// The two deletions have different error policies:
/// - the profile document is best-effort, any error is dropped
/// - the identity deletion is authoritative, its error fails the call
///
/// There is no transaction across the two stores. If the identity deletion
/// fails after the profile document is gone, the two stores disagree and the
/// caller sees the failure.
pub struct AccountDeletionHandler<D, A, L> {
    documents: D,
    auth: A,
    log: L,
    collection: String,
}

impl<D, A, L> AccountDeletionHandler<D, A, L>
where
    D: DocumentStore,
    A: AuthStore,
    L: LogSink,
{
    pub fn new(documents: D, auth: A, log: L) -> Self {
        Self {
            documents,
            auth,
            log,
            collection: USERS_COLLECTION.to_string(),
        }
    }

    /// Use a different profile collection
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub async fn delete_user_by_uid(&self, request: &DeletionRequest) -> DeletionResult {
        let Some(uid) = request.valid_uid() else {
            debug!("Deletion rejected: missing uid");
            return DeletionResult::failure(UID_REQUIRED);
        };

        self.delete_profile(uid).await;

        match self.auth.delete_user(uid).await {
            Ok(()) => {
                info!(uid, "User deleted");
                DeletionResult::Success
            }
            Err(e) if e.is_not_found() => {
                // Identity already gone: a repeated call converges on the same end state
                info!(uid, "Identity already absent, treating as deleted");
                DeletionResult::Success
            }
            Err(e) => {
                self.log.error(LOG_TAG, &e);
                DeletionResult::failure(e.to_string())
            }
        }
    }

    async fn delete_profile(&self, uid: &str) {
        if let Err(e) = self.documents.delete(&self.collection, uid).await {
            debug!(uid, collection = %self.collection, error = %e, "Ignoring profile delete failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oplog::MemoryLogSink;
    use crate::stores::{MemoryAuthStore, MemoryDocumentStore};
    use serde_json::json;

    type TestHandler = AccountDeletionHandler<MemoryDocumentStore, MemoryAuthStore, MemoryLogSink>;

    async fn handler_with_user(uid: &str) -> TestHandler {
        let documents = MemoryDocumentStore::new();
        documents.insert("users", uid, json!({"displayName": "Test"})).await;
        let auth = MemoryAuthStore::new();
        auth.insert(uid).await;
        AccountDeletionHandler::new(documents, auth, MemoryLogSink::new())
    }

    #[tokio::test]
    async fn test_missing_uid_touches_no_store() {
        let handler = handler_with_user("abc123").await;

        for request in [DeletionRequest::default(), DeletionRequest::new("")] {
            let result = handler.delete_user_by_uid(&request).await;
            assert_eq!(result, DeletionResult::failure("UID is required"));
        }

        assert_eq!(handler.documents().delete_calls(), 0);
        assert_eq!(handler.auth().delete_calls(), 0);
        assert!(handler.log().entries().is_empty());
    }

    #[tokio::test]
    async fn test_success_removes_both_records() {
        let handler = handler_with_user("abc123").await;

        let result = handler.delete_user_by_uid(&DeletionRequest::new("abc123")).await;
        assert_eq!(result, DeletionResult::Success);
        assert!(!handler.documents().contains("users", "abc123").await);
        assert!(!handler.auth().contains("abc123").await);
        assert!(handler.log().entries().is_empty());
    }

    #[tokio::test]
    async fn test_profile_failure_is_swallowed() {
        let handler = handler_with_user("abc123").await;
        handler.documents().fail_with("document store down");

        let result = handler.delete_user_by_uid(&DeletionRequest::new("abc123")).await;
        assert!(result.is_success());
        // Profile survives, identity is gone
        assert!(handler.documents().contains("users", "abc123").await);
        assert!(!handler.auth().contains("abc123").await);
        assert!(handler.log().entries().is_empty());
    }

    #[tokio::test]
    async fn test_identity_failure_is_reported_and_logged_once() {
        let handler = handler_with_user("abc123").await;
        handler.auth().fail_with("quota exceeded");

        let result = handler.delete_user_by_uid(&DeletionRequest::new("abc123")).await;
        assert_eq!(
            result,
            DeletionResult::failure("Store unavailable: quota exceeded")
        );

        let entries = handler.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tag, "Delete Error:");
        assert_eq!(entries[0].message, "Store unavailable: quota exceeded");

        // Profile was removed before the identity step failed
        assert!(!handler.documents().contains("users", "abc123").await);
        assert!(handler.auth().contains("abc123").await);
    }

    #[tokio::test]
    async fn test_profile_step_runs_before_identity_step() {
        let handler = handler_with_user("abc123").await;
        handler.auth().fail_with("down");

        handler.delete_user_by_uid(&DeletionRequest::new("abc123")).await;
        assert_eq!(handler.documents().delete_calls(), 1);
        assert_eq!(handler.auth().delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_repeated_deletion_succeeds() {
        let handler = handler_with_user("abc123").await;
        let request = DeletionRequest::new("abc123");

        assert_eq!(handler.delete_user_by_uid(&request).await, DeletionResult::Success);
        assert_eq!(handler.delete_user_by_uid(&request).await, DeletionResult::Success);
        assert_eq!(handler.auth().delete_calls(), 2);
        assert!(handler.log().entries().is_empty());
    }

    #[tokio::test]
    async fn test_custom_collection() {
        let documents = MemoryDocumentStore::new();
        documents.insert("profiles", "u1", json!({})).await;
        let auth = MemoryAuthStore::new();
        auth.insert("u1").await;
        let handler = AccountDeletionHandler::new(documents, auth, MemoryLogSink::new())
            .with_collection("profiles");

        handler.delete_user_by_uid(&DeletionRequest::new("u1")).await;
        assert!(!handler.documents().contains("profiles", "u1").await);
    }
}
