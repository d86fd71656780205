//! Account deletion.
//!
//! This module provides the `AccountDeletionHandler`, which removes a user's
//! profile document (best-effort) and identity record (authoritative) and
//! reports a structured `DeletionResult`.

pub mod handler;
pub mod request;

pub use handler::{AccountDeletionHandler, USERS_COLLECTION};
pub use request::{DeletionRequest, DeletionResult, UID_REQUIRED};
