//! appshell-core
//!
//! Building blocks for the appshell server:
//! - **account**: account deletion across the document and auth stores
//! - **stores**: store ports with in-memory and REST adapters
//! - **oplog**: operational log sink for reportable failures
//! - **offline**: install-time asset cache with cache-first request handling
//! - **config**: file and environment configuration

pub mod account;
pub mod config;
pub mod offline;
pub mod oplog;
pub mod stores;

pub use config::Config;
