//! Record and Identity Stores
//!
//! Abstracts persistence behind two traits so the ingestion gateway and the
//! retention sweeper can be wired against fakes or an in-memory database in
//! tests:
//!
//! - `RecordStore`: append-only log record persistence with
//!   query-by-owner-and-time and delete-by-owner-and-cutoff.
//! - `IdentityStore`: lookup and settings for owner identities. Tokens are
//!   resolved by exact equality against either the primary or the alias
//!   column.
//!
//! Both are implemented by `SqliteStore` over a single connection pool.

use async_trait::async_trait;
use thiserror::Error;

use loghub_core::{LogRecord, OwnerIdentity};

pub mod sqlite;

pub use sqlite::SqliteStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("alias token already in use: {0}")]
    AliasTaken(String),

    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Append-only persistence for log records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record. Exactly one row per call; failures surface to the
    /// caller and are never retried silently.
    async fn append(&self, record: &LogRecord) -> Result<()>;

    /// The most recent records for an owner, newest first, bounded by
    /// `limit`.
    async fn recent_for_owner(&self, owner_id: &str, limit: u32) -> Result<Vec<LogRecord>>;

    /// Delete every record for `owner_id` with a timestamp strictly before
    /// `cutoff_ms`. Returns the number of rows removed.
    async fn delete_before(&self, owner_id: &str, cutoff_ms: i64) -> Result<u64>;
}

/// Lookup and settings for owner identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create an owner with a freshly generated primary token.
    async fn create_owner(&self, username: &str) -> Result<OwnerIdentity>;

    /// Find an owner by account label.
    async fn find_by_username(&self, username: &str) -> Result<Option<OwnerIdentity>>;

    /// Resolve a token against both the primary and the alias column.
    async fn find_by_token(&self, token: &str) -> Result<Option<OwnerIdentity>>;

    /// Set or clear the custom alias token. Fails with `AliasTaken` when
    /// another owner already holds the alias.
    async fn set_alias(&self, owner_id: &str, alias: Option<String>) -> Result<OwnerIdentity>;

    /// Set the retention window in days. Zero is normalized to `None`
    /// (retain forever).
    async fn set_retention(&self, owner_id: &str, days: Option<u32>) -> Result<OwnerIdentity>;

    /// Every owner with a positive retention window configured.
    async fn owners_with_retention(&self) -> Result<Vec<OwnerIdentity>>;
}
