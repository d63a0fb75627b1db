//! SQLite Store Implementation
//!
//! Implements `RecordStore` and `IdentityStore` over a single SQLx
//! connection pool. SQLite fits the single-node deployment: embedded, zero
//! configuration, and fast enough for the write rates this service sees.
//!
//! Timestamps are stored as i64 milliseconds since epoch. Record metadata
//! is stored as JSON text. The schema is created on open, so no external
//! migration step is required.
//!
//! `new_in_memory()` builds an isolated throwaway database for tests.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use loghub_core::{LogLevel, LogRecord, OwnerIdentity};

use super::{IdentityStore, RecordStore, Result, StoreError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS owners (
        id             TEXT PRIMARY KEY,
        username       TEXT NOT NULL UNIQUE,
        owner_token    TEXT NOT NULL UNIQUE,
        alias_token    TEXT UNIQUE,
        retention_days INTEGER,
        created_at     INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS records (
        id        TEXT PRIMARY KEY,
        owner_id  TEXT NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
        level     TEXT NOT NULL,
        message   TEXT NOT NULL,
        service   TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        meta      TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_records_owner_time ON records(owner_id, timestamp)",
];

/// SQLite-backed record and identity store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", path.as_ref().display()))?
                .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        Self::init(pool).await
    }

    /// Create an in-memory database (for testing). A single connection is
    /// used so the database lives as long as the pool.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    async fn owner_by_id(&self, owner_id: &str) -> Result<OwnerIdentity> {
        let row = sqlx::query("SELECT * FROM owners WHERE id = ?1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::OwnerNotFound(owner_id.to_string()))?;
        owner_from_row(&row)
    }
}

fn owner_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<OwnerIdentity> {
    let retention_days: Option<i64> = row.try_get("retention_days")?;
    Ok(OwnerIdentity {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        owner_token: row.try_get("owner_token")?,
        alias_token: row.try_get("alias_token")?,
        retention_days: retention_days.map(|d| d as u32),
        created_at: row.try_get("created_at")?,
    })
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LogRecord> {
    let level: String = row.try_get("level")?;
    let meta: Option<String> = row.try_get("meta")?;
    Ok(LogRecord {
        id: row.try_get("id")?,
        level: level
            .parse::<LogLevel>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        message: row.try_get("message")?,
        service: row.try_get("service")?,
        timestamp: row.try_get("timestamp")?,
        meta: meta.map(|m| serde_json::from_str(&m)).transpose()?,
        owner_id: row.try_get("owner_id")?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn append(&self, record: &LogRecord) -> Result<()> {
        let meta = record
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO records (id, owner_id, level, message, service, timestamp, meta) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(record.level.as_str())
        .bind(&record.message)
        .bind(&record.service)
        .bind(record.timestamp)
        .bind(meta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_for_owner(&self, owner_id: &str, limit: u32) -> Result<Vec<LogRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM records WHERE owner_id = ?1 \
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn delete_before(&self, owner_id: &str, cutoff_ms: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records WHERE owner_id = ?1 AND timestamp < ?2")
            .bind(owner_id)
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn create_owner(&self, username: &str) -> Result<OwnerIdentity> {
        if let Some(existing) = self.find_by_username(username).await? {
            return Ok(existing);
        }

        let owner = OwnerIdentity {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            owner_token: Uuid::new_v4().to_string(),
            alias_token: None,
            retention_days: None,
            created_at: Utc::now().timestamp_millis(),
        };

        sqlx::query(
            "INSERT INTO owners (id, username, owner_token, alias_token, retention_days, created_at) \
             VALUES (?1, ?2, ?3, NULL, NULL, ?4)",
        )
        .bind(&owner.id)
        .bind(&owner.username)
        .bind(&owner.owner_token)
        .bind(owner.created_at)
        .execute(&self.pool)
        .await?;

        Ok(owner)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<OwnerIdentity>> {
        let row = sqlx::query("SELECT * FROM owners WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(owner_from_row).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<OwnerIdentity>> {
        let row = sqlx::query("SELECT * FROM owners WHERE owner_token = ?1 OR alias_token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(owner_from_row).transpose()
    }

    async fn set_alias(&self, owner_id: &str, alias: Option<String>) -> Result<OwnerIdentity> {
        let alias = alias.filter(|a| !a.is_empty());

        if let Some(alias) = &alias {
            let taken = sqlx::query("SELECT id FROM owners WHERE alias_token = ?1 AND id != ?2")
                .bind(alias)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;
            if taken.is_some() {
                return Err(StoreError::AliasTaken(alias.clone()));
            }
        }

        let result = sqlx::query("UPDATE owners SET alias_token = ?1 WHERE id = ?2")
            .bind(&alias)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::OwnerNotFound(owner_id.to_string()));
        }

        self.owner_by_id(owner_id).await
    }

    async fn set_retention(&self, owner_id: &str, days: Option<u32>) -> Result<OwnerIdentity> {
        // Zero means "retain forever" and is stored as the absence of a limit.
        let days = days.filter(|d| *d > 0).map(|d| d as i64);

        let result = sqlx::query("UPDATE owners SET retention_days = ?1 WHERE id = ?2")
            .bind(days)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::OwnerNotFound(owner_id.to_string()));
        }

        self.owner_by_id(owner_id).await
    }

    async fn owners_with_retention(&self) -> Result<Vec<OwnerIdentity>> {
        let rows = sqlx::query(
            "SELECT * FROM owners WHERE retention_days IS NOT NULL AND retention_days > 0",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(owner_from_row).collect()
    }
}
