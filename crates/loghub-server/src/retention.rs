//! Retention Sweep Background Task
//!
//! Periodically deletes records older than each owner's configured
//! retention window.
//!
//! ## How a Sweep Works
//!
//! 1. List every owner with a positive retention window; owners without
//!    one are never touched (unlimited retention).
//! 2. For each owner compute `cutoff = now - window` and delete records
//!    with a timestamp strictly before the cutoff.
//! 3. A failure for one owner is logged and the sweep continues with the
//!    remaining owners.
//!
//! Re-running a sweep with no new data deletes nothing. The task shares no
//! mutable state with ingestion or fan-out; it only reads identities and
//! deletes records.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::store::{IdentityStore, RecordStore, StoreError};

/// Sweep configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to run a sweep (default: 1 hour)
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

/// Outcome of a single sweep cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    /// Owners with a retention window that were processed
    pub owners_swept: u64,
    /// Total records deleted across all owners
    pub records_deleted: u64,
}

/// Retention sweep background task
pub struct RetentionSweeper {
    identities: Arc<dyn IdentityStore>,
    records: Arc<dyn RecordStore>,
    config: SweeperConfig,
}

impl RetentionSweeper {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        records: Arc<dyn RecordStore>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            identities,
            records,
            config,
        }
    }

    /// Start the periodic sweep. The task stops when the shutdown receiver
    /// fires.
    pub fn start(self: Arc<Self>, shutdown_rx: oneshot::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(self.config.interval);
            let mut shutdown_rx = shutdown_rx;

            info!(interval = ?self.config.interval, "retention sweeper started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.run_sweep().await {
                            Ok(stats) if stats.records_deleted > 0 => {
                                info!(
                                    owners = stats.owners_swept,
                                    deleted = stats.records_deleted,
                                    "retention sweep completed"
                                );
                            }
                            Ok(stats) => {
                                debug!(owners = stats.owners_swept, "retention sweep found nothing to delete");
                            }
                            Err(e) => error!(error = %e, "retention sweep cycle failed"),
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("retention sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Run one sweep cycle. Failures for individual owners are isolated;
    /// only the owner listing itself can fail the cycle.
    pub async fn run_sweep(&self) -> Result<SweepStats, StoreError> {
        let owners = self.identities.owners_with_retention().await?;
        let mut stats = SweepStats::default();

        for owner in owners {
            let Some(days) = owner.retention_days.filter(|d| *d > 0) else {
                continue;
            };

            let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
            match self
                .records
                .delete_before(&owner.id, cutoff.timestamp_millis())
                .await
            {
                Ok(deleted) => {
                    if deleted > 0 {
                        debug!(owner = %owner.username, deleted, days, "expired records removed");
                    }
                    stats.records_deleted += deleted;
                }
                Err(e) => {
                    warn!(owner = %owner.username, error = %e, "retention sweep failed for owner");
                }
            }
            stats.owners_swept += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use loghub_core::{LogLevel, LogRecord};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn record_aged(id: &str, owner_id: &str, age_ms: i64) -> LogRecord {
        LogRecord {
            id: id.to_string(),
            level: LogLevel::Info,
            message: "aged".to_string(),
            service: "api".to_string(),
            timestamp: Utc::now().timestamp_millis() - age_ms,
            meta: None,
            owner_id: owner_id.to_string(),
        }
    }

    async fn sweeper(store: &Arc<SqliteStore>) -> RetentionSweeper {
        RetentionSweeper::new(store.clone(), store.clone(), SweeperConfig::default())
    }

    #[tokio::test]
    async fn deletes_only_records_past_the_window() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let owner = store.create_owner("alice").await.unwrap();
        store.set_retention(&owner.id, Some(7)).await.unwrap();

        store.append(&record_aged("age-6d", &owner.id, 6 * DAY_MS)).await.unwrap();
        store
            .append(&record_aged("age-7-5d", &owner.id, 7 * DAY_MS + DAY_MS / 2))
            .await
            .unwrap();
        store.append(&record_aged("age-10d", &owner.id, 10 * DAY_MS)).await.unwrap();

        let stats = sweeper(&store).await.run_sweep().await.unwrap();
        assert_eq!(stats.owners_swept, 1);
        assert_eq!(stats.records_deleted, 2);

        let remaining = store.recent_for_owner(&owner.id, 100).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "age-6d");
    }

    #[tokio::test]
    async fn owners_without_a_window_retain_everything() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let owner = store.create_owner("alice").await.unwrap();

        store.append(&record_aged("ancient", &owner.id, 400 * DAY_MS)).await.unwrap();

        let stats = sweeper(&store).await.run_sweep().await.unwrap();
        assert_eq!(stats, SweepStats::default());
        assert_eq!(store.recent_for_owner(&owner.id, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let owner = store.create_owner("alice").await.unwrap();
        store.set_retention(&owner.id, Some(7)).await.unwrap();

        store.append(&record_aged("stale", &owner.id, 30 * DAY_MS)).await.unwrap();
        store.append(&record_aged("fresh", &owner.id, DAY_MS)).await.unwrap();

        let sweeper = sweeper(&store).await;
        let first = sweeper.run_sweep().await.unwrap();
        assert_eq!(first.records_deleted, 1);

        let second = sweeper.run_sweep().await.unwrap();
        assert_eq!(second.records_deleted, 0);
        assert_eq!(store.recent_for_owner(&owner.id, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweeps_each_owner_independently() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let alice = store.create_owner("alice").await.unwrap();
        let bob = store.create_owner("bob").await.unwrap();
        store.set_retention(&alice.id, Some(1)).await.unwrap();
        store.set_retention(&bob.id, Some(30)).await.unwrap();

        store.append(&record_aged("a-old", &alice.id, 5 * DAY_MS)).await.unwrap();
        store.append(&record_aged("b-old", &bob.id, 5 * DAY_MS)).await.unwrap();

        let stats = sweeper(&store).await.run_sweep().await.unwrap();
        assert_eq!(stats.owners_swept, 2);
        assert_eq!(stats.records_deleted, 1);

        assert!(store.recent_for_owner(&alice.id, 100).await.unwrap().is_empty());
        assert_eq!(store.recent_for_owner(&bob.id, 100).await.unwrap().len(), 1);
    }
}
