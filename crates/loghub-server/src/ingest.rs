//! Ingestion Gateway
//!
//! The single validate → resolve → persist → broadcast sequence behind both
//! ingestion paths. The HTTP handler and the WebSocket connection actor
//! both call `LogIngest::ingest`; neither carries its own validation.
//!
//! Per successful call there is exactly one durable write and exactly one
//! broadcast attempt. A failed write surfaces to the caller and nothing is
//! broadcast; writes are never retried silently.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use loghub_core::{LogLevel, LogRecord, OwnerIdentity, RecordEnvelope, DEFAULT_SERVICE};

use crate::broadcast::Broadcaster;
use crate::store::{IdentityStore, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    /// Neither an owner token nor an alias token was supplied.
    #[error("an owner token or alias token is required")]
    MissingIdentifier,

    /// The supplied token resolves to no identity.
    #[error("no identity matches the supplied token")]
    UnknownIdentifier,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A log submission as received from either entry path.
#[derive(Debug, Clone)]
pub struct Submission {
    pub level: LogLevel,
    pub message: String,
    pub service: Option<String>,
    pub meta: Option<serde_json::Value>,
    /// Producer-supplied ordering time (ms since epoch)
    pub occurred_at: Option<i64>,
    pub owner_token: Option<String>,
    pub alias_token: Option<String>,
}

/// The ingestion gateway. Dependencies are constructor-injected so tests
/// can substitute fakes or an in-memory store.
pub struct LogIngest {
    identities: Arc<dyn IdentityStore>,
    records: Arc<dyn RecordStore>,
    broadcaster: Arc<Broadcaster>,
}

impl LogIngest {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        records: Arc<dyn RecordStore>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            identities,
            records,
            broadcaster,
        }
    }

    /// Validate, resolve the owning identity, persist, then broadcast.
    /// Returns the stored record annotated with the owner's tokens.
    pub async fn ingest(&self, submission: Submission) -> Result<RecordEnvelope, IngestError> {
        let owner = self.resolve_owner(&submission).await?;

        let record = LogRecord {
            id: Uuid::new_v4().to_string(),
            level: submission.level,
            message: submission.message,
            service: submission
                .service
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            timestamp: submission
                .occurred_at
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            meta: submission.meta,
            owner_id: owner.id.clone(),
        };

        // Durable write first; broadcast only after it succeeds.
        self.records.append(&record).await?;

        let envelope = RecordEnvelope {
            record,
            owner_token: owner.owner_token,
            alias_token: owner.alias_token,
        };
        let delivered = self.broadcaster.publish(&envelope);
        debug!(
            owner = %envelope.owner_token,
            record = %envelope.record.id,
            delivered,
            "record stored and broadcast"
        );

        Ok(envelope)
    }

    async fn resolve_owner(&self, submission: &Submission) -> Result<OwnerIdentity, IngestError> {
        let primary = submission.owner_token.as_deref().filter(|t| !t.is_empty());
        let alias = submission.alias_token.as_deref().filter(|t| !t.is_empty());

        if primary.is_none() && alias.is_none() {
            return Err(IngestError::MissingIdentifier);
        }

        for token in [primary, alias].into_iter().flatten() {
            if let Some(owner) = self.identities.find_by_token(token).await? {
                return Ok(owner);
            }
        }

        Err(IngestError::UnknownIdentifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use loghub_core::{IdentityFilter, ServerMessage};
    use tokio::sync::mpsc;

    async fn gateway() -> (Arc<SqliteStore>, Arc<Broadcaster>, LogIngest) {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let broadcaster = Arc::new(Broadcaster::new());
        let ingest = LogIngest::new(store.clone(), store.clone(), broadcaster.clone());
        (store, broadcaster, ingest)
    }

    fn submission(owner_token: Option<&str>, alias_token: Option<&str>) -> Submission {
        Submission {
            level: LogLevel::Info,
            message: "service started".to_string(),
            service: None,
            meta: None,
            occurred_at: None,
            owner_token: owner_token.map(str::to_string),
            alias_token: alias_token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn rejects_submission_without_identifiers() {
        let (store, broadcaster, ingest) = gateway().await;
        let owner = store.create_owner("alice").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register(
            crate::broadcast::ConnectionId::next(),
            IdentityFilter::new(Some(owner.owner_token.clone()), None),
            tx,
        );

        let err = ingest.ingest(submission(None, None)).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingIdentifier));

        // Nothing stored, nothing broadcast.
        assert!(store.recent_for_owner(&owner.id, 100).await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_tokens_count_as_missing() {
        let (_, _, ingest) = gateway().await;
        let err = ingest.ingest(submission(Some(""), Some(""))).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingIdentifier));
    }

    #[tokio::test]
    async fn rejects_unknown_identifier() {
        let (store, _, ingest) = gateway().await;
        let owner = store.create_owner("alice").await.unwrap();

        let err = ingest
            .ingest(submission(Some("not-a-token"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnknownIdentifier));
        assert!(store.recent_for_owner(&owner.id, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stores_and_broadcasts_on_success() {
        let (store, broadcaster, ingest) = gateway().await;
        let owner = store.create_owner("alice").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register(
            crate::broadcast::ConnectionId::next(),
            IdentityFilter::new(Some(owner.owner_token.clone()), None),
            tx,
        );

        let envelope = ingest
            .ingest(submission(Some(&owner.owner_token), None))
            .await
            .unwrap();

        assert_eq!(envelope.owner_token, owner.owner_token);
        assert_eq!(envelope.record.owner_id, owner.id);
        // Defaulted fields.
        assert_eq!(envelope.record.service, DEFAULT_SERVICE);
        assert!(envelope.record.timestamp > 0);

        let stored = store.recent_for_owner(&owner.id, 100).await.unwrap();
        assert_eq!(stored, vec![envelope.record.clone()]);

        match rx.try_recv().unwrap() {
            ServerMessage::NewLog { data } => assert_eq!(data, envelope),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolves_identity_through_alias_token() {
        let (store, _, ingest) = gateway().await;
        let owner = store.create_owner("alice").await.unwrap();
        let owner = store
            .set_alias(&owner.id, Some("alice-prod".to_string()))
            .await
            .unwrap();

        let envelope = ingest
            .ingest(submission(None, Some("alice-prod")))
            .await
            .unwrap();

        assert_eq!(envelope.record.owner_id, owner.id);
        assert_eq!(envelope.alias_token.as_deref(), Some("alice-prod"));
    }

    #[tokio::test]
    async fn honors_producer_supplied_timestamp() {
        let (store, _, ingest) = gateway().await;
        let owner = store.create_owner("alice").await.unwrap();

        let mut sub = submission(Some(&owner.owner_token), None);
        sub.occurred_at = Some(1_600_000_000_000);
        sub.service = Some("billing".to_string());

        let envelope = ingest.ingest(sub).await.unwrap();
        assert_eq!(envelope.record.timestamp, 1_600_000_000_000);
        assert_eq!(envelope.record.service, "billing");
    }
}
