//! Owner Identity and Subscription Filters
//!
//! An `OwnerIdentity` is the account that produces or subscribes to a set
//! of log records. It is addressed by a primary token and optionally by a
//! custom alias token; both are globally unique, and either may be used for
//! ingestion or subscription.
//!
//! The core never creates identities - it looks them up through the
//! server's identity store. `IdentityFilter` is the ephemeral per-connection
//! counterpart: the tokens a viewer declared during its `auth` handshake.

use serde::{Deserialize, Serialize};

use crate::record::RecordEnvelope;

/// An owning identity, as resolved by the identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerIdentity {
    /// Internal identifier (UUID string)
    pub id: String,

    /// Unique account label
    pub username: String,

    /// Primary identity token (UUID string, generated at registration)
    pub owner_token: String,

    /// Optional custom alias token; globally unique when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_token: Option<String>,

    /// Retention window in days; `None` means retain forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,

    /// Milliseconds since epoch
    pub created_at: i64,
}

/// The identity scope a connection declared during its handshake.
///
/// A connection may declare a primary token, an alias token, or both;
/// declaring both broadens what it matches. Matching is by exact token
/// equality only - no partial or prefix matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_token: Option<String>,
}

impl IdentityFilter {
    pub fn new(owner_token: Option<String>, alias_token: Option<String>) -> Self {
        Self {
            owner_token: normalize(owner_token),
            alias_token: normalize(alias_token),
        }
    }

    /// True when neither token is present.
    pub fn is_empty(&self) -> bool {
        self.owner_token.is_none() && self.alias_token.is_none()
    }

    /// The first available token, used as the implicit identity for
    /// submissions that carry no inline tokens.
    pub fn any_token(&self) -> Option<&str> {
        self.owner_token
            .as_deref()
            .or(self.alias_token.as_deref())
    }

    /// Whether a stored record should be delivered to this subscription:
    /// the filter's primary token equals the record owner's primary token,
    /// OR the filter's alias token equals the record owner's alias token.
    pub fn matches(&self, envelope: &RecordEnvelope) -> bool {
        if let Some(token) = &self.owner_token {
            if *token == envelope.owner_token {
                return true;
            }
        }
        if let (Some(token), Some(alias)) = (&self.alias_token, &envelope.alias_token) {
            if token == alias {
                return true;
            }
        }
        false
    }
}

fn normalize(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}
