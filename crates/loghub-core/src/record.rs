//! Record Data Structures
//!
//! This module defines the core `LogRecord` type - the fundamental unit of
//! data in loghub - together with its severity enumeration and the broadcast
//! envelope that carries a stored record to live subscribers.
//!
//! ## Structure
//! Each record contains:
//! - **id**: Unique record identifier (UUID string)
//! - **level**: Severity (`info` | `warn` | `error` | `debug`)
//! - **message**: The log text
//! - **service**: Originating service name (defaulted when the producer
//!   omits it)
//! - **timestamp**: Authoritative ordering time in milliseconds since epoch,
//!   supplied by the producer or assigned at ingestion
//! - **meta**: Optional opaque structured payload
//! - **owner_id**: Owning identity; records are never orphaned
//!
//! ## Immutability
//! Records are created only by the ingestion gateway and never mutated.
//! They are deleted only by the retention sweeper or an explicit owner
//! action.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Service name used when a submission does not carry one.
pub const DEFAULT_SERVICE: &str = "default-service";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "debug" => Ok(LogLevel::Debug),
            other => Err(Error::InvalidLevel(other.to_string())),
        }
    }
}

/// A single stored log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Record identifier (UUID string)
    pub id: String,

    /// Severity level
    pub level: LogLevel,

    /// Log message text
    pub message: String,

    /// Originating service name
    pub service: String,

    /// Milliseconds since epoch; the authoritative ordering time
    pub timestamp: i64,

    /// Optional structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,

    /// Owning identity id
    pub owner_id: String,
}

/// A stored record annotated with the owner's identity tokens.
///
/// The broadcaster matches subscriptions against these tokens rather than
/// the internal `owner_id`, so the envelope is built once at ingestion time
/// (after identity resolution) and shared by the acknowledgement reply and
/// the fan-out event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEnvelope {
    #[serde(flatten)]
    pub record: LogRecord,

    /// The owner's primary identity token
    pub owner_token: String,

    /// The owner's alias token, when one is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> LogRecord {
        LogRecord {
            id: "8f14e45f-ea2a-4a9a-9e4e-d0c63828f3d4".to_string(),
            level: LogLevel::Warn,
            message: "disk usage above 80%".to_string(),
            service: "storage-agent".to_string(),
            timestamp: 1_700_000_000_000,
            meta: Some(serde_json::json!({ "disk": "/dev/sda1" })),
            owner_id: "owner-1".to_string(),
        }
    }

    #[test]
    fn level_parses_all_known_values() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    }

    #[test]
    fn level_rejects_unknown_value() {
        let err = "fatal".parse::<LogLevel>().unwrap_err();
        assert!(err.to_string().contains("fatal"));
    }

    #[test]
    fn level_display_round_trips() {
        for level in [LogLevel::Info, LogLevel::Warn, LogLevel::Error, LogLevel::Debug] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["ownerId"], "owner-1");
        assert_eq!(json["level"], "warn");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn record_omits_absent_meta() {
        let mut record = sample_record();
        record.meta = None;
        let json = serde_json::to_value(record).unwrap();
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn envelope_flattens_record_fields() {
        let envelope = RecordEnvelope {
            record: sample_record(),
            owner_token: "tok-primary".to_string(),
            alias_token: Some("tok-alias".to_string()),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        // Record fields appear at the top level alongside the tokens.
        assert_eq!(json["message"], "disk usage above 80%");
        assert_eq!(json["ownerToken"], "tok-primary");
        assert_eq!(json["aliasToken"], "tok-alias");

        let back: RecordEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }
}
