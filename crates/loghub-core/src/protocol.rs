//! WebSocket Wire Protocol
//!
//! JSON messages exchanged over a persistent connection, tagged by a
//! `type` field with camelCase payload fields:
//!
//! - client → server: `auth`, `log`, `ping`
//! - server → client: `status`, `ack`, `error`, `new_log`, `pong`
//!
//! A connection that never sends `auth` stays in `Open` and receives no
//! fan-out, but may still submit `log` messages with inline identity
//! tokens. Malformed payloads are answered with an `error` message and do
//! not close the connection.

use serde::{Deserialize, Serialize};

use crate::record::{LogLevel, RecordEnvelope};

/// Messages a client may send over the persistent connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Declare the identity scope this connection subscribes to.
    /// At least one token is required.
    Auth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias_token: Option<String>,
    },

    /// Submit a log record. Tokens may be omitted when the connection has
    /// already authenticated; the registered filter is used instead.
    Log {
        level: LogLevel,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<serde_json::Value>,
        /// Producer-supplied ordering time, milliseconds since epoch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        occurred_at: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias_token: Option<String>,
    },

    /// Keepalive probe; the peer replies `pong` immediately.
    Ping,
}

/// Messages the server sends over the persistent connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Handshake acknowledgement.
    Status { message: String },

    /// Acknowledgement for a `log` submission, carrying the stored record.
    Ack { data: RecordEnvelope },

    /// Submission or protocol error; the connection stays open.
    Error { message: String },

    /// Fan-out event for a newly stored record.
    NewLog { data: RecordEnvelope },

    /// Keepalive reply; `ts` is the server clock in milliseconds.
    Pong { ts: i64 },
}

/// Lifecycle of a single connection, symmetric on both ends.
///
/// `Open` may transition directly to `Closed` on transport failure without
/// ever reaching `Authenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Authenticated,
    Closing,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;

    #[test]
    fn auth_message_wire_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"auth","ownerToken":"tok-1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Auth {
                owner_token: Some("tok-1".to_string()),
                alias_token: None,
            }
        );
    }

    #[test]
    fn log_message_accepts_minimal_payload() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"log","level":"error","message":"boom"}"#).unwrap();
        match msg {
            ClientMessage::Log { level, message, service, owner_token, .. } => {
                assert_eq!(level, LogLevel::Error);
                assert_eq!(message, "boom");
                assert!(service.is_none());
                assert!(owner_token.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn ping_is_a_bare_tag() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn new_log_event_uses_snake_case_tag() {
        let envelope = RecordEnvelope {
            record: LogRecord {
                id: "r1".to_string(),
                level: LogLevel::Info,
                message: "up".to_string(),
                service: "api".to_string(),
                timestamp: 42,
                meta: None,
                owner_id: "o1".to_string(),
            },
            owner_token: "tok-1".to_string(),
            alias_token: None,
        };
        let json = serde_json::to_value(ServerMessage::NewLog { data: envelope }).unwrap();
        assert_eq!(json["type"], "new_log");
        assert_eq!(json["data"]["ownerToken"], "tok-1");
        assert_eq!(json["data"]["message"], "up");
    }

    #[test]
    fn pong_carries_timestamp() {
        let json = serde_json::to_value(ServerMessage::Pong { ts: 1_700_000_000_000 }).unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["ts"], 1_700_000_000_000i64);
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }
}
