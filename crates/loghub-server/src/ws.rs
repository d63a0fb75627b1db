//! WebSocket Connection Handling
//!
//! One task per connection. The task owns both halves of the socket and a
//! per-connection outbound channel: fan-out events from the broadcaster and
//! direct replies (acks, errors, pongs) are funneled through the same
//! channel so a single writer preserves ordering.
//!
//! Lifecycle: the connection starts `Open` after the transport handshake.
//! An `auth` message registers the declared filter with the broadcaster and
//! moves it to `Authenticated`; re-authentication replaces the filter. The
//! loop exits on transport close, transport error, or keepalive expiry, and
//! always unregisters exactly once on the way out - dropping the loop also
//! drops the watchdog timer.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use loghub_core::{
    ClientMessage, ConnectionState, IdentityFilter, KeepaliveState, ServerMessage,
};

use crate::broadcast::ConnectionId;
use crate::ingest::Submission;
use crate::AppState;

/// Upgrade HTTP to WebSocket for the log stream.
pub async fn logs_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let conn_id = ConnectionId::next();
    let (mut sink, mut stream) = socket.split();

    // Outbound channel: registered with the broadcaster for fan-out and
    // used locally for replies.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut conn_state = ConnectionState::Open;
    let mut filter: Option<IdentityFilter> = None;

    // The client is the ping holder; any inbound frame counts as liveness.
    let keepalive = state.keepalive.clone();
    let mut liveness = KeepaliveState::new();
    let mut watchdog = tokio::time::interval(keepalive.ping_interval);

    debug!(connection = %conn_id, "websocket connection established");

    loop {
        tokio::select! {
            Some(outbound) = rx.recv() => {
                let Ok(text) = serde_json::to_string(&outbound) else {
                    continue;
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }

            inbound = stream.next() => {
                match inbound {
                    None | Some(Ok(Message::Close(_))) => break,
                    Some(Err(e)) => {
                        debug!(connection = %conn_id, error = %e, "websocket receive error");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        liveness.observe();
                        handle_client_text(
                            &text,
                            &state,
                            conn_id,
                            &tx,
                            &mut filter,
                            &mut conn_state,
                        )
                        .await;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        liveness.observe();
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }

            _ = watchdog.tick() => {
                if liveness.is_expired(&keepalive) {
                    info!(connection = %conn_id, "keepalive timeout, closing connection");
                    break;
                }
            }
        }
    }

    // Exactly once per connection, graceful or abnormal.
    state.broadcaster.unregister(conn_id);
    debug!(
        connection = %conn_id,
        authenticated = conn_state == ConnectionState::Authenticated,
        "websocket connection closed"
    );
}

async fn handle_client_text(
    text: &str,
    state: &AppState,
    conn_id: ConnectionId,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    filter: &mut Option<IdentityFilter>,
    conn_state: &mut ConnectionState,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            // Malformed payloads are reported back; the connection stays open.
            let _ = tx.send(ServerMessage::Error {
                message: format!("invalid message: {e}"),
            });
            return;
        }
    };

    match message {
        ClientMessage::Auth {
            owner_token,
            alias_token,
        } => {
            let declared = IdentityFilter::new(owner_token, alias_token);
            if declared.is_empty() {
                let _ = tx.send(ServerMessage::Error {
                    message: "an owner token or alias token is required".to_string(),
                });
                return;
            }

            state
                .broadcaster
                .register(conn_id, declared.clone(), tx.clone());
            *filter = Some(declared);
            *conn_state = ConnectionState::Authenticated;
            let _ = tx.send(ServerMessage::Status {
                message: "subscribed to updates".to_string(),
            });
        }

        ClientMessage::Log {
            level,
            message,
            service,
            meta,
            occurred_at,
            owner_token,
            alias_token,
        } => {
            // Submissions without inline tokens inherit the connection's
            // registered identity.
            let (owner_token, alias_token) = match (owner_token, alias_token) {
                (None, None) => match filter {
                    Some(f) => (f.owner_token.clone(), f.alias_token.clone()),
                    None => (None, None),
                },
                tokens => tokens,
            };

            let submission = Submission {
                level,
                message,
                service,
                meta,
                occurred_at,
                owner_token,
                alias_token,
            };

            match state.ingest.ingest(submission).await {
                Ok(envelope) => {
                    let _ = tx.send(ServerMessage::Ack { data: envelope });
                }
                Err(e) => {
                    let _ = tx.send(ServerMessage::Error {
                        message: e.to_string(),
                    });
                }
            }
        }

        ClientMessage::Ping => {
            let _ = tx.send(ServerMessage::Pong {
                ts: Utc::now().timestamp_millis(),
            });
        }
    }
}
