//! Viewer-Side Connection Manager
//!
//! A background task owns the WebSocket connection and handles the full
//! lifecycle transparently: transport handshake, `auth` declaration,
//! ping/pong keepalive, and reconnect with capped exponential backoff.
//!
//! The caller holds a `LogSubscriber` handle for submitting messages and
//! stopping the task, and an event receiver for everything the connection
//! produces. Dropping the handle (or calling `stop`) ends the task: any
//! pending reconnect timer is cancelled and no further attempts are
//! scheduled.

use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use loghub_core::{
    ClientMessage, ConnectionState, IdentityFilter, KeepaliveConfig, KeepaliveState,
    RecordEnvelope, ServerMessage,
};

use crate::backoff::ReconnectPolicy;
use crate::error::{ClientError, Result};

/// Configuration for the subscriber connection.
#[derive(Debug, Clone, Default)]
pub struct SubscriberConfig {
    pub reconnect: ReconnectPolicy,
    pub keepalive: KeepaliveConfig,
}

/// Events delivered to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberEvent {
    /// A record matching the declared filter was published.
    Record(RecordEnvelope),
    /// The stored record acknowledging a submission on this connection.
    Acknowledged(RecordEnvelope),
    /// The connection reached the authenticated state.
    Connected,
    /// The connection closed; a reconnect is being scheduled.
    Disconnected,
}

enum Command {
    Submit(ClientMessage),
    Stop,
}

/// Handle to the background connection task.
pub struct LogSubscriber {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl LogSubscriber {
    /// Start the background task and return the handle plus the event
    /// stream. The task connects immediately and keeps reconnecting until
    /// `stop` is called or the handle is dropped.
    pub fn connect(
        url: impl Into<String>,
        filter: IdentityFilter,
        config: SubscriberConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SubscriberEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(subscriber_task(url.into(), filter, config, cmd_rx, event_tx));

        (Self { cmd_tx }, event_rx)
    }

    /// Submit a log over this connection. The acknowledgement arrives as a
    /// `SubscriberEvent::Acknowledged` event.
    pub fn submit(&self, message: ClientMessage) -> Result<()> {
        self.cmd_tx
            .send(Command::Submit(message))
            .map_err(|_| ClientError::Closed)
    }

    /// Stop the connection permanently. Cancels any pending reconnect.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop);
    }
}

impl Drop for LogSubscriber {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Stop);
    }
}

/// Background task that owns the WebSocket connection.
async fn subscriber_task(
    url: String,
    filter: IdentityFilter,
    config: SubscriberConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::UnboundedSender<SubscriberEvent>,
) {
    // Consecutive failed/closed cycles; reset on reaching Authenticated.
    let mut attempt: u32 = 0;

    loop {
        debug!(url = %url, "connecting");

        let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                attempt += 1;
                let delay = config.reconnect.delay(attempt);
                warn!(error = %e, attempt, ?delay, "connect failed, retrying");
                if wait_or_stop(&mut cmd_rx, delay).await {
                    return;
                }
                continue;
            }
        };

        let (mut sink, mut stream) = ws_stream.split();
        let mut state = ConnectionState::Open;

        // Declare our identity scope.
        let auth = ClientMessage::Auth {
            owner_token: filter.owner_token.clone(),
            alias_token: filter.alias_token.clone(),
        };
        if send_json(&mut sink, &auth).await.is_err() {
            attempt += 1;
            let delay = config.reconnect.delay(attempt);
            if wait_or_stop(&mut cmd_rx, delay).await {
                return;
            }
            continue;
        }

        // We hold the connection, so we send the pings.
        let mut liveness = KeepaliveState::new();
        let mut ping = tokio::time::interval(config.keepalive.ping_interval);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(Command::Stop) => {
                        let _ = sink.send(Message::Close(None)).await;
                        return; // operator-initiated: no reconnect
                    }
                    Some(Command::Submit(message)) => {
                        if send_json(&mut sink, &message).await.is_err() {
                            break;
                        }
                    }
                },

                _ = ping.tick() => {
                    if liveness.is_expired(&config.keepalive) {
                        warn!("no pong within the keepalive deadline, forcing closure");
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    if send_json(&mut sink, &ClientMessage::Ping).await.is_err() {
                        break;
                    }
                },

                msg = stream.next() => match msg {
                    None | Some(Ok(Message::Close(_))) => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive error");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(ServerMessage::Status { message }) => {
                                if state != ConnectionState::Authenticated {
                                    state = ConnectionState::Authenticated;
                                    attempt = 0;
                                    info!(%message, "authenticated");
                                    let _ = event_tx.send(SubscriberEvent::Connected);
                                }
                            }
                            Ok(ServerMessage::NewLog { data }) => {
                                let _ = event_tx.send(SubscriberEvent::Record(data));
                            }
                            Ok(ServerMessage::Ack { data }) => {
                                let _ = event_tx.send(SubscriberEvent::Acknowledged(data));
                            }
                            Ok(ServerMessage::Pong { .. }) => liveness.observe(),
                            Ok(ServerMessage::Error { message }) => {
                                warn!(%message, "server reported an error");
                            }
                            Err(e) => debug!(error = %e, "ignoring unparseable message"),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }
        }

        let _ = event_tx.send(SubscriberEvent::Disconnected);
        attempt += 1;
        let delay = config.reconnect.delay(attempt);
        info!(attempt, ?delay, "disconnected, reconnecting");
        if wait_or_stop(&mut cmd_rx, delay).await {
            return;
        }
    }
}

async fn send_json<S>(sink: &mut S, message: &ClientMessage) -> std::result::Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let Ok(text) = serde_json::to_string(message) else {
        return Err(());
    };
    sink.send(Message::Text(text)).await.map_err(|_| ())
}

/// Sleep for the reconnect delay, returning `true` if a stop arrived.
/// Submissions received while disconnected cannot be delivered and are
/// dropped with a warning.
async fn wait_or_stop(cmd_rx: &mut mpsc::UnboundedReceiver<Command>, delay: std::time::Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            cmd = cmd_rx.recv() => match cmd {
                None | Some(Command::Stop) => return true,
                Some(Command::Submit(_)) => {
                    warn!("dropping submission while disconnected");
                }
            }
        }
    }
}
