//! Subscription Registry & Broadcaster
//!
//! Tracks every live connection and the identity filter it declared, and
//! fans newly stored records out to the connections whose filter matches.
//!
//! The registry owns the only piece of shared mutable state in the
//! distribution subsystem. It is guarded by a `Mutex` and exposed purely
//! through `register` / `unregister` / `publish`; the raw map never leaks.
//! Publishing computes the matching set under the lock, then performs the
//! actual sends after releasing it, so a slow consumer never extends the
//! critical section.
//!
//! Delivery is best effort: there is no backlog, no persistence of pending
//! deliveries, and no acknowledgement-based retry. A disconnected viewer
//! catches up through the query path after reconnecting.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use loghub_core::{IdentityFilter, RecordEnvelope, ServerMessage};

/// Opaque handle for a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a process-unique connection id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound handle for a connection; sends are non-blocking.
pub type ConnectionSender = mpsc::UnboundedSender<ServerMessage>;

struct Subscription {
    filter: IdentityFilter,
    sender: ConnectionSender,
}

/// Identity-scoped publish/subscribe fan-out.
#[derive(Default)]
pub struct Broadcaster {
    subscriptions: Mutex<HashMap<ConnectionId, Subscription>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a connection's filter. Re-authentication
    /// replaces the prior filter rather than extending it.
    pub fn register(&self, id: ConnectionId, filter: IdentityFilter, sender: ConnectionSender) {
        let mut subs = self.subscriptions.lock().unwrap();
        subs.insert(id, Subscription { filter, sender });
        debug!(connection = %id, total = subs.len(), "subscription registered");
    }

    /// Remove a connection's entry. Called exactly once per connection
    /// close, including abnormal closes.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut subs = self.subscriptions.lock().unwrap();
        let removed = subs.remove(&id).is_some();
        if removed {
            debug!(connection = %id, total = subs.len(), "subscription removed");
        }
        removed
    }

    /// Deliver a `new_log` event to every registered connection whose
    /// filter matches the record's owner tokens. Returns the number of
    /// connections the event was handed to.
    ///
    /// A send failure on one connection never affects delivery to others;
    /// connections whose receiving side is already gone are skipped.
    pub fn publish(&self, envelope: &RecordEnvelope) -> usize {
        let targets: Vec<(ConnectionId, ConnectionSender)> = {
            let subs = self.subscriptions.lock().unwrap();
            subs.iter()
                .filter(|(_, sub)| sub.filter.matches(envelope) && !sub.sender.is_closed())
                .map(|(id, sub)| (*id, sub.sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, sender) in targets {
            match sender.send(ServerMessage::NewLog {
                data: envelope.clone(),
            }) {
                Ok(()) => delivered += 1,
                Err(_) => trace!(connection = %id, "skipped delivery to closed connection"),
            }
        }
        delivered
    }

    /// Number of currently registered connections.
    pub fn connection_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}
