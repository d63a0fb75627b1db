//! loghub Viewer Client
//!
//! Maintains a persistent WebSocket connection to a loghub server on behalf
//! of a viewer: authenticates with the viewer's identity tokens, keeps the
//! transport alive with ping/pong probes, and reconnects with capped
//! exponential backoff whenever the connection drops.
//!
//! Delivery is best effort - records published while the viewer is
//! disconnected are not replayed. Callers should perform a catch-up fetch
//! through the server's query endpoint after each `Connected` event.
//!
//! ```ignore
//! use loghub_client::{LogSubscriber, SubscriberConfig, SubscriberEvent};
//! use loghub_core::IdentityFilter;
//!
//! let filter = IdentityFilter::new(Some(owner_token), None);
//! let (subscriber, mut events) =
//!     LogSubscriber::connect("ws://localhost:3000/ws/logs", filter, SubscriberConfig::default());
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SubscriberEvent::Record(envelope) => println!("{}", envelope.record.message),
//!         SubscriberEvent::Connected => println!("live"),
//!         SubscriberEvent::Disconnected => println!("reconnecting..."),
//!         SubscriberEvent::Acknowledged(_) => {}
//!     }
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod subscriber;

pub use backoff::ReconnectPolicy;
pub use error::{ClientError, Result};
pub use subscriber::{LogSubscriber, SubscriberConfig, SubscriberEvent};
