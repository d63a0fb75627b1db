pub mod error;
pub mod keepalive;
pub mod owner;
pub mod protocol;
pub mod record;

pub use error::{Error, Result};
pub use keepalive::{KeepaliveConfig, KeepaliveState};
pub use owner::{IdentityFilter, OwnerIdentity};
pub use protocol::{ClientMessage, ConnectionState, ServerMessage};
pub use record::{LogLevel, LogRecord, RecordEnvelope, DEFAULT_SERVICE};
