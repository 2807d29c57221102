//! Connection handle contract
//!
//! The connection owns its status state machine. Consumers observe status
//! changes through registered listeners and request transitions with
//! [`Connection::connect`] / [`Connection::disconnect`]; they never set the
//! status themselves.

use std::fmt;
use std::sync::Arc;

use crate::protocol::ProtocolClient;

/// Status of the debugging-protocol connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a registered status listener so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked synchronously on every status change with the new status.
pub type StatusListener = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// A long-lived connection to a runtime's debugging server.
///
/// Implementations must invoke listeners without holding internal locks so
/// listeners may call back into the connection (read `status()`, remove
/// themselves, request a disconnect).
pub trait Connection: Send + Sync + fmt::Debug {
    /// Current status.
    fn status(&self) -> ConnectionStatus;

    /// Register a status listener.
    fn add_status_listener(&self, listener: StatusListener) -> ListenerId;

    /// Remove a status listener. Unknown ids are ignored.
    fn remove_status_listener(&self, id: ListenerId);

    /// Point the connection at a debugging server. Runtimes call this from
    /// their connect capability before [`Connection::connect`].
    fn set_endpoint(&self, host: &str, port: u16);

    /// Open the connection using the current options (host, port, ...).
    fn connect(&self);

    /// Close the connection.
    fn disconnect(&self);

    /// Restore host/port/encryption options to their defaults.
    fn reset_options(&self);

    /// Low-level protocol client, available while a transport exists.
    fn client(&self) -> Option<Arc<dyn ProtocolClient>>;
}
