//! Connection identity, protocol status and the connection table.
//!
//! ## Status Lifecycle
//!
//! 1. **Uninitialized** - Fresh connection, the default
//! 2. **Handshaking** - Set by the HTTP layer on an Upgrade request
//! 3. **Active** - Set once the handshake response is sent and the open
//!    event dispatched
//!
//! Status never moves backwards. Closing is a transport event, not a
//! status; a reused identifier starts over at `Uninitialized`.

mod id;
mod state;
mod table;

pub use id::ConnectionId;
pub use state::{STATUS_ACTIVE, STATUS_CONNECTION, STATUS_FRAME, STATUS_HANDSHAKE, ProtocolStatus};
pub use table::{Connection, ConnectionMap, ConnectionTable};
