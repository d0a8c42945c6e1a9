//! StageLink transport layer
//!
//! A narrow seam over the wire: bidirectional UTF-8 text frames, one
//! envelope per frame. The relay and client are written against the
//! traits here so tests can substitute in-memory transports.

pub mod error;
pub mod traits;
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{Transport, TransportEvent, TransportReceiver, TransportSender, TransportServer};
pub use websocket::{WebSocketReceiver, WebSocketSender, WebSocketServer, WebSocketTransport};
