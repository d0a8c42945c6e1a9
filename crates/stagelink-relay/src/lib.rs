//! StageLink relay
//!
//! The bus itself: a minimal best-effort relay that fans envelopes out
//! to every other connected client (or to a single role when targeted),
//! tracks presence per role, and evicts silent connections. It is not a
//! durable log — queued-but-unsent traffic is lost by design.

pub mod error;
pub mod presence;
pub mod relay;
pub mod session;

pub use error::{RelayError, Result};
pub use presence::{PresenceEvent, PresenceRecord, PresenceRegistry};
pub use relay::{Relay, RelayConfig};
pub use session::Session;
