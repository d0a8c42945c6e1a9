//! Wire envelope
//!
//! Envelope schema (UTF-8 JSON):
//! ```text
//! {
//!   "type":      <kind string>,
//!   "data":      <kind-specific object, omitted for flag kinds>,
//!   "sender":    "presenter" | "audience" | "tablet",
//!   "sequence":  <u64, absent = 0>,
//!   "timestamp": <u64 unix millis>,
//!   "origin":    <connection id, stamped by the relay>,
//!   "target":    <role, present only for role-targeted delivery>
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};
use crate::types::{ConnectionId, Payload, Role};

/// The wire-level unit of communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind and kind-specific data (`type`/`data` on the wire)
    #[serde(flatten)]
    pub payload: Payload,

    /// Role of the sending connection
    pub sender: Role,

    /// Per-sender monotonic counter; restarts at 0 on reconnect.
    /// Absent on the wire means 0 (schema-compatible extension).
    #[serde(default)]
    pub sequence: u64,

    /// Send time, Unix milliseconds
    pub timestamp: Timestamp,

    /// Originating connection id, stamped by the relay before fan-out.
    /// Receivers key duplicate detection on this, not on `sender`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ConnectionId>,

    /// Deliver only to this role; absent means every other client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Role>,
}

impl Envelope {
    /// Create an envelope timestamped now
    pub fn new(payload: Payload, sender: Role, sequence: u64) -> Self {
        Self {
            payload,
            sender,
            sequence,
            timestamp: time::now(),
            origin: None,
            target: None,
        }
    }

    /// Restrict delivery to a single role
    pub fn with_target(mut self, target: Role) -> Self {
        self.target = Some(target);
        self
    }

    /// The wire `type` string
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Whether the payload is a playback control command
    pub fn is_control(&self) -> bool {
        self.payload.is_control()
    }
}
