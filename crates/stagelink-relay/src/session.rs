//! Session management

use parking_lot::RwLock;
use stagelink_core::{codec, ConnectionId, Envelope, Role, Timestamp};
use stagelink_transport::TransportSender;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;

/// A connected client session.
///
/// Owns the transport sender for its connection; the role is fixed at
/// handshake and never changes.
pub struct Session {
    /// Unique connection id, assigned at handshake
    pub id: ConnectionId,
    /// Declared role
    pub role: Role,
    /// Transport sender for this session
    sender: Arc<dyn TransportSender>,
    /// Wall-clock connect time (wire timestamps)
    pub connected_at: Timestamp,
    /// Last inbound traffic, for heartbeat eviction
    last_activity: RwLock<Instant>,
}

impl Session {
    pub fn new(sender: Arc<dyn TransportSender>, role: Role) -> Self {
        Self {
            id: ConnectionId::generate(),
            role,
            sender,
            connected_at: stagelink_core::time::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Send an envelope to this session
    pub async fn send(&self, envelope: &Envelope) -> Result<()> {
        let text = codec::encode(envelope)?;
        self.sender.send(text).await?;
        Ok(())
    }

    /// Close the underlying transport
    pub async fn close(&self) {
        let _ = self.sender.close().await;
    }

    /// Check if the transport is still up
    pub fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }

    /// Record inbound traffic
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Time since the last inbound traffic
    pub fn idle_duration(&self) -> std::time::Duration {
        self.last_activity.read().elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
