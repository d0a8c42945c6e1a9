//! Presence & role registry
//!
//! Single-writer: only the relay's receive path and the heartbeat
//! sweeper mutate records. Everything else reads snapshots — readers
//! must not cache a record beyond one dispatch turn, since a heartbeat
//! timeout may evict it concurrently.
//!
//! Demo topology policy: at most one active record per role. A second
//! connect for an already-present role replaces the stale holder and
//! emits `PresenceReplaced` before the new record becomes visible.

use parking_lot::RwLock;
use stagelink_core::{ConnectionId, Role, Timestamp};
use tokio::sync::broadcast;
use tracing::debug;

/// Bookkeeping entry for one currently-connected role
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceRecord {
    pub role: Role,
    pub connection_id: ConnectionId,
    pub connected_at: Timestamp,
}

/// Registry lifecycle events, delivered to local subscribers
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// A record became visible
    Joined { record: PresenceRecord },
    /// An existing holder of a role was displaced by a new connection.
    /// Emitted before the replacement's `Joined`.
    Replaced {
        role: Role,
        old_connection_id: ConnectionId,
    },
    /// A record was removed on explicit disconnect
    Left {
        role: Role,
        connection_id: ConnectionId,
    },
    /// A record was evicted by heartbeat timeout
    Lost {
        role: Role,
        connection_id: ConnectionId,
    },
}

/// Tracks which roles are currently connected.
pub struct PresenceRegistry {
    /// Kept in `connected_at` ascending order (append order)
    records: RwLock<Vec<PresenceRecord>>,
    events: broadcast::Sender<PresenceEvent>,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            records: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Subscribe to registry lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.events.subscribe()
    }

    /// Upsert a record for a role. If another connection currently holds
    /// the role, its record is evicted and `Replaced` is emitted before
    /// the new record is inserted. Returns the displaced connection id.
    pub fn announce(
        &self,
        role: Role,
        connection_id: ConnectionId,
        connected_at: Timestamp,
    ) -> Option<ConnectionId> {
        let mut records = self.records.write();

        let displaced = records
            .iter()
            .position(|r| r.role == role)
            .map(|idx| records.remove(idx).connection_id)
            .filter(|old| *old != connection_id);

        if let Some(old) = &displaced {
            debug!("Role {} replaced: {} -> {}", role, old, connection_id);
            let _ = self.events.send(PresenceEvent::Replaced {
                role,
                old_connection_id: old.clone(),
            });
        }

        let record = PresenceRecord {
            role,
            connection_id,
            connected_at,
        };
        records.push(record.clone());
        let _ = self.events.send(PresenceEvent::Joined { record });

        displaced
    }

    /// Remove a record on explicit disconnect
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        let record = self.take(connection_id)?;
        let _ = self.events.send(PresenceEvent::Left {
            role: record.role,
            connection_id: record.connection_id.clone(),
        });
        Some(record)
    }

    /// Evict a record on heartbeat timeout
    pub fn mark_lost(&self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        let record = self.take(connection_id)?;
        let _ = self.events.send(PresenceEvent::Lost {
            role: record.role,
            connection_id: record.connection_id.clone(),
        });
        Some(record)
    }

    fn take(&self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        let mut records = self.records.write();
        let idx = records.iter().position(|r| &r.connection_id == connection_id)?;
        Some(records.remove(idx))
    }

    /// Snapshot of all records, `connected_at` ascending (stable for UI)
    pub fn list(&self) -> Vec<PresenceRecord> {
        self.records.read().clone()
    }

    /// Current holder of a role, if any
    pub fn holder(&self, role: Role) -> Option<PresenceRecord> {
        self.records.read().iter().find(|r| r.role == role).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
