//! Local mirror of the relay's presence registry.
//!
//! Updated from `peer_joined` / `peer_left` notices. The relay sends a
//! snapshot on connect, so the mirror converges shortly after each
//! (re)connection.

use parking_lot::RwLock;
use stagelink_core::{ConnectionId, Role, Timestamp};

/// One known peer, as reported by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub role: Role,
    pub connection_id: ConnectionId,
    /// Local receive time of the join notice, not the relay's clock.
    pub seen_at: Timestamp,
}

#[derive(Default)]
pub(crate) struct PresenceView {
    /// Ordered by arrival of the join notice.
    peers: RwLock<Vec<Peer>>,
}

impl PresenceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a peer join. A join for a role we already track replaces
    /// the old holder, since the relay enforces one connection per role.
    pub fn apply_joined(&self, role: Role, connection_id: ConnectionId, seen_at: Timestamp) {
        let mut peers = self.peers.write();
        peers.retain(|p| p.role != role && p.connection_id != connection_id);
        peers.push(Peer { role, connection_id, seen_at });
    }

    pub fn apply_left(&self, connection_id: &ConnectionId) {
        self.peers.write().retain(|p| &p.connection_id != connection_id);
    }

    /// Drop all peers. Called when the session ends; the next connect's
    /// snapshot repopulates the mirror.
    pub fn clear(&self) {
        self.peers.write().clear();
    }

    pub fn list(&self) -> Vec<Peer> {
        self.peers.read().clone()
    }

    pub fn holder(&self, role: Role) -> Option<Peer> {
        self.peers.read().iter().find(|p| p.role == role).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s.to_string())
    }

    #[test]
    fn join_then_leave() {
        let view = PresenceView::new();
        view.apply_joined(Role::Presenter, id("a"), 1);
        view.apply_joined(Role::Tablet, id("b"), 2);
        assert_eq!(view.list().len(), 2);

        view.apply_left(&id("a"));
        assert_eq!(view.list().len(), 1);
        assert!(view.holder(Role::Presenter).is_none());
        assert_eq!(view.holder(Role::Tablet).map(|p| p.connection_id), Some(id("b")));
    }

    #[test]
    fn rejoin_replaces_role_holder() {
        let view = PresenceView::new();
        view.apply_joined(Role::Audience, id("old"), 1);
        view.apply_joined(Role::Audience, id("new"), 2);

        let peers = view.list();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].connection_id, id("new"));
    }

    #[test]
    fn clear_empties_the_mirror() {
        let view = PresenceView::new();
        view.apply_joined(Role::Presenter, id("a"), 1);
        view.clear();
        assert!(view.list().is_empty());
    }
}
