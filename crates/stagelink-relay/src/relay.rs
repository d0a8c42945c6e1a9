//! Main relay implementation
//!
//! The relay is transport-agnostic: it accepts connections from any
//! [`TransportServer`] implementation, runs the hello/welcome handshake,
//! then stamps every inbound envelope with its originating connection id
//! and forwards it — to the session holding the `target` role when one
//! is set, otherwise fanned out to every other session.
//!
//! Delivery is best effort. There is no acknowledgment, no retry, and
//! no queueing for absent peers; a send failure to one peer never
//! affects delivery to the others.
//!
//! # Example
//!
//! ```no_run
//! use stagelink_relay::{Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let relay = Relay::new(RelayConfig::default());
//!     relay.serve_websocket("0.0.0.0:8080").await.unwrap();
//! }
//! ```

use dashmap::DashMap;
use parking_lot::RwLock;
use stagelink_core::{codec, ConnectionId, Envelope, Payload, Role};
use stagelink_transport::{
    TransportEvent, TransportReceiver, TransportSender, TransportServer, WebSocketServer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{RelayError, Result};
use crate::presence::PresenceRegistry;
use crate::session::Session;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay name, for logs
    pub name: String,
    /// Maximum concurrent sessions
    pub max_sessions: usize,
    /// A connection silent for this long is evicted
    pub heartbeat_timeout: Duration,
    /// How often the eviction sweep runs
    pub sweep_interval: Duration,
    /// Time allowed between transport connect and the `hello` envelope
    pub handshake_timeout: Duration,
    /// Reject a duplicate role instead of replacing the stale holder
    pub strict_roles: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            name: "StageLink Relay".to_string(),
            max_sessions: 16,
            heartbeat_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(5),
            strict_roles: false,
        }
    }
}

/// The StageLink message bus
pub struct Relay {
    config: RelayConfig,
    /// Active sessions, keyed by connection id
    sessions: Arc<DashMap<ConnectionId, Arc<Session>>>,
    /// Presence & role registry (this relay is its single writer)
    presence: Arc<PresenceRegistry>,
    /// Running flag
    running: Arc<RwLock<bool>>,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(DashMap::new()),
            presence: Arc::new(PresenceRegistry::new()),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Serve using any [`TransportServer`] implementation
    pub async fn serve_on<S>(&self, mut server: S) -> Result<()>
    where
        S: TransportServer + 'static,
        S::Sender: 'static,
        S::Receiver: 'static,
    {
        info!("{} accepting connections", self.config.name);
        *self.running.write() = true;
        self.spawn_sweeper();

        while *self.running.read() {
            match server.accept().await {
                Ok((sender, receiver, addr)) => {
                    info!("New connection from {}", addr);
                    self.handle_connection(Arc::new(sender), receiver, addr);
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Serve on WebSocket (the default transport)
    pub async fn serve_websocket(&self, addr: &str) -> Result<()> {
        let server = WebSocketServer::bind(addr).await?;
        self.serve_on(server).await
    }

    /// Stop accepting and let connection tasks wind down
    pub fn stop(&self) {
        *self.running.write() = false;
    }

    /// Number of active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The presence registry (read-only for callers)
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Periodic heartbeat sweep: evict sessions silent for longer than
    /// the configured window.
    fn spawn_sweeper(&self) {
        let sessions = Arc::clone(&self.sessions);
        let presence = Arc::clone(&self.presence);
        let running = Arc::clone(&self.running);
        let heartbeat_timeout = self.config.heartbeat_timeout;
        let sweep_interval = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(sweep_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while *running.read() {
                tick.tick().await;

                let idle: Vec<Arc<Session>> = sessions
                    .iter()
                    .filter(|entry| entry.value().idle_duration() >= heartbeat_timeout)
                    .map(|entry| Arc::clone(entry.value()))
                    .collect();

                for session in idle {
                    warn!(
                        "Evicting silent session {} ({}), idle {:?}",
                        session.id,
                        session.role,
                        session.idle_duration()
                    );
                    sessions.remove(&session.id);
                    if presence.mark_lost(&session.id).is_some() {
                        let left = relay_notice(
                            Payload::PeerLeft {
                                role: session.role,
                                connection_id: session.id.clone(),
                            },
                            session.role,
                        );
                        broadcast(&sessions, &left, None).await;
                    }
                    session.close().await;
                }
            }
        });
    }

    /// Handle a new connection: handshake, register, relay until gone
    fn handle_connection(
        &self,
        sender: Arc<dyn TransportSender>,
        mut receiver: impl TransportReceiver + 'static,
        addr: SocketAddr,
    ) {
        let sessions = Arc::clone(&self.sessions);
        let presence = Arc::clone(&self.presence);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        tokio::spawn(async move {
            let role = match await_hello(&mut receiver, config.handshake_timeout).await {
                Ok(role) => role,
                Err(e) => {
                    debug!("Handshake with {} failed: {}", addr, e);
                    let _ = sender.close().await;
                    return;
                }
            };

            if config.strict_roles && presence.holder(role).is_some() {
                info!("Rejecting duplicate {} connection from {}", role, addr);
                let _ = send_notice(
                    &sender,
                    relay_notice(
                        Payload::Rejected {
                            reason: format!("role {} already connected", role),
                        },
                        role,
                    ),
                )
                .await;
                let _ = sender.close().await;
                return;
            }

            // A connection for an occupied role displaces the stale
            // holder and so frees its own slot; only genuinely new
            // roles count against capacity.
            if presence.holder(role).is_none() && sessions.len() >= config.max_sessions {
                let _ = send_notice(
                    &sender,
                    relay_notice(
                        Payload::Rejected {
                            reason: "relay at capacity".to_string(),
                        },
                        role,
                    ),
                )
                .await;
                let _ = sender.close().await;
                return;
            }

            let session = Arc::new(Session::new(Arc::clone(&sender), role));

            // Default policy: a new connection for an occupied role
            // displaces the stale holder.
            if let Some(old_id) =
                presence.announce(role, session.id.clone(), session.connected_at)
            {
                if let Some((_, old)) = sessions.remove(&old_id) {
                    info!("Displacing stale {} session {}", role, old_id);
                    old.close().await;
                }
                let left = relay_notice(
                    Payload::PeerLeft {
                        role,
                        connection_id: old_id,
                    },
                    role,
                );
                broadcast(&sessions, &left, None).await;
            }

            sessions.insert(session.id.clone(), Arc::clone(&session));
            info!("Session {} connected as {} from {}", session.id, role, addr);

            let welcome = relay_notice(
                Payload::Welcome {
                    connection_id: session.id.clone(),
                },
                role,
            );
            if session.send(&welcome).await.is_err() {
                cleanup(&sessions, &presence, &session).await;
                return;
            }

            // Tell the newcomer who is already here, then announce the
            // newcomer to everyone else.
            for record in presence.list() {
                if record.connection_id == session.id {
                    continue;
                }
                let joined = relay_notice(
                    Payload::PeerJoined {
                        role: record.role,
                        connection_id: record.connection_id.clone(),
                    },
                    record.role,
                );
                let _ = session.send(&joined).await;
            }
            let joined = relay_notice(
                Payload::PeerJoined {
                    role,
                    connection_id: session.id.clone(),
                },
                role,
            );
            broadcast(&sessions, &joined, Some(&session.id)).await;

            // Relay loop
            while *running.read() {
                match receiver.recv().await {
                    Some(TransportEvent::Text(text)) => {
                        session.touch();

                        let mut envelope = match codec::decode(&text) {
                            Ok(env) => env,
                            Err(e) => {
                                warn!("Decode error from {}: {}", session.id, e);
                                continue;
                            }
                        };

                        match &envelope.payload {
                            Payload::Keepalive => continue,
                            Payload::Hello { .. } => {
                                debug!("Ignoring repeated hello from {}", session.id);
                                continue;
                            }
                            Payload::Welcome { .. }
                            | Payload::Rejected { .. }
                            | Payload::PeerJoined { .. }
                            | Payload::PeerLeft { .. } => {
                                debug!(
                                    "Dropping relay-originated kind `{}` from client {}",
                                    envelope.kind(),
                                    session.id
                                );
                                continue;
                            }
                            _ => {}
                        }

                        // Stamp origin and pin the sender role so
                        // receivers can key duplicate detection by
                        // connection, and nobody can spoof a role.
                        envelope.origin = Some(session.id.clone());
                        envelope.sender = session.role;
                        broadcast(&sessions, &envelope, Some(&session.id)).await;
                    }
                    Some(TransportEvent::Connected) => continue,
                    Some(TransportEvent::Error(e)) => {
                        error!("Transport error from {}: {}", session.id, e);
                        break;
                    }
                    Some(TransportEvent::Disconnected { reason }) => {
                        info!("Session {} disconnected: {:?}", session.id, reason);
                        break;
                    }
                    None => break,
                }
            }

            cleanup(&sessions, &presence, &session).await;
        });
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

/// Wait for the opening `hello` envelope
async fn await_hello(
    receiver: &mut impl TransportReceiver,
    handshake_timeout: Duration,
) -> Result<Role> {
    let hello = async {
        loop {
            match receiver.recv().await {
                Some(TransportEvent::Text(text)) => {
                    let envelope = codec::decode(&text)?;
                    match envelope.payload {
                        Payload::Hello { role } => return Ok(role),
                        other => {
                            return Err(RelayError::Handshake(format!(
                                "expected hello, got `{}`",
                                other.kind()
                            )))
                        }
                    }
                }
                Some(TransportEvent::Connected) => continue,
                Some(TransportEvent::Disconnected { reason }) => {
                    return Err(RelayError::Handshake(format!(
                        "disconnected during handshake: {:?}",
                        reason
                    )))
                }
                Some(TransportEvent::Error(e)) => {
                    return Err(RelayError::Handshake(e));
                }
                None => {
                    return Err(RelayError::Handshake("transport closed".to_string()));
                }
            }
        }
    };

    timeout(handshake_timeout, hello)
        .await
        .map_err(|_| RelayError::Handshake("timed out waiting for hello".to_string()))?
}

/// Build a relay-originated notice. The `sender` field carries the
/// subject's role (the relay itself has none).
fn relay_notice(payload: Payload, subject: Role) -> Envelope {
    Envelope::new(payload, subject, 0)
}

async fn send_notice(sender: &Arc<dyn TransportSender>, envelope: Envelope) -> Result<()> {
    let text = codec::encode(&envelope)?;
    sender.send(text).await?;
    Ok(())
}

/// Deliver to every matching session except `exclude`. Honors the
/// envelope's `target` role when set.
async fn broadcast(
    sessions: &Arc<DashMap<ConnectionId, Arc<Session>>>,
    envelope: &Envelope,
    exclude: Option<&ConnectionId>,
) {
    for entry in sessions.iter() {
        let session = entry.value();
        if exclude == Some(&session.id) {
            continue;
        }
        if let Some(target) = envelope.target {
            if session.role != target {
                continue;
            }
        }
        if let Err(e) = session.send(envelope).await {
            // Best effort: the failing session's own task (or the
            // sweeper) will clean it up.
            debug!("Relay to {} failed: {}", session.id, e);
        }
    }
}

/// Remove a session and tell the survivors, unless it was already
/// displaced by a replacement connection.
async fn cleanup(
    sessions: &Arc<DashMap<ConnectionId, Arc<Session>>>,
    presence: &Arc<PresenceRegistry>,
    session: &Arc<Session>,
) {
    if sessions.remove(&session.id).is_some() {
        if presence.remove(&session.id).is_some() {
            let left = relay_notice(
                Payload::PeerLeft {
                    role: session.role,
                    connection_id: session.id.clone(),
                },
                session.role,
            );
            broadcast(sessions, &left, None).await;
        }
    }
    session.close().await;
}
