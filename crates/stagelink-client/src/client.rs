//! Connection manager: session lifecycle, outbound lane, inbound routing.
//!
//! One supervisor task owns the transport for the client's lifetime. It
//! runs the current session's send/receive loop and, when the session
//! drops unexpectedly, re-dials with exponential backoff until shutdown.
//! Each session gets a fresh outbound lane (bounded queue plus sequence
//! counter), so sequence numbering restarts at 0 on every reconnect and
//! queued envelopes from a dead session are discarded, never replayed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use stagelink_core::{
    codec, time, ConnectionId, ControlCommand, Envelope, Payload, Role, Sequencer,
};
use stagelink_transport::{
    Transport, TransportEvent, TransportReceiver, TransportSender, WebSocketReceiver,
    WebSocketSender, WebSocketTransport,
};

use crate::backoff::BackoffPolicy;
use crate::dispatch::Dispatcher;
use crate::error::{ConnectError, SendError};
use crate::presence::{Peer, PresenceView};
use crate::thumbnails::{encode_frame, ThumbnailStore};

/// Connection lifecycle state, observable through [`StageLink::watch_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A connect or reconnect attempt is in flight
    Connecting,
    /// Handshake complete; envelopes flow
    Connected,
    /// No session and no attempt currently in flight
    Disconnected,
}

pub(crate) struct ClientOptions {
    pub endpoint: String,
    pub role: Role,
    pub connect_timeout: Duration,
    pub outbound_capacity: usize,
    pub backoff: BackoffPolicy,
    pub auto_reconnect: bool,
    /// `None` disables keepalive traffic entirely.
    pub keepalive_interval: Option<Duration>,
}

/// Per-session outbound state. The sequence counter advances only when
/// an envelope is actually accepted into the queue, so a rejected send
/// never burns a number.
struct OutboundLane {
    tx: mpsc::Sender<Envelope>,
    next_sequence: u64,
}

struct Shared {
    options: ClientOptions,
    lane: Mutex<Option<OutboundLane>>,
    connection_id: RwLock<Option<ConnectionId>>,
    status_tx: watch::Sender<ConnectionStatus>,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: Dispatcher,
    presence: PresenceView,
    thumbnails: ThumbnailStore,
}

/// Handle to one device's coordination channel.
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct StageLink {
    shared: Arc<Shared>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl StageLink {
    /// Start configuring a client for the given relay endpoint and role.
    pub fn builder(endpoint: impl Into<String>, role: Role) -> crate::builder::StageLinkBuilder {
        crate::builder::StageLinkBuilder::new(endpoint, role)
    }

    pub(crate) async fn connect_with(options: ClientOptions) -> Result<Self, ConnectError> {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            options,
            lane: Mutex::new(None),
            connection_id: RwLock::new(None),
            status_tx,
            shutdown_tx,
            dispatcher: Dispatcher::new(),
            presence: PresenceView::new(),
            thumbnails: ThumbnailStore::new(),
        });

        // Initial connect failures surface to the caller; only later
        // session drops go through the reconnect schedule.
        let (sender, receiver, connection_id) = establish(&shared.options).await?;
        let out_rx = install_session(&shared, connection_id);

        tokio::spawn(supervise(shared.clone(), shutdown_rx, sender, receiver, out_rx));

        Ok(Self { shared, status_rx })
    }

    pub fn role(&self) -> Role {
        self.shared.options.role
    }

    /// The relay-assigned id of the current session, if connected.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.shared.connection_id.read().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Watch connection status transitions.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Queue an envelope for broadcast to every other client.
    ///
    /// Fails immediately when there is no session or the outbound queue
    /// is full; it never blocks the caller.
    pub fn send(&self, payload: Payload) -> Result<(), SendError> {
        let role = self.shared.options.role;
        self.enqueue(|sequence| Envelope::new(payload, role, sequence))
    }

    /// Queue an envelope for delivery only to connections holding `target`.
    pub fn send_to(&self, payload: Payload, target: Role) -> Result<(), SendError> {
        let role = self.shared.options.role;
        self.enqueue(|sequence| Envelope::new(payload, role, sequence).with_target(target))
    }

    pub fn send_command(&self, command: ControlCommand) -> Result<(), SendError> {
        self.send(command.into())
    }

    pub fn send_text(&self, message: impl Into<String>) -> Result<(), SendError> {
        self.send(Payload::Text { message: message.into() })
    }

    /// Broadcast a thumbnail frame (raw image bytes, encoded on the wire).
    pub fn send_thumbnail(&self, image_data: &[u8]) -> Result<(), SendError> {
        self.send(Payload::AudienceThumbnail {
            thumbnail: encode_frame(image_data),
        })
    }

    fn enqueue(&self, build: impl FnOnce(u64) -> Envelope) -> Result<(), SendError> {
        let mut guard = self.shared.lane.lock();
        let lane = guard.as_mut().ok_or(SendError::NotConnected)?;
        match lane.tx.try_send(build(lane.next_sequence)) {
            Ok(()) => {
                lane.next_sequence += 1;
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(SendError::BackpressureExceeded),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::NotConnected),
        }
    }

    /// Register a handler for one envelope kind, replacing any previous
    /// handler for that kind.
    pub fn register_handler(&self, kind: &str, handler: impl Fn(Envelope) + Send + Sync + 'static) {
        self.shared.dispatcher.register(kind, Box::new(handler));
    }

    /// Remove the handler for a kind. Returns whether one was registered.
    pub fn unregister_handler(&self, kind: &str) -> bool {
        self.shared.dispatcher.unregister(kind)
    }

    /// Observe every delivered envelope, before kind handlers run.
    pub fn on_message(&self, handler: impl Fn(Envelope) + Send + Sync + 'static) {
        self.shared.dispatcher.set_tap(Box::new(handler));
    }

    /// Peers currently visible through the relay's presence notices.
    pub fn peers(&self) -> Vec<Peer> {
        self.shared.presence.list()
    }

    pub fn peer_holding(&self, role: Role) -> Option<Peer> {
        self.shared.presence.holder(role)
    }

    pub fn thumbnails(&self) -> &ThumbnailStore {
        &self.shared.thumbnails
    }

    /// Tear the session down and stop reconnecting. Idempotent; queued
    /// but unsent envelopes are discarded.
    pub async fn disconnect(&self) {
        let _ = self.shared.shutdown_tx.send(true);
        *self.shared.lane.lock() = None;
        *self.shared.connection_id.write() = None;
        let _ = self.shared.status_tx.send(ConnectionStatus::Disconnected);
    }
}

/// Put a freshly established session into service: new lane, new id,
/// status flip. Returns the session's queue receiver.
fn install_session(shared: &Shared, connection_id: ConnectionId) -> mpsc::Receiver<Envelope> {
    let (out_tx, out_rx) = mpsc::channel(shared.options.outbound_capacity);
    *shared.lane.lock() = Some(OutboundLane { tx: out_tx, next_sequence: 0 });
    *shared.connection_id.write() = Some(connection_id.clone());
    let _ = shared.status_tx.send(ConnectionStatus::Connected);
    info!(%connection_id, role = %shared.options.role, "Session established");
    out_rx
}

fn teardown_session(shared: &Shared) {
    *shared.lane.lock() = None;
    *shared.connection_id.write() = None;
    shared.presence.clear();
}

async fn supervise(
    shared: Arc<Shared>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut sender: WebSocketSender,
    mut receiver: WebSocketReceiver,
    mut out_rx: mpsc::Receiver<Envelope>,
) {
    loop {
        let shutdown = run_session(&shared, &mut shutdown_rx, &sender, &mut receiver, &mut out_rx).await;
        teardown_session(&shared);
        let _ = sender.close().await;
        let _ = shared.status_tx.send(ConnectionStatus::Disconnected);

        if shutdown || *shutdown_rx.borrow() || !shared.options.auto_reconnect {
            return;
        }
        match reconnect(&shared, &mut shutdown_rx).await {
            Some((new_sender, new_receiver, new_out_rx)) => {
                sender = new_sender;
                receiver = new_receiver;
                out_rx = new_out_rx;
            }
            None => return,
        }
    }
}

/// Drive one session until it ends. Returns true when the end was a
/// requested shutdown rather than a transport failure.
async fn run_session(
    shared: &Shared,
    shutdown_rx: &mut watch::Receiver<bool>,
    sender: &WebSocketSender,
    receiver: &mut WebSocketReceiver,
    out_rx: &mut mpsc::Receiver<Envelope>,
) -> bool {
    let mut sequencer = Sequencer::new();
    let mut keepalive = shared.options.keepalive_interval.map(tokio::time::interval);

    loop {
        tokio::select! {
            _ = wait_shutdown(shutdown_rx) => return true,

            queued = out_rx.recv() => {
                // Lane gone: either disconnect() dropped it (shutdown
                // also flips, checked by the supervisor) or the session
                // is being torn down.
                let Some(envelope) = queued else { return false };
                match codec::encode(&envelope) {
                    Ok(text) => {
                        if let Err(err) = sender.send(text).await {
                            warn!(%err, "Send failed, dropping session");
                            return false;
                        }
                    }
                    Err(err) => warn!(%err, "Failed to encode outbound envelope"),
                }
            }

            event = receiver.recv() => {
                match event {
                    Some(TransportEvent::Text(text)) => {
                        handle_text(shared, &mut sequencer, &text);
                    }
                    Some(TransportEvent::Connected) => {}
                    Some(TransportEvent::Error(err)) => {
                        warn!(%err, "Transport error");
                    }
                    Some(TransportEvent::Disconnected { reason }) => {
                        info!(?reason, "Relay connection closed");
                        return false;
                    }
                    None => return false,
                }
            }

            _ = keepalive_tick(&mut keepalive) => {
                let envelope = Envelope::new(Payload::Keepalive, shared.options.role, 0);
                if let Ok(text) = codec::encode(&envelope) {
                    if sender.send(text).await.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

/// Re-dial with exponential backoff until a session is established or
/// shutdown is requested. Attempts are unlimited.
async fn reconnect(
    shared: &Shared,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<(WebSocketSender, WebSocketReceiver, mpsc::Receiver<Envelope>)> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let delay = shared.options.backoff.delay(attempt);
        debug!(attempt, ?delay, "Waiting before reconnect attempt");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_shutdown(shutdown_rx) => return None,
        }

        let _ = shared.status_tx.send(ConnectionStatus::Connecting);
        match establish(&shared.options).await {
            Ok((sender, receiver, connection_id)) => {
                let out_rx = install_session(shared, connection_id);
                return Some((sender, receiver, out_rx));
            }
            Err(err) => {
                warn!(%err, attempt, "Reconnect attempt failed");
                let _ = shared.status_tx.send(ConnectionStatus::Disconnected);
            }
        }
    }
}

async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn keepalive_tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Dial the relay and complete the hello/welcome handshake.
async fn establish(
    options: &ClientOptions,
) -> Result<(WebSocketSender, WebSocketReceiver, ConnectionId), ConnectError> {
    let (sender, mut receiver) = timeout(
        options.connect_timeout,
        WebSocketTransport::connect(&options.endpoint),
    )
    .await
    .map_err(|_| ConnectError::Timeout)?
    .map_err(|err| ConnectError::Unreachable(err.to_string()))?;

    let hello = Envelope::new(Payload::Hello { role: options.role }, options.role, 0);
    let text = codec::encode(&hello).map_err(|err| ConnectError::Unreachable(err.to_string()))?;
    sender
        .send(text)
        .await
        .map_err(|err| ConnectError::Unreachable(err.to_string()))?;

    let connection_id = timeout(options.connect_timeout, await_welcome(&mut receiver))
        .await
        .map_err(|_| ConnectError::Timeout)??;

    Ok((sender, receiver, connection_id))
}

async fn await_welcome(receiver: &mut WebSocketReceiver) -> Result<ConnectionId, ConnectError> {
    loop {
        match receiver.recv().await {
            Some(TransportEvent::Text(text)) => match codec::decode(&text) {
                Ok(envelope) => match envelope.payload {
                    Payload::Welcome { connection_id } => return Ok(connection_id),
                    Payload::Rejected { reason } => return Err(ConnectError::Rejected(reason)),
                    other => debug!(kind = other.kind(), "Ignoring pre-welcome traffic"),
                },
                Err(err) => debug!(%err, "Undecodable frame before welcome"),
            },
            Some(TransportEvent::Connected) => {}
            Some(TransportEvent::Error(err)) => return Err(ConnectError::Unreachable(err)),
            Some(TransportEvent::Disconnected { reason }) => {
                return Err(ConnectError::Unreachable(
                    reason.unwrap_or_else(|| "connection closed".to_string()),
                ));
            }
            None => return Err(ConnectError::Unreachable("transport closed".to_string())),
        }
    }
}

/// Decode one inbound frame and push it through the reorder window.
/// Undecodable frames (unknown kinds included) are dropped.
fn handle_text(shared: &Shared, sequencer: &mut Sequencer, text: &str) {
    let envelope = match codec::decode(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(%err, "Dropping undecodable frame");
            return;
        }
    };
    for ready in sequencer.accept(envelope) {
        deliver(shared, sequencer, ready);
    }
}

/// Apply an in-order envelope's side effects, then dispatch it.
fn deliver(shared: &Shared, sequencer: &mut Sequencer, envelope: Envelope) {
    match &envelope.payload {
        // Keepalives refresh relay presence only; never dispatched.
        Payload::Keepalive => return,
        Payload::PeerJoined { role, connection_id } => {
            shared
                .presence
                .apply_joined(*role, connection_id.clone(), time::now());
        }
        Payload::PeerLeft { connection_id, .. } => {
            shared.presence.apply_left(connection_id);
            // A departed connection's sequence state must not bleed into
            // any future session under the same role.
            sequencer.forget(connection_id);
        }
        Payload::AudienceThumbnail { thumbnail } => {
            shared
                .thumbnails
                .store(envelope.sender, thumbnail, envelope.timestamp);
        }
        _ => {}
    }
    shared.dispatcher.dispatch(envelope);
}
