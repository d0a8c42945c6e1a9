//! Common test helpers for StageLink tests
//!
//! - Condition-based waiting (no hardcoded sleeps)
//! - RAII relay management on a random free port
//! - Envelope collectors for delivery assertions

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use stagelink_client::{StageLink, StageLinkBuilder};
use stagelink_core::{Envelope, Role};
use stagelink_relay::{Relay, RelayConfig};
use tokio::sync::Notify;
use tokio::time::timeout;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available TCP port for testing
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Wait for a boolean flag to become true
pub async fn wait_for_flag(flag: &AtomicBool, max_wait: Duration) -> bool {
    wait_for(
        || async { flag.load(Ordering::SeqCst) },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Wait with notification - more efficient than polling
pub async fn wait_with_notify(notify: &Notify, max_wait: Duration) -> bool {
    timeout(max_wait, notify.notified()).await.is_ok()
}

// ============================================================================
// Test Relay - RAII wrapper with proper cleanup
// ============================================================================

/// A test relay that automatically shuts down on drop
pub struct TestRelay {
    port: u16,
    relay: Arc<Relay>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestRelay {
    /// Start a test relay with default configuration
    pub async fn start() -> Self {
        Self::start_with_config(RelayConfig {
            name: "Test Relay".to_string(),
            ..RelayConfig::default()
        })
        .await
    }

    /// Start a test relay with custom configuration
    pub async fn start_with_config(config: RelayConfig) -> Self {
        let port = find_available_port().await;
        let addr = format!("127.0.0.1:{}", port);

        let relay = Arc::new(Relay::new(config));
        let serving = relay.clone();
        let handle = tokio::spawn(async move {
            let _ = serving.serve_websocket(&addr).await;
        });

        // Ready once the port accepts connections
        let _ = wait_for(
            || {
                let port = port;
                async move {
                    tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port))
                        .await
                        .is_ok()
                }
            },
            DEFAULT_CHECK_INTERVAL,
            Duration::from_secs(5),
        )
        .await;

        Self {
            port,
            relay,
            handle: Some(handle),
        }
    }

    /// Get the WebSocket URL for this relay
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Direct access to the relay, for presence/session assertions
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Connect a client with the given role and default settings
    pub async fn connect_client(
        &self,
        role: Role,
    ) -> Result<StageLink, stagelink_client::ConnectError> {
        StageLinkBuilder::new(self.url(), role).connect().await
    }

    /// Builder pre-pointed at this relay, for customized clients
    pub fn client_builder(&self, role: Role) -> StageLinkBuilder {
        StageLinkBuilder::new(self.url(), role)
    }

    /// Stop the relay explicitly (also happens on drop)
    pub fn stop(&mut self) {
        self.relay.stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Envelope Collector - for verifying delivery
// ============================================================================

/// Collects delivered envelopes with thread-safe access
#[derive(Clone)]
pub struct EnvelopeCollector {
    envelopes: Arc<parking_lot::Mutex<Vec<Envelope>>>,
    notify: Arc<Notify>,
    count: Arc<AtomicU32>,
}

impl EnvelopeCollector {
    pub fn new() -> Self {
        Self {
            envelopes: Arc::new(parking_lot::Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Create a handler closure for [`StageLink::register_handler`] /
    /// [`StageLink::on_message`]
    pub fn handler(&self) -> impl Fn(Envelope) + Send + Sync + 'static {
        let envelopes = self.envelopes.clone();
        let notify = self.notify.clone();
        let count = self.count.clone();

        move |envelope| {
            envelopes.lock().push(envelope);
            count.fetch_add(1, Ordering::SeqCst);
            notify.notify_waiters();
        }
    }

    /// Count of envelopes collected so far
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait for at least n envelopes to arrive
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }

    /// All collected envelopes, in arrival order
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().clone()
    }

    /// Envelopes of one kind, in arrival order
    pub fn of_kind(&self, kind: &str) -> Vec<Envelope> {
        self.envelopes
            .lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// The most recently collected envelope
    pub fn last(&self) -> Option<Envelope> {
        self.envelopes.lock().last().cloned()
    }

    /// Clear all collected envelopes
    pub fn clear(&self) {
        self.envelopes.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Default for EnvelopeCollector {
    fn default() -> Self {
        Self::new()
    }
}
