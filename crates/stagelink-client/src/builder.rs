//! Client configuration builder.

use std::time::Duration;

use stagelink_core::Role;

use crate::backoff::BackoffPolicy;
use crate::client::{ClientOptions, StageLink};
use crate::error::ConnectError;

/// Configure and connect a [`StageLink`] client.
///
/// ```no_run
/// # use stagelink_client::StageLinkBuilder;
/// # use stagelink_core::Role;
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = StageLinkBuilder::new("ws://localhost:8080", Role::Presenter)
///     .connect_timeout(std::time::Duration::from_secs(3))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct StageLinkBuilder {
    endpoint: String,
    role: Role,
    connect_timeout: Duration,
    outbound_capacity: usize,
    backoff: BackoffPolicy,
    auto_reconnect: bool,
    keepalive_interval: Option<Duration>,
}

impl StageLinkBuilder {
    pub fn new(endpoint: impl Into<String>, role: Role) -> Self {
        Self {
            endpoint: endpoint.into(),
            role,
            connect_timeout: Duration::from_secs(5),
            outbound_capacity: 64,
            backoff: BackoffPolicy::default(),
            auto_reconnect: true,
            keepalive_interval: Some(Duration::from_secs(5)),
        }
    }

    /// Timeout covering both the dial and the hello/welcome handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Capacity of the bounded outbound queue; sends fail once it fills.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    /// Disable automatic reconnection after an unexpected session drop.
    pub fn no_reconnect(mut self) -> Self {
        self.auto_reconnect = false;
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }

    /// Send no keepalive traffic. An otherwise idle client will be
    /// evicted by the relay's presence sweeper.
    pub fn no_keepalive(mut self) -> Self {
        self.keepalive_interval = None;
        self
    }

    /// Dial the relay, complete the handshake, and start the session
    /// supervisor.
    pub async fn connect(self) -> Result<StageLink, ConnectError> {
        StageLink::connect_with(ClientOptions {
            endpoint: self.endpoint,
            role: self.role,
            connect_timeout: self.connect_timeout,
            outbound_capacity: self.outbound_capacity,
            backoff: self.backoff,
            auto_reconnect: self.auto_reconnect,
            keepalive_interval: self.keepalive_interval,
        })
        .await
    }
}
