//! Client-side error types.
//!
//! Connection establishment and send paths have separate, small error
//! surfaces so callers can match on exactly the failures they can react
//! to. Everything else folds into [`ClientError`].

use thiserror::Error;

/// Failures while establishing (or re-establishing) a relay session.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The endpoint could not be reached at the transport level.
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// The transport connected but the handshake did not complete in time.
    #[error("Connection timed out")]
    Timeout,

    /// The relay refused the session (capacity, role conflict).
    #[error("Connection rejected: {0}")]
    Rejected(String),
}

/// Failures on the outbound send path. Sending never blocks the caller:
/// a full queue or a missing session fails immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// No active session; the envelope was not queued.
    #[error("Not connected")]
    NotConnected,

    /// The bounded outbound queue is full; the envelope was dropped.
    #[error("Outbound queue full")]
    BackpressureExceeded,
}

/// Failure reported by an injected external capability
/// (video call provider, capture pipeline).
#[derive(Error, Debug)]
#[error("External capability error: {0}")]
pub struct ExternalCapabilityError(pub String);

/// Umbrella error for client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] stagelink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] stagelink_transport::TransportError),

    #[error(transparent)]
    Capability(#[from] ExternalCapabilityError),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
