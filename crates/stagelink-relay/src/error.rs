//! Relay error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] stagelink_transport::TransportError),

    #[error("protocol error: {0}")]
    Core(#[from] stagelink_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
