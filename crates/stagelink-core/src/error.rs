//! Error types for StageLink core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// StageLink protocol error types
#[derive(Error, Debug)]
pub enum Error {
    /// JSON encoding error
    #[error("encode error: {0}")]
    Encode(String),

    /// JSON decoding error
    #[error("decode error: {0}")]
    Decode(String),

    /// Role string not in the recognized set
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Generic protocol violation
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
