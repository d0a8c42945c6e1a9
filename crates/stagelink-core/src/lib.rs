//! StageLink Core
//!
//! Core types and protocol primitives for the StageLink coordination
//! channel.
//!
//! This crate provides:
//! - The wire envelope and message taxonomy ([`Envelope`], [`Payload`])
//! - Client roles and connection identity ([`Role`], [`ConnectionId`])
//! - Media catalog types ([`MediaItem`], [`Catalog`])
//! - Receiver-side command ordering ([`Sequencer`])
//! - Timestamp utilities ([`time`])

pub mod codec;
pub mod envelope;
pub mod error;
pub mod media;
pub mod sequencer;
pub mod time;
pub mod types;

pub use codec::{decode, encode};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use media::{Catalog, MediaItem, MediaKind};
pub use sequencer::{Sequencer, REORDER_WINDOW};
pub use time::Timestamp;
pub use types::{ConnectionId, ControlCommand, Payload, Role};

/// Protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Default WebSocket port
pub const DEFAULT_WS_PORT: u16 = 8080;

/// Default relay endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";
