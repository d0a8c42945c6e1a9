//! JSON codec for the wire envelope
//!
//! The bus is a text-message channel: envelopes travel as UTF-8 JSON,
//! one object per WebSocket text frame.

use crate::envelope::Envelope;
use crate::error::{Error, Result};

/// Encode an envelope to its wire form
pub fn encode(envelope: &Envelope) -> Result<String> {
    serde_json::to_string(envelope).map_err(|e| Error::Encode(e.to_string()))
}

/// Decode an envelope from a received text frame
pub fn decode(text: &str) -> Result<Envelope> {
    serde_json::from_str(text).map_err(|e| Error::Decode(e.to_string()))
}
