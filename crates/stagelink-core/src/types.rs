//! Protocol types and message definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// A connection's fixed identity class.
///
/// Declared exactly once at connect time and immutable for the
/// connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Presenter,
    Audience,
    Tablet,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Presenter => "presenter",
            Role::Audience => "audience",
            Role::Tablet => "tablet",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "presenter" => Ok(Role::Presenter),
            "audience" => Ok(Role::Audience),
            "tablet" => Ok(Role::Tablet),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }
}

/// Unique identity of one logical connection.
///
/// A role that reconnects gets a fresh id, so duplicate detection must
/// key on this, never on the role alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a new random connection id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Message payload: the `{type, data}` portion of the wire envelope.
///
/// A closed tagged union — each kind carries only the fields valid for
/// it. Unknown kinds fail to decode and are dropped by receivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Client handshake: declares the connection's role
    Hello { role: Role },

    /// Relay accepts the handshake and assigns a connection id
    Welcome {
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },

    /// Relay refuses the handshake (duplicate role under strict policy)
    Rejected { reason: String },

    /// Connection/status notice
    System { message: String },

    /// Free-form chat/log message
    Text { message: String },

    /// Periodic capture from the audience device (base64 image)
    AudienceThumbnail { thumbnail: String },

    /// Heartbeat traffic; refreshes presence, never dispatched
    Keepalive,

    /// A peer's presence record became visible
    PeerJoined {
        role: Role,
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },

    /// A peer disconnected or timed out
    PeerLeft {
        role: Role,
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },

    // Playback control, directed at a remote player.
    Play,
    Pause,
    Seek { position: f64 },
    Mute,
    Unmute,
    Next,
    Previous,
    Load {
        #[serde(rename = "mediaId")]
        media_id: String,
    },
}

impl Payload {
    /// The wire `type` string for this payload, used as the dispatch key
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Hello { .. } => "hello",
            Payload::Welcome { .. } => "welcome",
            Payload::Rejected { .. } => "rejected",
            Payload::System { .. } => "system",
            Payload::Text { .. } => "text",
            Payload::AudienceThumbnail { .. } => "audience_thumbnail",
            Payload::Keepalive => "keepalive",
            Payload::PeerJoined { .. } => "peer_joined",
            Payload::PeerLeft { .. } => "peer_left",
            Payload::Play => "play",
            Payload::Pause => "pause",
            Payload::Seek { .. } => "seek",
            Payload::Mute => "mute",
            Payload::Unmute => "unmute",
            Payload::Next => "next",
            Payload::Previous => "previous",
            Payload::Load { .. } => "load",
        }
    }

    /// Whether this payload is a playback control command
    pub fn is_control(&self) -> bool {
        self.as_control().is_some()
    }

    /// Project into a [`ControlCommand`], if this is a control kind
    pub fn as_control(&self) -> Option<ControlCommand> {
        match self {
            Payload::Play => Some(ControlCommand::Play),
            Payload::Pause => Some(ControlCommand::Pause),
            Payload::Seek { position } => Some(ControlCommand::Seek {
                position: *position,
            }),
            Payload::Mute => Some(ControlCommand::Mute),
            Payload::Unmute => Some(ControlCommand::Unmute),
            Payload::Next => Some(ControlCommand::Next),
            Payload::Previous => Some(ControlCommand::Previous),
            Payload::Load { media_id } => Some(ControlCommand::Load {
                media_id: media_id.clone(),
            }),
            _ => None,
        }
    }
}

/// A playback control command, as applied to a local player.
///
/// Commands are state-setters: a later command supersedes an earlier
/// one, which is what makes the bus's at-most-once delivery acceptable.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Play,
    Pause,
    Seek { position: f64 },
    Mute,
    Unmute,
    Next,
    Previous,
    Load { media_id: String },
}

impl From<ControlCommand> for Payload {
    fn from(cmd: ControlCommand) -> Self {
        match cmd {
            ControlCommand::Play => Payload::Play,
            ControlCommand::Pause => Payload::Pause,
            ControlCommand::Seek { position } => Payload::Seek { position },
            ControlCommand::Mute => Payload::Mute,
            ControlCommand::Unmute => Payload::Unmute,
            ControlCommand::Next => Payload::Next,
            ControlCommand::Previous => Payload::Previous,
            ControlCommand::Load { media_id } => Payload::Load { media_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Presenter, Role::Audience, Role::Tablet] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("operator".parse::<Role>().is_err());
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_control_projection_round_trip() {
        let cmd = ControlCommand::Seek { position: 42.0 };
        let payload: Payload = cmd.clone().into();
        assert_eq!(payload.as_control(), Some(cmd));
        assert!(payload.is_control());
    }

    #[test]
    fn test_non_control_kinds_do_not_project() {
        let payload = Payload::Text {
            message: "hi".to_string(),
        };
        assert_eq!(payload.as_control(), None);
        assert!(!payload.is_control());
    }
}
