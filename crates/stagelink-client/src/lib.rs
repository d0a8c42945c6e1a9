//! StageLink client
//!
//! Per-device handle to the coordination channel: connects to the
//! relay, declares a role, exchanges envelopes, and keeps local mirrors
//! (presence, thumbnails, player state) converged from inbound traffic.
//!
//! Delivery is at-most-once: the client never buffers for offline
//! peers, and all shared state is written so the latest value wins.

pub mod backoff;
pub mod builder;
pub mod capability;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod player;
pub mod presence;
pub mod thumbnails;

pub use backoff::BackoffPolicy;
pub use builder::StageLinkBuilder;
pub use capability::{
    CallConfig, CapturePipeline, MeetingConfig, Participant, ParticipantEvent, StreamHandle,
    VideoCall,
};
pub use client::{ConnectionStatus, StageLink};
pub use dispatch::EnvelopeHandler;
pub use error::{ClientError, ConnectError, ExternalCapabilityError, Result, SendError};
pub use player::Player;
pub use presence::Peer;
pub use thumbnails::{encode_frame, ThumbnailFrame, ThumbnailStore};

/// Common imports for client applications.
pub mod prelude {
    pub use crate::builder::StageLinkBuilder;
    pub use crate::client::{ConnectionStatus, StageLink};
    pub use crate::error::{ConnectError, SendError};
    pub use crate::player::Player;
    pub use stagelink_core::{Catalog, ControlCommand, Envelope, MediaItem, Payload, Role};
}
