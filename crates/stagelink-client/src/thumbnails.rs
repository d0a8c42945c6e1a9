//! Latest-wins thumbnail store.
//!
//! Thumbnail frames are pure state: each new frame from a role replaces
//! the previous one, and a dropped frame is simply superseded by the
//! next capture. Nothing here queues or retries.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use dashmap::DashMap;
use stagelink_core::{Role, Timestamp};
use tracing::warn;

/// One decoded thumbnail frame.
#[derive(Debug, Clone)]
pub struct ThumbnailFrame {
    pub source_role: Role,
    pub image_data: Bytes,
    /// Sender timestamp from the envelope, milliseconds.
    pub captured_at: Timestamp,
}

/// Retains only the most recent frame per source role.
#[derive(Default)]
pub struct ThumbnailStore {
    frames: DashMap<Role, ThumbnailFrame>,
}

impl ThumbnailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and store a frame, replacing any previous frame from the
    /// same role. Frames that fail base64 decoding are dropped.
    pub fn store(&self, source_role: Role, encoded: &str, captured_at: Timestamp) {
        match BASE64.decode(encoded) {
            Ok(data) => {
                self.frames.insert(
                    source_role,
                    ThumbnailFrame {
                        source_role,
                        image_data: Bytes::from(data),
                        captured_at,
                    },
                );
            }
            Err(err) => {
                warn!(role = %source_role, %err, "Dropping undecodable thumbnail frame");
            }
        }
    }

    /// The most recent frame from a role, if any.
    pub fn latest(&self, role: Role) -> Option<ThumbnailFrame> {
        self.frames.get(&role).map(|entry| entry.clone())
    }

    pub fn clear(&self) {
        self.frames.clear();
    }
}

/// Encode raw image bytes for the wire.
pub fn encode_frame(data: &[u8]) -> String {
    BASE64.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_frame_wins() {
        let store = ThumbnailStore::new();
        store.store(Role::Audience, &encode_frame(b"first"), 1);
        store.store(Role::Audience, &encode_frame(b"second"), 2);

        let frame = store.latest(Role::Audience).unwrap();
        assert_eq!(&frame.image_data[..], b"second");
        assert_eq!(frame.captured_at, 2);
    }

    #[test]
    fn roles_are_independent() {
        let store = ThumbnailStore::new();
        store.store(Role::Audience, &encode_frame(b"aud"), 1);
        store.store(Role::Tablet, &encode_frame(b"tab"), 1);

        assert_eq!(&store.latest(Role::Audience).unwrap().image_data[..], b"aud");
        assert_eq!(&store.latest(Role::Tablet).unwrap().image_data[..], b"tab");
        assert!(store.latest(Role::Presenter).is_none());
    }

    #[test]
    fn bad_base64_is_dropped_keeping_previous() {
        let store = ThumbnailStore::new();
        store.store(Role::Audience, &encode_frame(b"good"), 1);
        store.store(Role::Audience, "not$valid$base64", 2);

        let frame = store.latest(Role::Audience).unwrap();
        assert_eq!(&frame.image_data[..], b"good");
    }
}
