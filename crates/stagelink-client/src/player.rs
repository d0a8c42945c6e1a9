//! Receiver-side playback state machine.
//!
//! The player applies [`ControlCommand`]s deterministically: every
//! command is a state-setter, so replaying the latest command from each
//! sender converges all receivers to the same state regardless of
//! drops in between.

use stagelink_core::{Catalog, ControlCommand, MediaItem};
use tracing::debug;

/// Playback state driven by inbound control commands.
#[derive(Debug, Clone)]
pub struct Player {
    catalog: Catalog,
    current_id: Option<String>,
    playing: bool,
    muted: bool,
    position: f64,
}

impl Player {
    /// Create a player positioned at the catalog's first item, paused.
    pub fn new(catalog: Catalog) -> Self {
        let current_id = catalog.first().map(|item| item.id.clone());
        Self {
            catalog,
            current_id,
            playing: false,
            muted: false,
            position: 0.0,
        }
    }

    /// Apply a control command to the local state.
    ///
    /// Seek positions are clamped to the current item's duration on the
    /// receiving side, so a stale seek for a longer item lands at the
    /// end of the current one instead of out of range. Loads for ids not
    /// in the local catalog are dropped.
    pub fn apply(&mut self, command: &ControlCommand) {
        match command {
            ControlCommand::Play => self.playing = true,
            ControlCommand::Pause => self.playing = false,
            ControlCommand::Mute => self.muted = true,
            ControlCommand::Unmute => self.muted = false,
            ControlCommand::Seek { position } => {
                self.position = self.clamp_position(*position);
            }
            ControlCommand::Next => {
                if let Some(index) = self.current_index() {
                    self.switch_to_index(index + 1);
                }
            }
            ControlCommand::Previous => {
                if let Some(index) = self.current_index() {
                    if index > 0 {
                        self.switch_to_index(index - 1);
                    }
                }
            }
            ControlCommand::Load { media_id } => {
                if self.catalog.get(media_id).is_some() {
                    self.current_id = Some(media_id.clone());
                    self.position = 0.0;
                } else {
                    debug!(media_id, "Load for unknown media id, ignoring");
                }
            }
        }
    }

    fn current_index(&self) -> Option<usize> {
        self.current_id.as_deref().and_then(|id| self.catalog.position(id))
    }

    fn switch_to_index(&mut self, index: usize) {
        if let Some(item) = self.catalog.at(index) {
            self.current_id = Some(item.id.clone());
            self.position = 0.0;
        }
    }

    fn clamp_position(&self, position: f64) -> f64 {
        let clamped = position.max(0.0);
        match self.current().and_then(|item| item.duration_seconds) {
            Some(duration) => clamped.min(duration),
            None => clamped,
        }
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.current_id.as_deref().and_then(|id| self.catalog.get(id))
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagelink_core::{MediaItem, MediaKind};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            MediaItem {
                id: "1".to_string(),
                name: "Welcome Video".to_string(),
                kind: MediaKind::Video,
                source_url: "https://example.com/welcome.mp4".to_string(),
                duration_seconds: Some(60.0),
            },
            MediaItem {
                id: "2".to_string(),
                name: "Product Demo".to_string(),
                kind: MediaKind::Video,
                source_url: "https://example.com/demo.mp4".to_string(),
                duration_seconds: Some(120.0),
            },
            MediaItem {
                id: "3".to_string(),
                name: "Company Logo".to_string(),
                kind: MediaKind::Image,
                source_url: "https://example.com/logo.png".to_string(),
                duration_seconds: None,
            },
        ])
    }

    #[test]
    fn starts_on_first_item_paused() {
        let player = Player::new(catalog());
        assert_eq!(player.current_id(), Some("1"));
        assert!(!player.is_playing());
        assert_eq!(player.position(), 0.0);
    }

    #[test]
    fn play_pause_mute_are_state_setters() {
        let mut player = Player::new(catalog());
        player.apply(&ControlCommand::Play);
        player.apply(&ControlCommand::Play);
        assert!(player.is_playing());

        player.apply(&ControlCommand::Mute);
        assert!(player.is_muted());
        player.apply(&ControlCommand::Unmute);
        assert!(!player.is_muted());

        player.apply(&ControlCommand::Pause);
        assert!(!player.is_playing());
    }

    #[test]
    fn seek_clamps_to_item_duration() {
        let mut player = Player::new(catalog());
        player.apply(&ControlCommand::Load { media_id: "2".to_string() });

        player.apply(&ControlCommand::Seek { position: -5.0 });
        assert_eq!(player.position(), 0.0);

        player.apply(&ControlCommand::Seek { position: 999.0 });
        assert_eq!(player.position(), 120.0);

        player.apply(&ControlCommand::Seek { position: 42.5 });
        assert_eq!(player.position(), 42.5);
    }

    #[test]
    fn seek_without_known_duration_only_clamps_below() {
        let mut player = Player::new(catalog());
        player.apply(&ControlCommand::Load { media_id: "3".to_string() });

        player.apply(&ControlCommand::Seek { position: 999.0 });
        assert_eq!(player.position(), 999.0);
        player.apply(&ControlCommand::Seek { position: -1.0 });
        assert_eq!(player.position(), 0.0);
    }

    #[test]
    fn next_and_previous_saturate_at_the_ends() {
        let mut player = Player::new(catalog());
        player.apply(&ControlCommand::Previous);
        assert_eq!(player.current_id(), Some("1"));

        player.apply(&ControlCommand::Next);
        player.apply(&ControlCommand::Next);
        assert_eq!(player.current_id(), Some("3"));
        player.apply(&ControlCommand::Next);
        assert_eq!(player.current_id(), Some("3"));
    }

    #[test]
    fn load_unknown_id_is_ignored() {
        let mut player = Player::new(catalog());
        player.apply(&ControlCommand::Load { media_id: "99".to_string() });
        assert_eq!(player.current_id(), Some("1"));
    }

    #[test]
    fn load_resets_position() {
        let mut player = Player::new(catalog());
        player.apply(&ControlCommand::Seek { position: 30.0 });
        player.apply(&ControlCommand::Load { media_id: "2".to_string() });
        assert_eq!(player.position(), 0.0);
    }
}
