//! Injected external capabilities.
//!
//! Video conferencing and local frame capture are provided by the host
//! application, not this crate. The client only defines the seams and
//! surfaces failures as [`ExternalCapabilityError`]; no session logic
//! depends on either capability being present.

use async_trait::async_trait;

use crate::error::ExternalCapabilityError;

/// Opaque handle to a provider-owned media stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub id: String,
}

/// Credentials for the conferencing provider.
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub sdk_key: String,
    pub sdk_secret: String,
}

/// Parameters for joining one meeting.
#[derive(Debug, Clone)]
pub struct MeetingConfig {
    pub topic: String,
    pub user_name: String,
    pub password: String,
}

/// A remote participant as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub video_on: bool,
}

/// Participant lifecycle notifications from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantEvent {
    Joined(Participant),
    Left { id: String },
    VideoStateChanged { id: String, video_on: bool },
}

/// Callback invoked with participant lifecycle events.
pub type ParticipantCallback = Box<dyn Fn(ParticipantEvent) + Send + Sync>;

/// Video conferencing provider seam.
#[async_trait]
pub trait VideoCall: Send + Sync {
    async fn initialize(&self, config: &CallConfig) -> Result<(), ExternalCapabilityError>;

    async fn join(&self, meeting: &MeetingConfig) -> Result<(), ExternalCapabilityError>;

    async fn leave(&self) -> Result<(), ExternalCapabilityError>;

    /// Start the local video feed, returning a handle to its stream.
    async fn start_video(&self) -> Result<StreamHandle, ExternalCapabilityError>;

    async fn stop_video(&self) -> Result<(), ExternalCapabilityError>;

    async fn start_audio(&self) -> Result<(), ExternalCapabilityError>;

    async fn stop_audio(&self) -> Result<(), ExternalCapabilityError>;

    /// Register for participant lifecycle events. Re-registering
    /// replaces the previous callback.
    fn on_participant_event(&self, callback: ParticipantCallback);

    fn participants(&self) -> Vec<Participant>;
}

/// Local frame-processing seam (background removal and similar
/// transforms applied to a captured stream before display or capture).
pub trait CapturePipeline: Send + Sync {
    /// Process a source stream, returning the transformed stream.
    fn process(&self, source: &StreamHandle) -> Result<StreamHandle, ExternalCapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    struct FakeCall {
        joined: RwLock<bool>,
        roster: RwLock<Vec<Participant>>,
        callback: RwLock<Option<ParticipantCallback>>,
    }

    impl FakeCall {
        fn new() -> Self {
            Self {
                joined: RwLock::new(false),
                roster: RwLock::new(Vec::new()),
                callback: RwLock::new(None),
            }
        }

        fn simulate_join(&self, participant: Participant) {
            self.roster.write().push(participant.clone());
            if let Some(cb) = self.callback.read().as_ref() {
                cb(ParticipantEvent::Joined(participant));
            }
        }
    }

    #[async_trait]
    impl VideoCall for FakeCall {
        async fn initialize(&self, _config: &CallConfig) -> Result<(), ExternalCapabilityError> {
            Ok(())
        }

        async fn join(&self, _meeting: &MeetingConfig) -> Result<(), ExternalCapabilityError> {
            *self.joined.write() = true;
            Ok(())
        }

        async fn leave(&self) -> Result<(), ExternalCapabilityError> {
            *self.joined.write() = false;
            Ok(())
        }

        async fn start_video(&self) -> Result<StreamHandle, ExternalCapabilityError> {
            if *self.joined.read() {
                Ok(StreamHandle { id: "local".to_string() })
            } else {
                Err(ExternalCapabilityError("not in a meeting".to_string()))
            }
        }

        async fn stop_video(&self) -> Result<(), ExternalCapabilityError> {
            Ok(())
        }

        async fn start_audio(&self) -> Result<(), ExternalCapabilityError> {
            Ok(())
        }

        async fn stop_audio(&self) -> Result<(), ExternalCapabilityError> {
            Ok(())
        }

        fn on_participant_event(&self, callback: ParticipantCallback) {
            *self.callback.write() = Some(callback);
        }

        fn participants(&self) -> Vec<Participant> {
            self.roster.read().clone()
        }
    }

    #[tokio::test]
    async fn video_requires_an_active_meeting() {
        let call = FakeCall::new();
        assert!(call.start_video().await.is_err());

        let meeting = MeetingConfig {
            topic: "demo".to_string(),
            user_name: "presenter".to_string(),
            password: String::new(),
        };
        call.join(&meeting).await.unwrap();
        let handle = call.start_video().await.unwrap();
        assert_eq!(handle.id, "local");
    }

    #[tokio::test]
    async fn participant_events_reach_the_callback() {
        let call = FakeCall::new();
        let seen = std::sync::Arc::new(RwLock::new(Vec::new()));
        let sink = seen.clone();
        call.on_participant_event(Box::new(move |event| {
            sink.write().push(event);
        }));

        call.simulate_join(Participant {
            id: "p1".to_string(),
            display_name: "Alice".to_string(),
            video_on: true,
        });

        assert_eq!(call.participants().len(), 1);
        assert_eq!(seen.read().len(), 1);
    }
}
