//! Inbound message dispatch.
//!
//! Handlers are keyed by envelope kind. Registering a handler for a
//! kind that already has one replaces the previous handler. Envelopes
//! with no registered handler are dropped with a debug log.

use std::collections::HashMap;

use parking_lot::RwLock;
use stagelink_core::Envelope;
use tracing::debug;

/// Callback invoked with a delivered envelope.
pub type EnvelopeHandler = Box<dyn Fn(Envelope) + Send + Sync>;

pub(crate) struct Dispatcher {
    handlers: RwLock<HashMap<String, EnvelopeHandler>>,
    /// Optional raw tap, invoked for every delivered envelope before
    /// kind-specific handlers. At most one; re-setting replaces it.
    tap: RwLock<Option<EnvelopeHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            tap: RwLock::new(None),
        }
    }

    pub fn register(&self, kind: &str, handler: EnvelopeHandler) {
        if self.handlers.write().insert(kind.to_string(), handler).is_some() {
            debug!(kind, "Replaced existing handler");
        }
    }

    pub fn unregister(&self, kind: &str) -> bool {
        self.handlers.write().remove(kind).is_some()
    }

    pub fn set_tap(&self, handler: EnvelopeHandler) {
        *self.tap.write() = Some(handler);
    }

    pub fn dispatch(&self, envelope: Envelope) {
        if let Some(tap) = self.tap.read().as_ref() {
            tap(envelope.clone());
        }
        match self.handlers.read().get(envelope.kind()) {
            Some(handler) => handler(envelope),
            None => debug!(kind = envelope.kind(), "No handler registered, dropping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use stagelink_core::{Payload, Role};

    fn text_envelope(message: &str) -> Envelope {
        Envelope::new(
            Payload::Text { message: message.into() },
            Role::Presenter,
            1,
        )
    }

    #[test]
    fn dispatches_by_kind() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        dispatcher.register(
            "text",
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatcher.dispatch(text_envelope("hi"));
        dispatcher.dispatch(Envelope::new(Payload::Play, Role::Presenter, 2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reregistering_replaces_the_handler() {
        let dispatcher = Dispatcher::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let counter = first.clone();
        dispatcher.register(
            "text",
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let counter = second.clone();
        dispatcher.register(
            "text",
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatcher.dispatch(text_envelope("hi"));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tap_sees_every_envelope() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        dispatcher.set_tap(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        dispatcher.dispatch(text_envelope("a"));
        dispatcher.dispatch(Envelope::new(Payload::Pause, Role::Tablet, 3));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregister_removes_the_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher.register("text", Box::new(|_| {}));
        assert!(dispatcher.unregister("text"));
        assert!(!dispatcher.unregister("text"));
    }
}
