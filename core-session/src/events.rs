//! Session Event Bus
//!
//! Broadcast channel for auth-state changes. Host UIs subscribe to learn
//! about sign-in, sign-out, and refresh outcomes without polling
//! `is_authenticated`; in particular, an irrecoverable refresh failure
//! surfaces here as `SignedOut` so the surrounding application can route the
//! user back to its sign-in flow.

use tokio::sync::broadcast;

/// Auth-state change emitted by the session core.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A login or register response delivered a token set.
    SignedIn,
    /// The token set was cleared, by logout or by an irrecoverable refresh
    /// failure.
    SignedOut,
    /// A refresh completed; `expires_at` is the new expiry in epoch
    /// milliseconds.
    TokenRefreshed { expires_at: i64 },
    /// A refresh attempt failed. The token set may have been cleared by the
    /// caller; a `SignedOut` follows when it was.
    RefreshFailed { reason: String },
}

/// Cloneable handle to the session broadcast channel.
///
/// Events are fire-and-forget: emitting with no subscribers is not an error
/// worth surfacing, and slow subscribers miss events rather than applying
/// backpressure.
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a bus able to buffer `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.sender.send(event)
    }

    /// Open a new subscription receiving events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscriber() {
        let events = SessionEvents::new(8);
        let mut receiver = events.subscribe();

        events.emit(SessionEvent::SignedIn).unwrap();
        events
            .emit(SessionEvent::TokenRefreshed {
                expires_at: 1_700_000_000_000,
            })
            .unwrap();

        assert_eq!(receiver.try_recv().unwrap(), SessionEvent::SignedIn);
        assert!(matches!(
            receiver.try_recv().unwrap(),
            SessionEvent::TokenRefreshed { .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_an_error_callers_ignore() {
        let events = SessionEvents::new(8);
        assert!(events.emit(SessionEvent::SignedOut).is_err());
    }
}
