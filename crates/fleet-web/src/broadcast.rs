//! Registry of connected client sessions.
//!
//! Every session owns an unbounded outbound queue that a per-connection
//! writer task drains into the socket. Delivering an event therefore never
//! waits on a slow client; a failed push only means the writer is gone, and
//! the session is dropped from the registry.

use std::collections::HashMap;

use fleet_core::event::Event;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier of one open client connection.
pub type SessionId = Uuid;

/// Sending half of a session's outbound queue of serialized events.
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Receiving half of a session's outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Tracks open sessions and fans events out to them.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, OutboundSender>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Called when a connection opens.
    pub fn register(&mut self, session: SessionId, outbound: OutboundSender) {
        self.sessions.insert(session, outbound);
        debug!(session = %session, sessions = self.sessions.len(), "Session registered");
    }

    /// Remove a session. Returns whether it was registered.
    pub fn unregister(&mut self, session: SessionId) -> bool {
        let removed = self.sessions.remove(&session).is_some();
        if removed {
            debug!(session = %session, sessions = self.sessions.len(), "Session unregistered");
        }
        removed
    }

    /// Send an event to a single session.
    ///
    /// A failed delivery unregisters the session. Returns whether the event
    /// was queued.
    pub fn send_to(&mut self, session: SessionId, event: &Event) -> bool {
        let Some(json) = encode(event) else {
            return false;
        };

        let delivered = self
            .sessions
            .get(&session)
            .is_some_and(|outbound| outbound.send(json).is_ok());

        if !delivered {
            debug!(session = %session, kind = event.kind(), "Delivery failed, dropping session");
            self.unregister(session);
        }
        delivered
    }

    /// Send an event to every registered session.
    ///
    /// The event is serialized once. Sessions that fail are removed after
    /// the full pass. Returns the number of sessions reached.
    pub fn broadcast(&mut self, event: &Event) -> usize {
        let Some(json) = encode(event) else {
            return 0;
        };

        let mut failed = Vec::new();
        let mut delivered = 0;
        for (session, outbound) in &self.sessions {
            if outbound.send(json.clone()).is_ok() {
                delivered += 1;
            } else {
                failed.push(*session);
            }
        }

        for session in failed {
            debug!(session = %session, kind = event.kind(), "Delivery failed, dropping session");
            self.unregister(session);
        }

        debug!(kind = event.kind(), id = event.id(), delivered, "Broadcast event");
        delivered
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn encode(event: &Event) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(kind = event.kind(), error = %e, "Failed to serialize event");
            None
        }
    }
}
