//! Outbound event hub.
//!
//! A single bounded broadcast channel carries every outbound event.
//! Subscribers that fall behind lose the oldest messages; senders never
//! block.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use pulse_core::SessionId;

use crate::events::ServerEvent;

/// An outbound event and who it is for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outbound {
    /// `None` means every connected client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<SessionId>,
    pub event: ServerEvent,
}

impl Outbound {
    /// Whether a client with this session id should receive the event.
    pub fn is_for(&self, session_id: &str) -> bool {
        self.to.as_deref().is_none_or(|to| to == session_id)
    }
}

/// Fan-out of server events to subscribers.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Outbound>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }

    /// Send to every client.
    pub fn broadcast(&self, event: ServerEvent) {
        self.publish(Outbound { to: None, event });
    }

    /// Send to one client session.
    pub fn send_to(&self, session_id: &str, event: ServerEvent) {
        self.publish(Outbound {
            to: Some(session_id.to_string()),
            event,
        });
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, outbound: Outbound) {
        let kind = outbound.event.kind();
        // No subscribers is not an error; the event is simply dropped.
        if self.tx.send(outbound).is_err() {
            trace!(kind, "no subscribers, event dropped");
        }
    }
}
