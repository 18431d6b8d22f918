//! Event types for the contest event system
//!
//! Provides the shared event definitions and the EventBus used to push
//! round and telecast changes to connected clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::{Round, RoundStatus};

/// Contest event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContestEvent {
    /// Admin moved a round to a new status
    RoundStatusChanged {
        round: Round,
        status: RoundStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Telecast switched on or off
    ///
    /// Clients show the video overlay while `active` is true.
    TelecastChanged {
        active: bool,
        video_url: Option<String>,
        message: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Ranks were recomputed
    RankingsUpdated {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An AI grading job finished (successfully or not)
    EvaluationJobFinished {
        job_id: String,
        round: Round,
        succeeded: i64,
        failed: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ContestEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            ContestEvent::RoundStatusChanged { .. } => "RoundStatusChanged",
            ContestEvent::TelecastChanged { .. } => "TelecastChanged",
            ContestEvent::RankingsUpdated { .. } => "RankingsUpdated",
            ContestEvent::EvaluationJobFinished { .. } => "EvaluationJobFinished",
        }
    }
}

/// Broadcast bus for contest events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ContestEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ContestEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ContestEvent,
    ) -> Result<usize, broadcast::error::SendError<ContestEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ContestEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ContestEvent::RoundStatusChanged {
            round: Round::Debugging,
            status: RoundStatus::Active,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RoundStatusChanged");
        assert_eq!(json["round"], 2);
        assert_eq!(json["status"], "active");
        assert_eq!(event.event_type(), "RoundStatusChanged");
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let event = ContestEvent::RankingsUpdated {
            timestamp: chrono::Utc::now(),
        };
        bus.emit(event.clone()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        let event = ContestEvent::RankingsUpdated {
            timestamp: chrono::Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        // Lossy variant never fails
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
