//! Service-wide form events and the EventBus that carries them
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::pages::PageKind;

/// Form service event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FormEvent {
    /// A form session was opened for a page
    SessionOpened {
        session_id: Uuid,
        page: PageKind,
        timestamp: DateTime<Utc>,
    },

    /// A session published a new preview
    ///
    /// Only the score summary travels here; the full preview goes out on the
    /// session's own stream.
    PreviewUpdated {
        session_id: Uuid,
        page: PageKind,
        /// Recompute ticket that produced the preview
        sequence: u64,
        total: f64,
        percentage: f64,
        category: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A record was written under its storage key
    RecordSaved {
        session_id: Uuid,
        page: PageKind,
        key: String,
        timestamp: DateTime<Utc>,
    },

    /// Save was refused because required fields are missing
    SaveRejected {
        session_id: Uuid,
        page: PageKind,
        fields: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A saved record was loaded back into a session
    RecordLoaded {
        session_id: Uuid,
        page: PageKind,
        timestamp: DateTime<Utc>,
    },

    /// Saved record and history of a page were removed
    HistoryCleared {
        page: PageKind,
        timestamp: DateTime<Utc>,
    },

    ExportCompleted {
        session_id: Uuid,
        page: PageKind,
        file_name: String,
        page_count: usize,
        timestamp: DateTime<Utc>,
    },

    ExportFailed {
        session_id: Uuid,
        page: PageKind,
        message: String,
        timestamp: DateTime<Utc>,
    },

    SessionClosed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Member registry changed (add, update or delete)
    MembersChanged {
        member_id: String,
        action: MemberAction,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberAction {
    Added,
    Updated,
    Deleted,
}

impl FormEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            FormEvent::SessionOpened { .. } => "SessionOpened",
            FormEvent::PreviewUpdated { .. } => "PreviewUpdated",
            FormEvent::RecordSaved { .. } => "RecordSaved",
            FormEvent::SaveRejected { .. } => "SaveRejected",
            FormEvent::RecordLoaded { .. } => "RecordLoaded",
            FormEvent::HistoryCleared { .. } => "HistoryCleared",
            FormEvent::ExportCompleted { .. } => "ExportCompleted",
            FormEvent::ExportFailed { .. } => "ExportFailed",
            FormEvent::SessionClosed { .. } => "SessionClosed",
            FormEvent::MembersChanged { .. } => "MembersChanged",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// see a `Lagged` error instead of stalling producers, and receivers clean
/// up when dropped.
///
/// ```
/// use uhan_common::events::{EventBus, FormEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(FormEvent::SessionClosed {
///     session_id: uuid::Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FormEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: FormEvent) -> Result<usize, broadcast::error::SendError<FormEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FormEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = FormEvent::PreviewUpdated {
            session_id: Uuid::nil(),
            page: PageKind::UlciCard,
            sequence: 3,
            total: 76.0,
            percentage: 76.0,
            category: Some("B - Active Citizen".to_string()),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "PreviewUpdated");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PreviewUpdated");
        assert_eq!(json["page"], "ulci-card");
        assert_eq!(json["sequence"], 3);

        let back: FormEvent = serde_json::from_value(json).unwrap();
        assert!(matches!(back, FormEvent::PreviewUpdated { sequence: 3, .. }));
    }

    #[test]
    fn test_member_action_snake_case() {
        let event = FormEvent::MembersChanged {
            member_id: "DAO123".to_string(),
            action: MemberAction::Deleted,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "deleted");
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        let event = FormEvent::HistoryCleared {
            page: PageKind::Parent,
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(10);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let count = bus
            .emit(FormEvent::SessionClosed {
                session_id: Uuid::nil(),
                timestamp: Utc::now(),
            })
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(a.recv().await.unwrap().event_type(), "SessionClosed");
        assert_eq!(b.recv().await.unwrap().event_type(), "SessionClosed");
    }
}
