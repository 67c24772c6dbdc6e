//! Event system for session notifications
//!
//! Provides:
//! - Event types for connection lifecycle and traffic
//! - Event dispatcher for publishing events to subscribers
//!
//! The session manager publishes here so a front-end can react to a lost
//! connection without inspecting every `poll` result.

use crate::sequence::{SequenceId, SequenceReport};
use tokio::sync::broadcast;

/// Session event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A connection was opened
    Connected {
        /// Port the connection is bound to.
        port: String,
    },
    /// A connection was closed on request
    Disconnected {
        /// Port the connection was bound to.
        port: String,
    },
    /// A connection failed while reading and was force-closed
    ConnectionLost {
        /// Port the connection was bound to.
        port: String,
        /// The read error reported by the transport.
        detail: String,
    },
    /// Text was received and appended to a session
    DataReceived {
        /// Session the text was appended to.
        port: String,
        /// Decoded text.
        text: String,
    },
    /// Text was written and echoed into a session
    DataSent {
        /// Session the text was echoed into.
        port: String,
        /// Text including the line terminator.
        text: String,
    },
    /// A session buffer was emptied
    Cleared {
        /// Session that was cleared.
        port: String,
    },
    /// The active session changed
    ActiveChanged {
        /// Newly active session.
        port: String,
    },
    /// A send sequence finished or was cancelled
    SequenceFinished {
        /// Sequence handle.
        id: SequenceId,
        /// What happened to its items.
        report: SequenceReport,
    },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Connected { port } => write!(f, "Connected to {}", port),
            SessionEvent::Disconnected { port } => write!(f, "Disconnected from {}", port),
            SessionEvent::ConnectionLost { port, detail } => {
                write!(f, "Connection to {} lost: {}", port, detail)
            }
            SessionEvent::DataReceived { port, text } => {
                write!(f, "Received {} chars on {}", text.chars().count(), port)
            }
            SessionEvent::DataSent { port, text } => {
                write!(f, "Sent {} chars on {}", text.chars().count(), port)
            }
            SessionEvent::Cleared { port } => write!(f, "Cleared {}", port),
            SessionEvent::ActiveChanged { port } => write!(f, "Active session: {}", port),
            SessionEvent::SequenceFinished { id, report } => {
                write!(f, "Sequence {} finished: {}", id, report)
            }
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for session events.
    tx: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer (default 100)
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Create a new event dispatcher with default buffer size
    pub fn default_with_buffer() -> Self {
        Self::new(100)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::default_with_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_errors() {
        let dispatcher = EventDispatcher::default();
        assert_eq!(dispatcher.subscriber_count(), 0);
        assert!(dispatcher
            .publish(SessionEvent::Cleared {
                port: "COM1".to_string()
            })
            .is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let dispatcher = EventDispatcher::new(8);
        let mut rx = dispatcher.subscribe();

        dispatcher
            .publish(SessionEvent::Connected {
                port: "COM3".to_string(),
            })
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            SessionEvent::Connected {
                port: "COM3".to_string()
            }
        );
        assert_eq!(event.to_string(), "Connected to COM3");
    }

    #[test]
    fn test_display_lost() {
        let event = SessionEvent::ConnectionLost {
            port: "COM3".to_string(),
            detail: "broken pipe".to_string(),
        };
        assert_eq!(event.to_string(), "Connection to COM3 lost: broken pipe");
    }
}
