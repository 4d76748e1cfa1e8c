//! Progress events.
//!
//! Events are fire-and-forget: publishing never waits for, or fails on,
//! the absence of subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted for host analytics and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// An attempts row was created or updated from a remote report.
    ProgressUpdated {
        /// Host context of the course module.
        context_ref: String,
        /// Row id of the attempt.
        attempt_id: i64,
        activity_id: i64,
    },
}

impl ProgressEvent {
    /// Get a description of the event for logging.
    pub fn description(&self) -> String {
        match self {
            Self::ProgressUpdated {
                context_ref,
                attempt_id,
                activity_id,
            } => format!(
                "Progress updated: attempt {} of activity {} ({})",
                attempt_id, activity_id, context_ref
            ),
        }
    }
}

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcaster for progress events.
#[derive(Clone)]
pub struct ProgressEventBroadcaster {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressEventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Publish an event.
    ///
    /// Returns the number of receivers that received the event.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        tracing::debug!("Publishing progress event: {}", event.description());
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ProgressEvent {
        ProgressEvent::ProgressUpdated {
            context_ref: "module:4".to_string(),
            attempt_id: 11,
            activity_id: 3,
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = ProgressEventBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(event()), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let broadcaster = ProgressEventBroadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();
        assert_eq!(broadcaster.publish(event()), 2);
        assert_eq!(rx1.recv().await.unwrap(), event());
        assert_eq!(rx2.recv().await.unwrap(), event());
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(event()).unwrap();
        assert_eq!(value["event"], "progress_updated");
        assert_eq!(value["attempt_id"], 11);
    }
}
