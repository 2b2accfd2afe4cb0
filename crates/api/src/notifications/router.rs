//! Event-to-WebSocket routing.
//!
//! [`NotificationRouter`] subscribes to the event bus and broadcasts every
//! [`PipelineEvent`] to all connected dashboards as a JSON text frame:
//!
//! ```text
//! { "kind": "event", "type": "job.progress", "job_id": ..., "video": ...,
//!   "payload": { ... }, "timestamp": ... }
//! ```

use std::sync::Arc;

use axum::extract::ws::Message;
use railwatch_events::PipelineEvent;
use serde_json::json;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Broadcasts pipeline events to dashboard connections.
pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the routing loop.
    ///
    /// Exits when the channel is closed (i.e. the
    /// [`EventBus`](railwatch_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PipelineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::debug!(event_type = %event.event_type, "Forwarding pipeline event");
                    self.ws_manager.broadcast(event_message(&event)).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }
}

/// Encode an event as the WebSocket text frame dashboards receive.
pub fn event_message(event: &PipelineEvent) -> Message {
    let body = json!({
        "kind": "event",
        "type": event.event_type,
        "job_id": event.job_id,
        "video": event.video,
        "payload": event.payload,
        "timestamp": event.timestamp,
    });
    Message::Text(body.to_string().into())
}

#[cfg(test)]
mod tests {
    use railwatch_core::job_events::EVENT_JOB_COMPLETED;
    use railwatch_events::EventBus;

    use super::*;

    #[test]
    fn event_message_carries_type_and_payload() {
        let event = PipelineEvent::new(EVENT_JOB_COMPLETED)
            .with_video("http://localhost/files/videos/1_a.mp4")
            .with_payload(json!({ "alerts_emitted": 2 }));

        let Message::Text(text) = event_message(&event) else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["kind"], "event");
        assert_eq!(value["type"], "job.completed");
        assert_eq!(value["payload"]["alerts_emitted"], 2);
        assert_eq!(value["video"], "http://localhost/files/videos/1_a.mp4");
    }

    #[tokio::test]
    async fn router_broadcasts_until_bus_closes() {
        let ws_manager = Arc::new(WsManager::new());
        let (_tx, mut rx) = ws_manager.add("conn".into()).await;
        let bus = EventBus::default();

        let handle = tokio::spawn(NotificationRouter::new(Arc::clone(&ws_manager)).run(bus.subscribe()));
        bus.publish(PipelineEvent::new(EVENT_JOB_COMPLETED));

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, Message::Text(t) if t.as_str().contains("job.completed")));

        drop(bus);
        handle.await.unwrap();
    }
}
