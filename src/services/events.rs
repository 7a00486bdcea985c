//! Outbound domain event emission
//!
//! Fire-and-forget with an opaque string payload and no delivery guarantee.
//! The drain task is the integration point for a message bus; publishing
//! never blocks or fails the request that triggered it.

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct DomainEvent {
    pub topic: &'static str,
    pub payload: String,
}

#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventPublisher {
    /// Spawn the drain task and return a publisher handle
    pub fn start() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<DomainEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                info!(topic = %event.topic, payload = %event.payload, "Domain event emitted");
            }
        });
        Self { tx }
    }

    pub fn publish(&self, topic: &'static str, payload: String) {
        if self.tx.send(DomainEvent { topic, payload }).is_err() {
            warn!(topic = %topic, "Event channel closed, dropping event");
        }
    }

    pub fn bookmark_saved(&self, bookmark_id: Uuid, user_id: Uuid, saved_count: i64) {
        let payload = serde_json::json!({
            "bookmarkId": bookmark_id,
            "userId": user_id,
            "savedCount": saved_count,
        })
        .to_string();
        self.publish("bookmark.saved", payload);
    }

    pub fn bookmark_shared(&self, bookmark_id: Uuid, user_id: Uuid, shared_count: i64) {
        let payload = serde_json::json!({
            "bookmarkId": bookmark_id,
            "userId": user_id,
            "sharedCount": shared_count,
        })
        .to_string();
        self.publish("bookmark.shared", payload);
    }
}
