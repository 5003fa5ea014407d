//! In-process broker.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::registry::TopicRegistry;
use crate::{MessageBus, QoS, Subscription, TransportError};

/// A broker living in this process.
///
/// Cloning a `MemoryBus` gives another client of the *same* broker, so
/// two sync engines handed clones of one bus see each other's publishes
/// exactly as two terminals on a network broker would.
#[derive(Clone, Default)]
pub struct MemoryBus {
    registry: Arc<Mutex<TopicRegistry>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The retained payload on `topic`, if any.
    pub async fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.registry.lock().await.retained(topic).map(<[u8]>::to_vec)
    }

    /// Shuts the broker down for every clone: open subscriptions end and
    /// further calls fail with [`TransportError::Shutdown`].
    pub async fn shutdown(&self) {
        self.registry.lock().await.close();
        tracing::debug!("memory bus shut down");
    }

    #[cfg(feature = "websocket")]
    pub(crate) fn registry(&self) -> &Arc<Mutex<TopicRegistry>> {
        &self.registry
    }
}

impl MessageBus for MemoryBus {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError> {
        let mut registry = self.registry.lock().await;
        if registry.is_closed() {
            return Err(TransportError::Shutdown);
        }
        let len = payload.len();
        let delivered = registry.publish(topic, payload, retain);
        tracing::debug!(topic, retain, ?qos, len, delivered, "published");
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        capacity: usize,
    ) -> Result<Subscription, TransportError> {
        if capacity == 0 {
            return Err(TransportError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "queue capacity must be at least 1".to_string(),
            });
        }
        let mut registry = self.registry.lock().await;
        if registry.is_closed() {
            return Err(TransportError::Shutdown);
        }
        let (tx, rx) = mpsc::channel(capacity);
        let id = registry.next_subscriber_id();
        registry.subscribe(topic, id, tx);
        tracing::debug!(topic, ?qos, subscriber = id, "subscribed");
        Ok(Subscription::new(topic, rx))
    }
}
