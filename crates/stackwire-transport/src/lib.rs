//! Message bus layer for Stackwire.
//!
//! Provides the [`MessageBus`] trait the sync engine publishes and
//! subscribes through, plus two implementations:
//!
//! - [`MemoryBus`] — an in-process broker. Every clone is a client of the
//!   same broker, which is how tests and hot-seat games run.
//! - [`WebSocketBus`] / [`BrokerServer`] — the same broker served over
//!   WebSocket, for clients on different machines.
//!
//! Both follow the retained-message model: each topic keeps its last
//! retained payload, new subscribers receive it first, and publishing an
//! empty retained payload clears it.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket bus via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod frame;
mod memory;
mod registry;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use frame::Frame;
pub use memory::MemoryBus;
#[cfg(feature = "websocket")]
pub use websocket::{BrokerServer, ConnectionId, WebSocketBus};

use std::future::Future;

use tokio::sync::mpsc;

/// Delivery guarantee requested for a publish or subscription.
///
/// The brokers in this crate deliver over ordered, reliable channels, so
/// every level behaves as at-least-once while a subscriber keeps up. A
/// delivery that finds the subscriber's queue full is dropped and logged
/// at `warn`; the retained message still holds the latest payload. The
/// value is carried for logging and for buses that distinguish levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// A payload delivered on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// The receiving end of a subscription.
///
/// Deliveries are queued in a bounded buffer; when it is full the broker
/// drops new deliveries for this subscriber (and logs it) instead of
/// blocking the publisher. Dropping the `Subscription` unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<Message>,
}

impl Subscription {
    pub(crate) fn new(topic: &str, rx: mpsc::Receiver<Message>) -> Self {
        Self {
            topic: topic.to_string(),
            rx,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next delivery. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Takes a queued delivery without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

/// A publish/subscribe client.
///
/// Topics match exactly (no wildcards). Methods return `Send` futures so
/// callers can drive them from spawned tasks.
pub trait MessageBus: Send + Sync + 'static {
    /// Publishes `payload` on `topic`. With `retain`, the broker also
    /// stores it as the topic's retained message (or clears the retained
    /// message when `payload` is empty).
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
        qos: QoS,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribes to `topic`, buffering up to `capacity` deliveries.
    ///
    /// If the topic has a retained message it is the first delivery.
    fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        capacity: usize,
    ) -> impl Future<Output = Result<Subscription, TransportError>> + Send;
}
