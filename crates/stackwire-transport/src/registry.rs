//! Topic table shared by every broker front-end.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::Message;

pub(crate) type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Message>,
}

#[derive(Default)]
struct Topic {
    retained: Option<Vec<u8>>,
    subscribers: Vec<Subscriber>,
}

/// Retained payloads and subscriber queues, keyed by exact topic.
///
/// All delivery is `try_send`: a publisher never waits on a slow
/// subscriber. That matters because the sync engine publishes while
/// holding its session lock, and its own subscription is one of the
/// receivers.
#[derive(Default)]
pub(crate) struct TopicRegistry {
    topics: HashMap<String, Topic>,
    next_id: SubscriberId,
    closed: bool,
}

impl TopicRegistry {
    pub(crate) fn next_subscriber_id(&mut self) -> SubscriberId {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drops every subscriber queue (their receivers see the end of the
    /// stream) and refuses further use.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        for topic in self.topics.values_mut() {
            topic.subscribers.clear();
        }
    }

    /// Adds a subscriber and hands it the retained payload, if any.
    ///
    /// Subscribing again with the same id only re-sends the retained
    /// payload; it doesn't create a second queue entry.
    pub(crate) fn subscribe(&mut self, topic: &str, id: SubscriberId, tx: mpsc::Sender<Message>) {
        let entry = self.topics.entry(topic.to_string()).or_default();
        if let Some(retained) = &entry.retained {
            deliver(&tx, id, topic, retained.clone());
        }
        if !entry.subscribers.iter().any(|s| s.id == id) {
            entry.subscribers.push(Subscriber { id, tx });
        }
    }

    /// Removes `id` from every topic.
    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) {
        for topic in self.topics.values_mut() {
            topic.subscribers.retain(|s| s.id != id);
        }
    }

    /// Updates the retained slot (when `retain`) and fans the payload out.
    /// Returns how many subscribers accepted it.
    pub(crate) fn publish(&mut self, topic: &str, payload: Vec<u8>, retain: bool) -> usize {
        let entry = self.topics.entry(topic.to_string()).or_default();
        if retain {
            entry.retained = if payload.is_empty() {
                None
            } else {
                Some(payload.clone())
            };
        }

        let mut delivered = 0;
        entry.subscribers.retain(|sub| {
            match sub.tx.try_send(Message {
                topic: topic.to_string(),
                payload: payload.clone(),
            }) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(topic, subscriber = sub.id, "subscriber queue full, delivery dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(topic, subscriber = sub.id, "subscriber gone");
                    false
                }
            }
        });
        delivered
    }

    pub(crate) fn retained(&self, topic: &str) -> Option<&[u8]> {
        self.topics.get(topic)?.retained.as_deref()
    }
}

fn deliver(tx: &mpsc::Sender<Message>, id: SubscriberId, topic: &str, payload: Vec<u8>) {
    let msg = Message {
        topic: topic.to_string(),
        payload,
    };
    if tx.try_send(msg).is_err() {
        tracing::warn!(topic, subscriber = id, "could not deliver retained payload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(registry: &mut TopicRegistry, topic: &str) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(8);
        let id = registry.next_subscriber_id();
        registry.subscribe(topic, id, tx);
        rx
    }

    #[test]
    fn test_publish_retained_then_subscribe_gets_it() {
        let mut reg = TopicRegistry::default();
        reg.publish("a", b"one".to_vec(), true);

        let mut rx = subscriber(&mut reg, "a");

        assert_eq!(rx.try_recv().unwrap().payload, b"one");
    }

    #[test]
    fn test_non_retained_publish_not_stored() {
        let mut reg = TopicRegistry::default();
        reg.publish("a", b"one".to_vec(), false);

        let mut rx = subscriber(&mut reg, "a");

        assert!(rx.try_recv().is_err());
        assert_eq!(reg.retained("a"), None);
    }

    #[test]
    fn test_empty_retained_payload_clears() {
        let mut reg = TopicRegistry::default();
        reg.publish("a", b"one".to_vec(), true);
        reg.publish("a", Vec::new(), true);

        assert_eq!(reg.retained("a"), None);
    }

    #[test]
    fn test_topics_match_exactly() {
        let mut reg = TopicRegistry::default();
        let mut rx = subscriber(&mut reg, "game/1");

        reg.publish("game/1/roles/1", b"x".to_vec(), false);
        reg.publish("game/12", b"y".to_vec(), false);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let mut reg = TopicRegistry::default();
        let (tx, mut rx) = mpsc::channel(1);
        let id = reg.next_subscriber_id();
        reg.subscribe("a", id, tx);

        assert_eq!(reg.publish("a", b"1".to_vec(), false), 1);
        assert_eq!(reg.publish("a", b"2".to_vec(), false), 0);

        assert_eq!(rx.try_recv().unwrap().payload, b"1");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let mut reg = TopicRegistry::default();
        let rx = subscriber(&mut reg, "a");
        drop(rx);

        assert_eq!(reg.publish("a", b"1".to_vec(), false), 0);
        assert!(reg.topics["a"].subscribers.is_empty());
    }

    #[test]
    fn test_resubscribe_same_id_no_duplicate_delivery() {
        let mut reg = TopicRegistry::default();
        let (tx, mut rx) = mpsc::channel(8);
        let id = reg.next_subscriber_id();
        reg.subscribe("a", id, tx.clone());
        reg.subscribe("a", id, tx);

        reg.publish("a", b"1".to_vec(), false);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
