//! Frames exchanged between a [`WebSocketBus`](crate::WebSocketBus) and a
//! [`BrokerServer`](crate::BrokerServer).
//!
//! One JSON object per WebSocket text message, internally tagged:
//!
//! ```json
//! {"type":"Publish","topic":"gobblet/game/12345","payload":[123,125],"retain":true}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Client → broker: start receiving `topic`.
    Subscribe { topic: String },

    /// Broker → client: the subscription is active. Any retained payload
    /// follows as a `Deliver`.
    SubAck { topic: String },

    /// Client → broker.
    Publish {
        topic: String,
        payload: Vec<u8>,
        #[serde(default)]
        retain: bool,
    },

    /// Broker → client: a payload on a subscribed topic.
    Deliver { topic: String, payload: Vec<u8> },

    /// Broker → client: the last frame was not understood.
    Error { message: String },
}

impl Frame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
