/// Errors that can occur in the bus layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Reaching the broker failed.
    #[error("connect to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// The broker did not accept a subscription.
    #[error("subscribe to {topic} failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    /// A publish could not be handed to the broker.
    #[error("publish to {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    /// The connection to the broker went away.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Binding or accepting broker connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The bus was shut down locally.
    #[error("bus shut down")]
    Shutdown,
}
