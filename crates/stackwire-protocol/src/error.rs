//! Error types for the protocol layer.

/// Errors from turning snapshots and claims into bytes and back.
///
/// Every inbound failure is one of these. The sync engine logs and drops
/// them rather than letting a bad payload from another client stop the
/// session.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not JSON, or not shaped like the expected message
    /// (missing field, wrong type, truncated payload).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but carries values the game can't represent:
    /// a board that isn't 3×3, a size outside 1..=3, a turn of 0, etc.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
